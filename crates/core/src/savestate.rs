//! Save state (quick save / quick load) for the LCD simulator.
//!
//! Persists the full controller state to a file using bincode serialization
//! with deflate compression, so an interactive session can be frozen and
//! resumed (F5 save, F9 load in the frontend).
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "CLCD"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode snapshot
//! +------------------+
//! ```

use std::path::Path;

use crate::controller::{Hd44780, Snapshot};

/// Magic bytes identifying a charlcd-emu save state file.
const MAGIC: &[u8; 4] = b"CLCD";
/// Current save state format version.
const FORMAT_VERSION: u32 = 1;

/// Serialize the controller state into the save-state wire format.
pub fn serialize_state(snap: &Snapshot) -> Result<Vec<u8>, String> {
    let payload = bincode::serialize(snap).map_err(|e| format!("Serialize error: {}", e))?;

    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(8 + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Parse the save-state wire format back into a controller, verifying
/// magic and version.
pub fn deserialize_state(data: &[u8]) -> Result<Hd44780, String> {
    if data.len() < 8 {
        return Err("File too small".into());
    }
    if &data[0..4] != MAGIC {
        return Err("Invalid save state file (bad magic)".into());
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(format!(
            "Unsupported save state version {} (expected {})",
            version, FORMAT_VERSION
        ));
    }

    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[8..])
        .map_err(|e| format!("Decompress error: {:?}", e))?;

    let snap: Snapshot =
        bincode::deserialize(&decompressed).map_err(|e| format!("Deserialize error: {}", e))?;
    Hd44780::restore(&snap)
}

/// Save controller state to a file.
pub fn save_to_file(snap: &Snapshot, path: &Path) -> Result<(), String> {
    let bytes = serialize_state(snap)?;
    std::fs::write(path, &bytes).map_err(|e| format!("Write error: {}", e))
}

/// Load controller state from a file.
pub fn load_from_file(path: &Path) -> Result<Hd44780, String> {
    let data = std::fs::read(path).map_err(|e| format!("Read error: {}", e))?;
    deserialize_state(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated_lcd() -> Hd44780 {
        let mut lcd = Hd44780::new(16, 2);
        lcd.receive_command(0x0C);
        lcd.receive_command(0x80 | 0x40);
        for &b in b"SAVED" {
            lcd.receive_data(b);
        }
        lcd.receive_command(0x40 | 0x08); // glyph 1
        lcd.receive_data(0b01010);
        lcd
    }

    #[test]
    fn test_round_trip() {
        let lcd = populated_lcd();
        let bytes = serialize_state(&lcd.snapshot()).unwrap();
        let loaded = deserialize_state(&bytes).unwrap();
        let a = lcd.snapshot();
        let b = loaded.snapshot();
        assert_eq!(a.vram, b.vram);
        assert_eq!(a.address_counter, b.address_counter);
        assert_eq!(a.display_on, b.display_on);
        assert_eq!(a.cgram_rev, b.cgram_rev);
        assert_eq!(&b.row(1)[..5], b"SAVED");
    }

    #[test]
    fn test_bad_magic_rejected() {
        let lcd = populated_lcd();
        let mut bytes = serialize_state(&lcd.snapshot()).unwrap();
        bytes[0] = b'X';
        assert!(deserialize_state(&bytes).unwrap_err().contains("bad magic"));
    }

    #[test]
    fn test_bad_version_rejected() {
        let lcd = populated_lcd();
        let mut bytes = serialize_state(&lcd.snapshot()).unwrap();
        bytes[4] = 99;
        assert!(deserialize_state(&bytes).unwrap_err().contains("version"));
    }

    #[test]
    fn test_truncated_rejected() {
        assert!(deserialize_state(b"CLC").is_err());
    }

    #[test]
    fn test_tampered_address_counter_rejected() {
        // A crafted file with a wild address counter must fail the load,
        // not come back as a controller that faults on the next byte.
        let mut snap = populated_lcd().snapshot();
        snap.address_counter = 0xF0;
        let bytes = serialize_state(&snap).unwrap();
        assert!(deserialize_state(&bytes)
            .unwrap_err()
            .contains("out of range"));
    }
}
