//! HD44780 instruction decoding.
//!
//! An instruction byte is identified by its highest set bit; the bits below
//! it are the instruction's parameters. The encodings are bit-exact with the
//! standard instruction set (clear=0x01, home=0x02, entry mode=0x04+,
//! display control=0x08+, shift=0x10+, function set=0x20+, CGRAM
//! address=0x40+, DDRAM address=0x80+), so firmware written against the real
//! chip drives the emulated controller unchanged.

/// A decoded controller instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 0x00 — not an instruction, ignored.
    Nop,
    /// 0x01 — zero DDRAM, home the address counter.
    Clear,
    /// 0x02 — home the address counter, memory untouched.
    Home,
    /// 0x04 | I/D<<1 | S — cursor step direction and shift-on-write.
    EntryMode { increment: bool, shift_display: bool },
    /// 0x08 | D<<2 | C<<1 | B — display on/off, cursor, blink.
    DisplayControl {
        display_on: bool,
        cursor_on: bool,
        blink_on: bool,
    },
    /// 0x10 | S/C<<3 | R/L<<2 — move the cursor or shift the display.
    Shift { display: bool, right: bool },
    /// 0x20 | DL<<4 | N<<3 | F<<2 — bus width, line count, font height.
    FunctionSet {
        eight_bit: bool,
        two_lines: bool,
        tall_font: bool,
    },
    /// 0x40 | addr — select CGRAM addressing at `addr` (6-bit).
    SetCgramAddr(u8),
    /// 0x80 | addr — select DDRAM addressing at `addr` (7-bit).
    SetDdramAddr(u8),
}

/// Decode an instruction byte.
///
/// Never fails: address payloads are masked into range and the all-zero
/// byte decodes to [`Command::Nop`], matching the permissive behavior of
/// the hardware.
pub fn decode(byte: u8) -> Command {
    if byte & 0x80 != 0 {
        Command::SetDdramAddr(byte & 0x7F)
    } else if byte & 0x40 != 0 {
        Command::SetCgramAddr(byte & 0x3F)
    } else if byte & 0x20 != 0 {
        Command::FunctionSet {
            eight_bit: byte & 0x10 != 0,
            two_lines: byte & 0x08 != 0,
            tall_font: byte & 0x04 != 0,
        }
    } else if byte & 0x10 != 0 {
        Command::Shift {
            display: byte & 0x08 != 0,
            right: byte & 0x04 != 0,
        }
    } else if byte & 0x08 != 0 {
        Command::DisplayControl {
            display_on: byte & 0x04 != 0,
            cursor_on: byte & 0x02 != 0,
            blink_on: byte & 0x01 != 0,
        }
    } else if byte & 0x04 != 0 {
        Command::EntryMode {
            increment: byte & 0x02 != 0,
            shift_display: byte & 0x01 != 0,
        }
    } else if byte & 0x02 != 0 {
        Command::Home
    } else if byte & 0x01 != 0 {
        Command::Clear
    } else {
        Command::Nop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_opcodes() {
        assert_eq!(decode(0x00), Command::Nop);
        assert_eq!(decode(0x01), Command::Clear);
        assert_eq!(decode(0x02), Command::Home);
        // don't-care low bit of home
        assert_eq!(decode(0x03), Command::Home);
    }

    #[test]
    fn test_entry_mode() {
        assert_eq!(
            decode(0x06),
            Command::EntryMode { increment: true, shift_display: false }
        );
        assert_eq!(
            decode(0x04),
            Command::EntryMode { increment: false, shift_display: false }
        );
        assert_eq!(
            decode(0x07),
            Command::EntryMode { increment: true, shift_display: true }
        );
    }

    #[test]
    fn test_display_control() {
        assert_eq!(
            decode(0x0C),
            Command::DisplayControl { display_on: true, cursor_on: false, blink_on: false }
        );
        assert_eq!(
            decode(0x08),
            Command::DisplayControl { display_on: false, cursor_on: false, blink_on: false }
        );
        assert_eq!(
            decode(0x0F),
            Command::DisplayControl { display_on: true, cursor_on: true, blink_on: true }
        );
    }

    #[test]
    fn test_shift() {
        assert_eq!(decode(0x10), Command::Shift { display: false, right: false });
        assert_eq!(decode(0x14), Command::Shift { display: false, right: true });
        assert_eq!(decode(0x18), Command::Shift { display: true, right: false });
        assert_eq!(decode(0x1C), Command::Shift { display: true, right: true });
    }

    #[test]
    fn test_function_set() {
        // 4-bit bus, 2 lines, 5x8 font — the init value every example uses
        assert_eq!(
            decode(0x28),
            Command::FunctionSet { eight_bit: false, two_lines: true, tall_font: false }
        );
        assert_eq!(
            decode(0x30),
            Command::FunctionSet { eight_bit: true, two_lines: false, tall_font: false }
        );
    }

    #[test]
    fn test_addresses_masked() {
        assert_eq!(decode(0x80), Command::SetDdramAddr(0x00));
        assert_eq!(decode(0xC0), Command::SetDdramAddr(0x40));
        assert_eq!(decode(0xFF), Command::SetDdramAddr(0x7F));
        assert_eq!(decode(0x40), Command::SetCgramAddr(0x00));
        assert_eq!(decode(0x7F), Command::SetCgramAddr(0x3F));
    }
}
