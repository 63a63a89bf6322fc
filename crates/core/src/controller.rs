//! HD44780 display controller state machine.
//!
//! Processes command and data bytes exactly as a microcontroller would drive
//! them over the parallel bus, maintaining the controller's internal memory
//! and cursor state. The memory is a single address space: DDRAM (visible
//! character codes) at 0x00..0x80 and CGRAM (custom glyph pixel rows) at
//! 0x80..0xC0; data writes land in one or the other depending on the most
//! recent set-address command.
//!
//! Renderers never mutate the controller. They take a [`Snapshot`] and
//! compare its monotonic `ddram_rev`/`cgram_rev` counters against the last
//! revision they drew, so any number of independent consumers can track
//! changes without coordinating.

use serde::{Deserialize, Serialize};

use crate::command::{decode, Command};
use crate::{CGRAM_BASE, CGRAM_SIZE, DDRAM_SIZE, MAX_COLS, MAX_ROWS, ROW_OFFSETS, VRAM_SIZE};

/// HD44780 character LCD controller.
#[derive(Debug)]
pub struct Hd44780 {
    /// Visible panel geometry (character cells).
    cols: usize,
    rows: usize,
    /// Unified memory: DDRAM at 0x00..0x80, CGRAM at 0x80..0xC0.
    vram: [u8; VRAM_SIZE],
    /// Address counter (index into `vram`).
    ac: u8,
    /// Addressing mode: set-CGRAM-address routes writes to CGRAM.
    in_cgram: bool,
    /// Entry mode: cursor step direction.
    increment: bool,
    /// Entry mode: shift the display on every data write.
    shift_on_write: bool,
    /// Display control flags.
    display_on: bool,
    cursor_on: bool,
    blink_on: bool,
    /// Accumulated display shift (positive = shifted right). Tracked for
    /// state fidelity; the rasterizer does not model a shifted viewport.
    shift_offset: i8,
    /// Function set: line count and font height.
    two_lines: bool,
    tall_font: bool,
    /// DDRAM content revision, bumped on every change.
    ddram_rev: u64,
    /// CGRAM content revision, bumped on every change.
    cgram_rev: u64,
    /// Debug counters (per-frame, reset by the frontend)
    pub dbg_cmd_count: u32,
    pub dbg_data_count: u32,
}

/// Read-only copy of the controller state at one instant.
///
/// Cheap to clone; renderers and the save-state module both consume it.
#[derive(Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unified memory copy (DDRAM then CGRAM).
    pub vram: Vec<u8>,
    pub cols: usize,
    pub rows: usize,
    pub address_counter: u8,
    pub in_cgram: bool,
    pub increment: bool,
    pub shift_on_write: bool,
    pub display_on: bool,
    pub cursor_on: bool,
    pub blink_on: bool,
    pub shift_offset: i8,
    pub two_lines: bool,
    pub tall_font: bool,
    pub ddram_rev: u64,
    pub cgram_rev: u64,
}

impl Hd44780 {
    /// Create a controller for a `cols`×`rows` panel (16×2, 20×4, …).
    ///
    /// Power-on state: zeroed memory, address counter at DDRAM 0,
    /// incrementing entry mode, display off. The real chip's reset sequence
    /// is the firmware's job to replay as commands over the bus.
    pub fn new(cols: usize, rows: usize) -> Self {
        Hd44780 {
            cols: cols.clamp(1, MAX_COLS),
            rows: rows.clamp(1, MAX_ROWS),
            vram: [0; VRAM_SIZE],
            ac: 0,
            in_cgram: false,
            increment: true,
            shift_on_write: false,
            display_on: false,
            cursor_on: false,
            blink_on: false,
            shift_offset: 0,
            two_lines: rows > 1,
            tall_font: false,
            ddram_rev: 0,
            cgram_rev: 0,
            dbg_cmd_count: 0,
            dbg_data_count: 0,
        }
    }

    /// Rebuild a controller from a snapshot (save-state load path).
    pub fn restore(snap: &Snapshot) -> Result<Self, String> {
        if snap.vram.len() != VRAM_SIZE {
            return Err(format!(
                "bad vram length {} (expected {})",
                snap.vram.len(),
                VRAM_SIZE
            ));
        }
        if snap.address_counter as usize >= VRAM_SIZE {
            return Err(format!(
                "address counter 0x{:02X} out of range",
                snap.address_counter
            ));
        }
        if snap.in_cgram != (snap.address_counter as usize >= CGRAM_BASE) {
            return Err(format!(
                "addressing mode inconsistent with address counter 0x{:02X}",
                snap.address_counter
            ));
        }
        let mut lcd = Hd44780::new(snap.cols, snap.rows);
        lcd.vram.copy_from_slice(&snap.vram);
        lcd.ac = snap.address_counter;
        lcd.in_cgram = snap.in_cgram;
        lcd.increment = snap.increment;
        lcd.shift_on_write = snap.shift_on_write;
        lcd.display_on = snap.display_on;
        lcd.cursor_on = snap.cursor_on;
        lcd.blink_on = snap.blink_on;
        lcd.shift_offset = snap.shift_offset;
        lcd.two_lines = snap.two_lines;
        lcd.tall_font = snap.tall_font;
        lcd.ddram_rev = snap.ddram_rev;
        lcd.cgram_rev = snap.cgram_rev;
        Ok(lcd)
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Receive an instruction byte (RS pin low).
    pub fn receive_command(&mut self, byte: u8) {
        self.dbg_cmd_count += 1;

        match decode(byte) {
            Command::Nop => {}
            Command::Clear => {
                self.vram[..DDRAM_SIZE].fill(0);
                self.ac = 0;
                self.in_cgram = false;
                // The chip also forces incrementing entry mode on clear.
                self.increment = true;
                self.shift_offset = 0;
                self.ddram_rev += 1;
            }
            Command::Home => {
                self.ac = 0;
                self.in_cgram = false;
                self.shift_offset = 0;
            }
            Command::EntryMode { increment, shift_display } => {
                self.increment = increment;
                self.shift_on_write = shift_display;
            }
            Command::DisplayControl { display_on, cursor_on, blink_on } => {
                self.display_on = display_on;
                self.cursor_on = cursor_on;
                self.blink_on = blink_on;
            }
            Command::Shift { display, right } => {
                if display {
                    self.shift_offset = self.shift_offset.wrapping_add(if right { 1 } else { -1 });
                } else {
                    self.step_ac(right);
                }
            }
            Command::FunctionSet { two_lines, tall_font, .. } => {
                // Bus width (DL) is the bus adapter's concern, not ours.
                self.two_lines = two_lines;
                self.tall_font = tall_font;
            }
            Command::SetCgramAddr(addr) => {
                self.in_cgram = true;
                self.ac = CGRAM_BASE as u8 + addr;
            }
            Command::SetDdramAddr(addr) => {
                self.in_cgram = false;
                self.ac = addr;
            }
        }
    }

    /// Receive a data byte (RS pin high): store at the address counter and
    /// advance it per the entry mode.
    pub fn receive_data(&mut self, byte: u8) {
        self.dbg_data_count += 1;

        self.vram[self.ac as usize] = byte;
        if self.in_cgram {
            self.cgram_rev += 1;
        } else {
            self.ddram_rev += 1;
            if self.shift_on_write {
                // Display follows the cursor so it appears stationary.
                self.shift_offset =
                    self.shift_offset.wrapping_add(if self.increment { -1 } else { 1 });
            }
        }
        self.step_ac(self.increment);
    }

    /// Copy the full state out for a renderer or the save-state module.
    /// Does not mutate anything; consumers track the revision counters.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            vram: self.vram.to_vec(),
            cols: self.cols,
            rows: self.rows,
            address_counter: self.ac,
            in_cgram: self.in_cgram,
            increment: self.increment,
            shift_on_write: self.shift_on_write,
            display_on: self.display_on,
            cursor_on: self.cursor_on,
            blink_on: self.blink_on,
            shift_offset: self.shift_offset,
            two_lines: self.two_lines,
            tall_font: self.tall_font,
            ddram_rev: self.ddram_rev,
            cgram_rev: self.cgram_rev,
        }
    }

    pub fn ddram_rev(&self) -> u64 {
        self.ddram_rev
    }

    pub fn cgram_rev(&self) -> u64 {
        self.cgram_rev
    }

    /// Reset per-frame debug counters
    pub fn dbg_reset_counters(&mut self) {
        self.dbg_cmd_count = 0;
        self.dbg_data_count = 0;
    }

    /// Step the address counter one position forward or backward, wrapping
    /// within the active region: the full CGRAM block in CGRAM mode, the
    /// current row's window in DDRAM mode. An address parked outside any
    /// visible row wraps across the whole DDRAM span.
    fn step_ac(&mut self, forward: bool) {
        if self.in_cgram {
            let off = (self.ac as usize - CGRAM_BASE) as u8;
            let next = if forward {
                (off + 1) % CGRAM_SIZE as u8
            } else {
                (off + CGRAM_SIZE as u8 - 1) % CGRAM_SIZE as u8
            };
            self.ac = CGRAM_BASE as u8 + next;
        } else {
            let ac = self.ac & 0x7F;
            let w = self.cols as u8;
            if let Some(base) = row_base_for(ac, self.cols, self.rows) {
                let off = ac - base;
                let next = if forward { (off + 1) % w } else { (off + w - 1) % w };
                self.ac = base + next;
            } else {
                self.ac = if forward {
                    (ac + 1) & 0x7F
                } else {
                    ac.wrapping_sub(1) & 0x7F
                };
            }
        }
    }
}

/// DDRAM base of the visible row whose window contains `ac`, if any.
fn row_base_for(ac: u8, cols: usize, rows: usize) -> Option<u8> {
    ROW_OFFSETS[..rows]
        .iter()
        .copied()
        .find(|&base| ac >= base && ac < base + cols as u8)
}

impl Snapshot {
    /// DDRAM region (0x00..0x80).
    pub fn ddram(&self) -> &[u8] {
        &self.vram[..DDRAM_SIZE]
    }

    /// CGRAM region (64 bytes, 8 glyphs × 8 rows).
    pub fn cgram(&self) -> &[u8] {
        &self.vram[CGRAM_BASE..]
    }

    /// Character codes of one visible row.
    pub fn row(&self, row: usize) -> &[u8] {
        let base = ROW_OFFSETS[row] as usize;
        &self.vram[base..base + self.cols]
    }

    /// Pixel rows of one custom glyph (code 0–7).
    pub fn cgram_glyph(&self, code: u8) -> &[u8] {
        let base = CGRAM_BASE + (code as usize & 0x07) * 8;
        &self.vram[base..base + 8]
    }

    /// Visible cell the cursor sits on, as `(row, col)`, if the address
    /// counter points into a visible row in DDRAM mode.
    pub fn cursor_cell(&self) -> Option<(usize, usize)> {
        if self.in_cgram {
            return None;
        }
        let ac = self.address_counter & 0x7F;
        for (row, &base) in ROW_OFFSETS[..self.rows].iter().enumerate() {
            if ac >= base && ac < base + self.cols as u8 {
                return Some((row, (ac - base) as usize));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Standard init sequence after the bus has settled into 4-bit mode.
    fn init_16x2() -> Hd44780 {
        let mut lcd = Hd44780::new(16, 2);
        lcd.receive_command(0x28); // function set: 4-bit, 2 lines, 5x8
        lcd.receive_command(0x08); // display off
        lcd.receive_command(0x01); // clear
        lcd.receive_command(0x06); // entry mode: increment, no shift
        lcd.receive_command(0x0C); // display on
        lcd
    }

    #[test]
    fn test_hello_end_to_end() {
        let mut lcd = init_16x2();
        lcd.receive_command(0x80); // DDRAM address 0
        for &b in b"HELLO" {
            lcd.receive_data(b);
        }
        let snap = lcd.snapshot();
        assert_eq!(&snap.ddram()[..5], b"HELLO");
        assert_eq!(snap.address_counter, 5);
        assert!(snap.display_on);
    }

    #[test]
    fn test_write_order_follows_entry_mode() {
        let mut lcd = init_16x2();
        lcd.receive_command(0x80 | 0x40); // row 1 base
        for &b in b"AB" {
            lcd.receive_data(b);
        }
        assert_eq!(&lcd.snapshot().row(1)[..2], b"AB");

        // decrement mode writes leftward
        lcd.receive_command(0x04);
        lcd.receive_command(0x80 | 0x45);
        lcd.receive_data(b'Z');
        lcd.receive_data(b'Y');
        let snap = lcd.snapshot();
        assert_eq!(snap.row(1)[5], b'Z');
        assert_eq!(snap.row(1)[4], b'Y');
        assert_eq!(snap.address_counter, 0x43);
    }

    #[test]
    fn test_clear_zeroes_ddram_and_homes() {
        let mut lcd = init_16x2();
        lcd.receive_command(0x80 | 0x47);
        lcd.receive_data(b'X');
        lcd.receive_command(0x01);
        let snap = lcd.snapshot();
        assert!(snap.ddram().iter().all(|&b| b == 0));
        assert_eq!(snap.address_counter, 0);
    }

    #[test]
    fn test_home_keeps_memory() {
        let mut lcd = init_16x2();
        lcd.receive_data(b'Q');
        lcd.receive_command(0x02);
        let snap = lcd.snapshot();
        assert_eq!(snap.ddram()[0], b'Q');
        assert_eq!(snap.address_counter, 0);
    }

    #[test]
    fn test_row_wraparound_on_17th_write() {
        let mut lcd = init_16x2();
        lcd.receive_command(0x80); // row 0, col 0
        for i in 0..17u8 {
            lcd.receive_data(b'a' + i);
        }
        let snap = lcd.snapshot();
        // 17th write landed back on the row base
        assert_eq!(snap.ddram()[0], b'a' + 16);
        assert_eq!(snap.ddram()[15], b'a' + 15);
        assert_eq!(snap.address_counter, 1);
    }

    #[test]
    fn test_decrement_wraps_to_row_end() {
        let mut lcd = init_16x2();
        lcd.receive_command(0x04); // decrement
        lcd.receive_command(0x80); // row 0, col 0
        lcd.receive_data(b'A');
        assert_eq!(lcd.snapshot().address_counter, 15);
    }

    #[test]
    fn test_cgram_write_and_readback() {
        let mut lcd = init_16x2();
        for k in 0..64u8 {
            lcd.receive_command(0x40 | k);
            lcd.receive_data(k ^ 0x15);
        }
        let snap = lcd.snapshot();
        for k in 0..64usize {
            assert_eq!(snap.cgram()[k], k as u8 ^ 0x15);
        }
    }

    #[test]
    fn test_cgram_writes_only_bump_cgram_rev() {
        let mut lcd = init_16x2();
        let d0 = lcd.ddram_rev();
        let c0 = lcd.cgram_rev();
        lcd.receive_command(0x40); // CGRAM address 0
        lcd.receive_data(0x1F);
        assert_eq!(lcd.ddram_rev(), d0);
        assert_eq!(lcd.cgram_rev(), c0 + 1);

        lcd.receive_command(0x80);
        lcd.receive_data(b'*');
        assert_eq!(lcd.ddram_rev(), d0 + 1);
        assert_eq!(lcd.cgram_rev(), c0 + 1);
    }

    #[test]
    fn test_cgram_address_wraps_within_block() {
        let mut lcd = init_16x2();
        lcd.receive_command(0x40 | 0x3F); // last CGRAM byte
        lcd.receive_data(0xAA);
        lcd.receive_data(0x55); // wrapped to CGRAM offset 0
        let snap = lcd.snapshot();
        assert_eq!(snap.cgram()[0x3F], 0xAA);
        assert_eq!(snap.cgram()[0x00], 0x55);
    }

    #[test]
    fn test_display_control_leaves_memory_untouched() {
        let mut lcd = init_16x2();
        for &b in b"MEMCHECK" {
            lcd.receive_data(b);
        }
        let before = lcd.snapshot();
        lcd.receive_command(0x08); // off
        lcd.receive_command(0x0F); // on + cursor + blink
        lcd.receive_command(0x14); // cursor right
        lcd.receive_command(0x1C); // display shift right
        let after = lcd.snapshot();
        assert_eq!(before.vram, after.vram);
        assert_eq!(before.ddram_rev, after.ddram_rev);
        assert!(after.cursor_on && after.blink_on);
    }

    #[test]
    fn test_cursor_shift_moves_address_counter() {
        let mut lcd = init_16x2();
        lcd.receive_command(0x80 | 0x05);
        lcd.receive_command(0x14); // right
        assert_eq!(lcd.snapshot().address_counter, 6);
        lcd.receive_command(0x10); // left
        lcd.receive_command(0x10);
        assert_eq!(lcd.snapshot().address_counter, 4);
    }

    #[test]
    fn test_display_shift_tracked() {
        let mut lcd = init_16x2();
        lcd.receive_command(0x1C);
        lcd.receive_command(0x1C);
        lcd.receive_command(0x18);
        assert_eq!(lcd.snapshot().shift_offset, 1);
        lcd.receive_command(0x02); // home resets the shift
        assert_eq!(lcd.snapshot().shift_offset, 0);
    }

    #[test]
    fn test_cursor_cell() {
        let mut lcd = init_16x2();
        lcd.receive_command(0x80 | 0x43);
        assert_eq!(lcd.snapshot().cursor_cell(), Some((1, 3)));
        lcd.receive_command(0x80 | 0x20); // outside both row windows
        assert_eq!(lcd.snapshot().cursor_cell(), None);
        lcd.receive_command(0x40); // CGRAM mode: no visible cursor
        assert_eq!(lcd.snapshot().cursor_cell(), None);
    }

    #[test]
    fn test_four_row_windows() {
        let mut lcd = Hd44780::new(20, 4);
        lcd.receive_command(0x80 | 0x14); // row 2 base
        lcd.receive_data(b'#');
        let snap = lcd.snapshot();
        assert_eq!(snap.row(2)[0], b'#');
        assert_eq!(snap.cursor_cell(), Some((2, 1)));
    }

    #[test]
    fn test_clear_resets_entry_mode_to_increment() {
        let mut lcd = init_16x2();
        lcd.receive_command(0x04); // decrement
        lcd.receive_command(0x01); // clear
        lcd.receive_data(b'A');
        lcd.receive_data(b'B');
        let snap = lcd.snapshot();
        assert_eq!(&snap.ddram()[..2], b"AB");
        assert_eq!(snap.address_counter, 2);
    }

    #[test]
    fn test_restore_rejects_out_of_range_address() {
        let lcd = init_16x2();
        let mut snap = lcd.snapshot();
        snap.address_counter = 0xF0;
        snap.in_cgram = true;
        assert!(Hd44780::restore(&snap)
            .unwrap_err()
            .contains("out of range"));
    }

    #[test]
    fn test_restore_rejects_mode_address_mismatch() {
        let lcd = init_16x2();
        let mut snap = lcd.snapshot();
        // claims CGRAM mode but the counter points into DDRAM
        snap.address_counter = 0x00;
        snap.in_cgram = true;
        assert!(Hd44780::restore(&snap).is_err());
    }

    #[test]
    fn test_restore_round_trip() {
        let mut lcd = init_16x2();
        for &b in b"STATE" {
            lcd.receive_data(b);
        }
        lcd.receive_command(0x40 | 8);
        lcd.receive_data(0x0E);
        let snap = lcd.snapshot();
        let restored = Hd44780::restore(&snap).unwrap();
        let again = restored.snapshot();
        assert_eq!(snap.vram, again.vram);
        assert_eq!(snap.address_counter, again.address_counter);
        assert_eq!(snap.in_cgram, again.in_cgram);
        assert_eq!(snap.ddram_rev, again.ddram_rev);
    }
}
