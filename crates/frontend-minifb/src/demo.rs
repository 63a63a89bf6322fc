//! Built-in board demo: stands in for firmware driving the LCD.
//!
//! Reproduces the behavior of the classic development-board display demo on
//! a 16×2 panel with five buttons:
//!
//! - **B1** (up): turn the display on and show the welcome screen
//! - **B2** (left): put text 1 on the upper line
//! - **B3** (middle): hold to slide the selected line's text
//! - **B4** (right): put text 2 on the lower line
//! - **B5** (down): say goodbye and turn the display off
//!
//! All traffic goes through the 4-bit pin interface, including the real
//! power-on sequence, so the demo doubles as an end-to-end exercise of the
//! bus adapter. A small set of custom glyphs (a runner-and-obstacles tile
//! set) is uploaded to CGRAM at startup and drawn on the welcome screen.

use charlcd_core::{PinBus, SharedHd44780};

pub const BUTTON_COUNT: usize = 5;
pub const BUTTON_NAMES: [&str; BUTTON_COUNT] = ["B1", "B2", "B3", "B4", "B5"];

const TEXT1: &[u8] = b"Conflux";
const TEXT2: &[u8] = b"Rampard";
const COLS: usize = 16;

/// Steps between slide ticks while B3 is held (~125 ms at 64 steps/s).
const SLIDE_PERIOD: u32 = 8;

/// Custom glyph tile set uploaded to CGRAM. Glyph 0 stays blank so cleared
/// (zeroed) DDRAM renders as an empty panel.
const CHARMAP: [[u8; 8]; 8] = [
    [0, 0, 0, 0, 0, 0, 0, 0],                         // empty
    [0, 0, 0, 0, 0, 0b10101, 0b01110, 0],             // air obstacle
    [0, 0, 0, 0, 0b00011, 0b11110, 0b00110, 0b00100], // runner airborne
    [0, 0, 0, 0, 0, 0, 0, 0b11111],                   // ground
    [0, 0, 0, 0b00110, 0b01100, 0b00100, 0b00100, 0b11111], // ground obstacle
    [0, 0, 0, 0b00011, 0b11110, 0b00110, 0b00100, 0b11111], // runner on ground
    [0b00011, 0b11110, 0b00110, 0b00100, 0, 0, 0, 0b11111], // runner mid-jump
    [0b11111, 0b11111, 0b11111, 0b11111, 0b11111, 0b11111, 0b11111, 0b11111], // solid
];

/// Decorative strip for the welcome screen's lower line (custom codes).
const WELCOME_STRIP: [u8; COLS] = [3, 3, 5, 3, 4, 3, 3, 1, 3, 3, 4, 3, 3, 2, 3, 3];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Line {
    None,
    Upper,
    Lower,
}

/// Firmware stand-in: owns the bus and reacts to button edges.
pub struct BoardDemo {
    lcd: SharedHd44780,
    bus: PinBus,
    lcd_on: bool,
    line: Line,
    text: [u8; COLS],
    /// Button-release latch: a press only registers after all buttons were
    /// seen released, like the original firmware's debounce flag.
    released: bool,
    slide_tick: u32,
}

impl BoardDemo {
    /// Create the demo and run the panel's power-on initialization.
    pub fn new(lcd: SharedHd44780) -> Self {
        let mut demo = BoardDemo {
            lcd,
            bus: PinBus::new(),
            lcd_on: false,
            line: Line::None,
            text: [b' '; COLS],
            released: true,
            slide_tick: 0,
        };
        demo.init_panel();
        demo
    }

    /// Replay the datasheet init dance over the raw pins, then configure
    /// the controller and upload the custom glyph set.
    fn init_panel(&mut self) {
        let bus = &mut self.bus;
        self.lcd.with(|lcd| {
            // Chip starts in 8-bit mode with only D4-D7 wired: three 0x3
            // nibbles, then 0x2 to drop to the 4-bit interface.
            for _ in 0..3 {
                bus.set_data(0x30);
                bus.strobe(lcd);
            }
            bus.set_data(0x20);
            bus.strobe(lcd);

            bus.send(lcd, false, 0x28); // 4-bit, 2 lines, 5x8 font
            bus.send(lcd, false, 0x08); // display off
            bus.send(lcd, false, 0x01); // clear
            bus.send(lcd, false, 0x06); // entry mode: increment, no shift

            // CGRAM upload
            for (i, glyph) in CHARMAP.iter().enumerate() {
                bus.send(lcd, false, 0x40 | (i as u8 * 8));
                for &row in glyph {
                    bus.send(lcd, true, row);
                }
            }
            bus.send(lcd, false, 0x80); // back to DDRAM addressing
        });
    }

    fn command(&mut self, byte: u8) {
        let bus = &mut self.bus;
        self.lcd.with(|lcd| bus.send(lcd, false, byte));
    }

    fn data(&mut self, byte: u8) {
        let bus = &mut self.bus;
        self.lcd.with(|lcd| bus.send(lcd, true, byte));
    }

    fn write_line(&mut self, line: Line, text: &[u8; COLS]) {
        self.command(match line {
            Line::Lower => 0x80 | 0x40,
            _ => 0x80,
        });
        for &b in text {
            self.data(b);
        }
    }

    fn set_text(&mut self, src: &[u8]) {
        self.text = [b' '; COLS];
        self.text[..src.len().min(COLS)].copy_from_slice(&src[..src.len().min(COLS)]);
    }

    /// Advance the demo one step (~15 ms) with the current button levels
    /// (true = pressed), ordered B1..B5.
    pub fn step(&mut self, buttons: [bool; BUTTON_COUNT]) {
        let [b1, b2, b3, b4, b5] = buttons;

        if self.released && b1 && !self.lcd_on {
            self.command(0x0C); // display on
            self.command(0x01); // clear
            self.set_text(b"    Welcome     ");
            let text = self.text;
            self.write_line(Line::Upper, &text);
            self.write_line(Line::Lower, &WELCOME_STRIP);
            self.released = false;
            self.lcd_on = true;
            self.line = Line::None;
        }

        if self.released && b2 && self.lcd_on {
            self.command(0x01);
            self.set_text(TEXT1);
            let text = self.text;
            self.write_line(Line::Upper, &text);
            self.released = false;
            self.line = Line::Upper;
        }

        if b3 && self.lcd_on && self.line != Line::None {
            self.slide_tick += 1;
            if self.slide_tick >= SLIDE_PERIOD {
                self.slide_tick = 0;
                self.text.rotate_left(1);
                let (line, text) = (self.line, self.text);
                self.write_line(line, &text);
            }
        } else {
            self.slide_tick = 0;
        }

        if self.released && b4 && self.lcd_on {
            self.command(0x01);
            self.set_text(TEXT2);
            let text = self.text;
            self.write_line(Line::Lower, &text);
            self.released = false;
            self.line = Line::Lower;
        }

        if self.released && b5 && self.lcd_on {
            self.command(0x01);
            self.set_text(b"    Turn OFF    ");
            let text = self.text;
            self.write_line(Line::Upper, &text);
            self.command(0x08); // display off
            self.released = false;
            self.lcd_on = false;
            self.line = Line::None;
        }

        if !(b1 || b2 || b3 || b4 || b5) {
            self.released = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charlcd_core::Hd44780;

    fn press(demo: &mut BoardDemo, idx: usize, steps: u32) {
        let mut buttons = [false; BUTTON_COUNT];
        buttons[idx] = true;
        for _ in 0..steps {
            demo.step(buttons);
        }
        for _ in 0..2 {
            demo.step([false; BUTTON_COUNT]);
        }
    }

    #[test]
    fn test_welcome_screen() {
        let shared = SharedHd44780::new(Hd44780::new(16, 2));
        let mut demo = BoardDemo::new(shared.clone());
        assert!(!shared.snapshot().display_on);

        press(&mut demo, 0, 1); // B1
        let snap = shared.snapshot();
        assert!(snap.display_on);
        assert_eq!(snap.row(0), b"    Welcome     ");
        assert_eq!(snap.row(1), &WELCOME_STRIP);
    }

    #[test]
    fn test_cgram_uploaded_via_bus() {
        let shared = SharedHd44780::new(Hd44780::new(16, 2));
        let _demo = BoardDemo::new(shared.clone());
        let snap = shared.snapshot();
        assert_eq!(snap.cgram_glyph(3), &CHARMAP[3]); // ground tile
        assert_eq!(snap.cgram_glyph(7), &[0b11111; 8]);
        assert!(!snap.in_cgram); // left back in DDRAM addressing
    }

    #[test]
    fn test_text_lines_and_slide() {
        let shared = SharedHd44780::new(Hd44780::new(16, 2));
        let mut demo = BoardDemo::new(shared.clone());
        press(&mut demo, 0, 1); // on
        press(&mut demo, 1, 1); // B2: text 1 upper
        assert_eq!(shared.snapshot().row(0), b"Conflux         ");

        press(&mut demo, 3, 1); // B4: text 2 lower
        let snap = shared.snapshot();
        assert_eq!(snap.row(1), b"Rampard         ");
        // B4 cleared the display first
        assert!(snap.row(0).iter().all(|&b| b == 0));

        // hold B3 long enough for one slide tick
        press(&mut demo, 2, SLIDE_PERIOD);
        assert_eq!(shared.snapshot().row(1), b"ampard         R");
    }

    #[test]
    fn test_release_latch_blocks_held_button() {
        let shared = SharedHd44780::new(Hd44780::new(16, 2));
        let mut demo = BoardDemo::new(shared.clone());
        // hold B1 across many steps: display turns on once; holding B5
        // pressed at the same time must not register without a release
        let mut buttons = [false; BUTTON_COUNT];
        buttons[0] = true;
        demo.step(buttons);
        assert!(shared.snapshot().display_on);
        buttons[4] = true;
        for _ in 0..10 {
            demo.step(buttons);
        }
        assert!(shared.snapshot().display_on);
    }

    #[test]
    fn test_turn_off() {
        let shared = SharedHd44780::new(Hd44780::new(16, 2));
        let mut demo = BoardDemo::new(shared.clone());
        press(&mut demo, 0, 1);
        press(&mut demo, 4, 1); // B5
        let snap = shared.snapshot();
        assert!(!snap.display_on);
        assert_eq!(snap.row(0), b"    Turn OFF    ");
    }
}
