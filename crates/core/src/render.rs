//! Glyph rasterizer: draws a controller snapshot into an RGBA framebuffer.
//!
//! Layout mirrors the classic panel look: a border of 3 LCD dots around the
//! character matrix and a one-dot gap between cells. One framebuffer pixel
//! per LCD dot; the frontend scales up for the window.
//!
//! Character codes below 8 are resolved from the snapshot's CGRAM (the
//! user-definable glyphs); everything else comes from the fixed
//! [`crate::cgrom`] table. Unchanged snapshots are detected via the
//! revision counters and skipped.

use crate::cgrom;
use crate::controller::Snapshot;
use crate::{CHAR_HEIGHT, CHAR_WIDTH};

/// Border around the character matrix, in LCD dots.
pub const BORDER: usize = 3;

/// Default palette: the fluorescent-green scheme of the original boards.
pub const PANEL_BACKGROUND: u32 = 0x00AA00;
pub const PIXEL_OFF: u32 = 0x00CC00;
pub const PIXEL_ON: u32 = 0x003300;

#[derive(PartialEq, Eq)]
struct CacheKey {
    ddram_rev: u64,
    cgram_rev: u64,
    display_on: bool,
    cursor_on: bool,
    blink_on: bool,
    cursor: Option<(usize, usize)>,
    blink_phase: bool,
}

/// Renders snapshots of one panel geometry into an RGBA framebuffer.
pub struct Rasterizer {
    cols: usize,
    rows: usize,
    width: usize,
    height: usize,
    /// Palette, 0xRRGGBB.
    pub background: u32,
    pub pixel_off: u32,
    pub pixel_on: u32,
    framebuffer: Vec<u8>,
    last: Option<CacheKey>,
}

impl Rasterizer {
    pub fn new(cols: usize, rows: usize) -> Self {
        let width = 2 * BORDER - 1 + cols * (CHAR_WIDTH + 1);
        let height = 2 * BORDER - 1 + rows * (CHAR_HEIGHT + 1);
        Rasterizer {
            cols,
            rows,
            width,
            height,
            background: PANEL_BACKGROUND,
            pixel_off: PIXEL_OFF,
            pixel_on: PIXEL_ON,
            framebuffer: vec![0; width * height * 4],
            last: None,
        }
    }

    /// Framebuffer width in pixels (LCD dots).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Framebuffer height in pixels (LCD dots).
    pub fn height(&self) -> usize {
        self.height
    }

    /// RGBA framebuffer bytes, row-major.
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Rasterize a snapshot. `blink_phase` is the current on/off phase of
    /// the cursor blink clock, supplied by the frontend. Returns false if
    /// nothing changed since the last call and the framebuffer was left
    /// as-is.
    pub fn render(&mut self, snap: &Snapshot, blink_phase: bool) -> bool {
        let key = CacheKey {
            ddram_rev: snap.ddram_rev,
            cgram_rev: snap.cgram_rev,
            display_on: snap.display_on,
            cursor_on: snap.cursor_on,
            blink_on: snap.blink_on,
            cursor: snap.cursor_cell(),
            blink_phase,
        };
        if self.last.as_ref() == Some(&key) {
            return false;
        }

        self.fill(self.background);
        let cursor = key.cursor;
        for row in 0..self.rows.min(snap.rows) {
            let codes = snap.row(row);
            for col in 0..self.cols.min(snap.cols) {
                let code = codes[col];
                let bits: &[u8] = if snap.display_on {
                    if code < 8 {
                        snap.cgram_glyph(code)
                    } else {
                        cgrom::glyph(code)
                    }
                } else {
                    // Panel off: every dot unlit
                    &[0; CHAR_HEIGHT]
                };
                let at_cursor = snap.display_on && cursor == Some((row, col));
                let blink_fill = at_cursor && snap.blink_on && blink_phase;
                self.draw_cell(row, col, bits, blink_fill);
                if at_cursor && snap.cursor_on {
                    self.draw_cursor_line(row, col);
                }
            }
        }
        self.last = Some(key);
        true
    }

    /// Framebuffer as 0xRRGGBB words for minifb.
    pub fn as_pixel_buffer(&self) -> Vec<u32> {
        let mut pixels = vec![0u32; self.width * self.height];
        for i in 0..pixels.len() {
            let r = self.framebuffer[i * 4] as u32;
            let g = self.framebuffer[i * 4 + 1] as u32;
            let b = self.framebuffer[i * 4 + 2] as u32;
            pixels[i] = (r << 16) | (g << 8) | b;
        }
        pixels
    }

    fn fill(&mut self, color: u32) {
        for i in 0..self.width * self.height {
            self.put(i, color);
        }
    }

    fn draw_cell(&mut self, row: usize, col: usize, bits: &[u8], blink_fill: bool) {
        let x0 = BORDER + col * (CHAR_WIDTH + 1);
        let y0 = BORDER + row * (CHAR_HEIGHT + 1);
        for (y, &pattern) in bits.iter().take(CHAR_HEIGHT).enumerate() {
            for x in 0..CHAR_WIDTH {
                let lit = blink_fill || pattern & (1 << (CHAR_WIDTH - 1 - x)) != 0;
                let color = if lit { self.pixel_on } else { self.pixel_off };
                self.put((y0 + y) * self.width + x0 + x, color);
            }
        }
    }

    /// Underline cursor: the bottom dot row of the cell.
    fn draw_cursor_line(&mut self, row: usize, col: usize) {
        let x0 = BORDER + col * (CHAR_WIDTH + 1);
        let y = BORDER + row * (CHAR_HEIGHT + 1) + CHAR_HEIGHT - 1;
        for x in 0..CHAR_WIDTH {
            self.put(y * self.width + x0 + x, self.pixel_on);
        }
    }

    #[inline]
    fn put(&mut self, index: usize, color: u32) {
        let p = index * 4;
        self.framebuffer[p] = (color >> 16) as u8;
        self.framebuffer[p + 1] = (color >> 8) as u8;
        self.framebuffer[p + 2] = color as u8;
        self.framebuffer[p + 3] = 0xFF;
    }
}
