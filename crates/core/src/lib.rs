//! # charlcd-core
//!
//! Emulation core for HD44780-class character LCD controllers, the display
//! used on small AVR development boards (16×2 and 20×4 panels).
//!
//! The controller model is driven exactly like the real chip: byte-level
//! command/data writes arriving over a 4-bit or 8-bit parallel bus. It keeps
//! the chip's internal addressable memory (DDRAM for visible characters,
//! CGRAM for the 8 user-definable glyphs), the address counter, entry mode,
//! and display control flags, and exposes read-only snapshots for renderers.
//!
//! ## Architecture
//!
//! - [`Hd44780`] — Display controller state machine (memory, cursor, flags)
//! - [`Command`] — Decoded controller instruction ([`decode`])
//! - [`PinBus`] — Pin-level bus adapter (RS/RW/E + data lines, 4-bit nibble
//!   assembly)
//! - [`cgrom`] — Fixed 256-glyph character ROM (ROM code A00)
//! - [`Rasterizer`] — Renders a snapshot to an RGBA framebuffer
//! - [`SharedHd44780`] — Thread-safe handle for a writer thread plus
//!   independent renderer threads
//! - [`savestate`] — Save/load of controller state to a file
//!
//! ## Threading
//!
//! The controller itself is a plain mutable struct; every operation is
//! synchronous and O(1) per byte. A simulation thread drives writes while a
//! UI thread renders, so cross-thread use goes through [`SharedHd44780`],
//! which copies state out under a lock. Renderers detect changes by
//! comparing the monotonic revision counters carried in each snapshot; no
//! renderer ever mutates controller state.

pub mod bus;
pub mod cgrom;
pub mod command;
pub mod controller;
pub mod render;
pub mod savestate;
pub mod shared;

pub use bus::PinBus;
pub use command::{decode, Command};
pub use controller::{Hd44780, Snapshot};
pub use render::Rasterizer;
pub use shared::SharedHd44780;

/// Glyph width in pixels.
pub const CHAR_WIDTH: usize = 5;
/// Glyph height in pixels.
pub const CHAR_HEIGHT: usize = 8;

/// Addressable DDRAM span (the set-DDRAM-address payload is 7 bits).
pub const DDRAM_SIZE: usize = 0x80;
/// CGRAM size: 8 custom glyphs × 8 rows.
pub const CGRAM_SIZE: usize = 0x40;
/// Offset of CGRAM within the unified memory view.
pub const CGRAM_BASE: usize = 0x80;
/// Total unified memory: DDRAM followed by CGRAM.
pub const VRAM_SIZE: usize = DDRAM_SIZE + CGRAM_SIZE;

/// Number of user-definable CGRAM glyphs (codes 0–7).
pub const CGRAM_GLYPHS: usize = 8;

/// DDRAM base address of each display row.
///
/// Fixed by the chip's row multiplexing: rows 2 and 3 of a 4-row panel
/// continue rows 0 and 1 twenty columns in. Firmware addresses rows by
/// these exact literals (`0x80 | base`).
pub const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Largest supported panel geometry.
pub const MAX_COLS: usize = 20;
pub const MAX_ROWS: usize = 4;
