//! Character LCD board simulator frontend.
//!
//! Simulates a 16×2 HD44780 panel with five board buttons, driven by the
//! built-in firmware demo (see [`demo`]). Two execution modes:
//!
//! - **GUI mode** (default): scaled LCD window; keys `8/4/5/6/2` press
//!   buttons B1–B5 (gamepad d-pad + south button also mapped), `S` saves a
//!   BMP screenshot, `F5`/`F9` quick-save/load the controller state,
//!   `Q`/Esc quits.
//! - **Headless mode** (`--headless`): runs the demo for a fixed number of
//!   steps with scripted button presses and prints ASCII snapshots of the
//!   panel, for automated testing.
//!
//! Simulation and rendering run on separate threads: the demo thread wiggles
//! the bus pins at ~64 steps/s while the UI thread takes snapshots and
//! rasterizes them.

use charlcd_core::{savestate, Hd44780, Rasterizer, SharedHd44780};
use gilrs::{Button as GilrsButton, Event as GilrsEvent, EventType, Gilrs};
use minifb::{Key, Scale, ScaleMode, Window, WindowOptions};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

mod demo;
use demo::{BoardDemo, BUTTON_COUNT, BUTTON_NAMES};

/// Simulated panel geometry.
const PANEL_COLS: usize = 16;
const PANEL_ROWS: usize = 2;

/// Demo steps (and redraws) per second, like the original board simulator.
const STEP_RATE: u64 = 64;
/// Cursor blink half-period in milliseconds.
const BLINK_MS: u128 = 400;

/// UI keys for buttons B1..B5.
const BUTTON_KEYS: [Key; BUTTON_COUNT] = [Key::Key8, Key::Key4, Key::Key5, Key::Key6, Key::Key2];

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        eprintln!("charlcd-emu - character LCD board simulator");
        eprintln!("Usage: {} [options]", args[0]);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --headless           Run without GUI");
        eprintln!("  --frames N           Run N steps in headless mode (default 60)");
        eprintln!("  --press F:B          Press button B (1-5) on step F, hold 10 steps");
        eprintln!("                       (repeatable)");
        eprintln!("  --snapshot F         Print panel at step F (repeatable)");
        eprintln!("  --debug              Show per-step command/data byte counts");
        eprintln!("  --scale N            Window scale 1-8 (default 4)");
        eprintln!("  --state FILE         Save state path (default charlcd.state)");
        eprintln!();
        eprintln!("GUI keys: 8/4/5/6/2 = buttons B1..B5");
        eprintln!("          S=Screenshot F5=Save F9=Load Q/Esc=Quit");
        std::process::exit(0);
    }

    let headless = args.iter().any(|a| a == "--headless");
    let debug = args.iter().any(|a| a == "--debug");
    let scale: usize = arg_value(&args, "--scale")
        .and_then(|s| s.parse().ok())
        .unwrap_or(4)
        .clamp(1, 8);
    let state_path = arg_value(&args, "--state").unwrap_or_else(|| "charlcd.state".to_string());

    let shared = SharedHd44780::new(Hd44780::new(PANEL_COLS, PANEL_ROWS));

    if headless {
        run_headless(&args, shared, debug);
    } else {
        run_gui(shared, scale, debug, &state_path);
    }
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

// ─── Gamepad ────────────────────────────────────────────────────────────────

fn init_gamepad(debug: bool) -> Option<Gilrs> {
    match Gilrs::new() {
        Ok(gilrs) => {
            if debug {
                for (id, gp) in gilrs.gamepads() {
                    println!("Gamepad: [{}] \"{}\"", id, gp.name());
                }
            }
            Some(gilrs)
        }
        Err(e) => {
            eprintln!("Warning: gamepad: {}", e);
            None
        }
    }
}

/// D-pad matches the board's button cross (up=B1, left=B2, right=B4,
/// down=B5); the face buttons mirror it, with south as the middle
/// button B3.
fn poll_gamepad(gilrs: &mut Gilrs, pad: &mut [bool; BUTTON_COUNT]) {
    while let Some(GilrsEvent { event, .. }) = gilrs.next_event() {
        match event {
            EventType::ButtonPressed(b, _) => apply_button(pad, b, true),
            EventType::ButtonReleased(b, _) => apply_button(pad, b, false),
            EventType::Disconnected => *pad = [false; BUTTON_COUNT],
            _ => {}
        }
    }
}

fn apply_button(pad: &mut [bool; BUTTON_COUNT], btn: GilrsButton, pressed: bool) {
    match btn {
        GilrsButton::DPadUp | GilrsButton::North => pad[0] = pressed,
        GilrsButton::DPadLeft | GilrsButton::West => pad[1] = pressed,
        GilrsButton::South => pad[2] = pressed,
        GilrsButton::DPadRight | GilrsButton::East => pad[3] = pressed,
        GilrsButton::DPadDown => pad[4] = pressed,
        _ => {}
    }
}

// ─── Screenshot (BMP) ───────────────────────────────────────────────────────

fn save_screenshot(rast: &Rasterizer, path: &str) -> Result<(), String> {
    let pixels = rast.as_pixel_buffer();
    let w = rast.width() as u32;
    let h = rast.height() as u32;
    let row_size = (w * 3 + 3) & !3;
    let pixel_data_size = row_size * h;
    let file_size = 54 + pixel_data_size;
    let mut data = Vec::with_capacity(file_size as usize);
    // BMP header
    data.extend_from_slice(b"BM");
    data.extend_from_slice(&file_size.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&54u32.to_le_bytes());
    // DIB header
    data.extend_from_slice(&40u32.to_le_bytes());
    data.extend_from_slice(&w.to_le_bytes());
    data.extend_from_slice(&h.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&24u16.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&pixel_data_size.to_le_bytes());
    data.extend_from_slice(&2835u32.to_le_bytes());
    data.extend_from_slice(&2835u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    // Pixel data (bottom-up BGR)
    for y in (0..h as usize).rev() {
        let mut row_bytes = 0u32;
        for x in 0..w as usize {
            let px = pixels[y * rast.width() + x];
            data.push((px & 0xFF) as u8);
            data.push(((px >> 8) & 0xFF) as u8);
            data.push(((px >> 16) & 0xFF) as u8);
            row_bytes += 3;
        }
        while row_bytes % 4 != 0 {
            data.push(0);
            row_bytes += 1;
        }
    }
    fs::write(path, &data).map_err(|e| format!("{}: {}", path, e))
}

// ─── GUI Mode ───────────────────────────────────────────────────────────────

fn run_gui(shared: SharedHd44780, scale: usize, debug: bool, state_path: &str) {
    let mut rast = Rasterizer::new(PANEL_COLS, PANEL_ROWS);
    let scaled_w = rast.width() * scale;
    let scaled_h = rast.height() * scale;

    let mut window = Window::new(
        "charlcd-emu - press 'q' to quit",
        scaled_w,
        scaled_h,
        WindowOptions {
            scale: Scale::X1,
            scale_mode: ScaleMode::AspectRatioStretch,
            resize: true,
            ..Default::default()
        },
    )
    .expect("Failed to create window");
    window.set_target_fps(STEP_RATE as usize);

    // Button levels shared with the demo thread.
    let buttons: Arc<[AtomicBool; BUTTON_COUNT]> =
        Arc::new(std::array::from_fn(|_| AtomicBool::new(false)));
    let stop = Arc::new(AtomicBool::new(false));

    // Demo thread: steps the firmware stand-in against the shared
    // controller, like the original simulator's MCU thread.
    let sim = {
        let shared = shared.clone();
        let buttons = buttons.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut board = BoardDemo::new(shared);
            let period = Duration::from_millis(1000 / STEP_RATE);
            while !stop.load(Ordering::Relaxed) {
                let mut levels = [false; BUTTON_COUNT];
                for (level, atom) in levels.iter_mut().zip(buttons.iter()) {
                    *level = atom.load(Ordering::Relaxed);
                }
                board.step(levels);
                thread::sleep(period);
            }
        })
    };

    let mut gilrs = init_gamepad(debug);
    let mut pad = [false; BUTTON_COUNT];
    let start_time = Instant::now();
    let mut scaled_buf = vec![0u32; scaled_w * scaled_h];
    let mut prev_s = false;
    let mut prev_f5 = false;
    let mut prev_f9 = false;
    let mut prev_pressed = [false; BUTTON_COUNT];
    let mut screenshot_n = 0u32;
    let mut last_fps_time = Instant::now();
    let mut fps_frames: u64 = 0;

    while window.is_open() && !window.is_key_down(Key::Escape) && !window.is_key_down(Key::Q) {
        if let Some(ref mut g) = gilrs {
            poll_gamepad(g, &mut pad);
        }

        for i in 0..BUTTON_COUNT {
            let pressed = window.is_key_down(BUTTON_KEYS[i]) || pad[i];
            buttons[i].store(pressed, Ordering::Relaxed);
            if debug && pressed != prev_pressed[i] {
                println!(
                    "Button {} {}",
                    BUTTON_NAMES[i],
                    if pressed { "pressed" } else { "released" }
                );
            }
            prev_pressed[i] = pressed;
        }

        // Screenshot (S)
        let s = window.is_key_down(Key::S);
        if s && !prev_s {
            let f = format!("screenshot_{:04}.bmp", screenshot_n);
            match save_screenshot(&rast, &f) {
                Ok(()) => {
                    eprintln!("Screenshot: {}", f);
                    screenshot_n += 1;
                }
                Err(e) => eprintln!("Screenshot error: {}", e),
            }
        }
        prev_s = s;

        // Quick save / load (F5 / F9)
        let f5 = window.is_key_down(Key::F5);
        if f5 && !prev_f5 {
            match savestate::save_to_file(&shared.snapshot(), Path::new(state_path)) {
                Ok(()) => eprintln!("State saved: {}", state_path),
                Err(e) => eprintln!("Save error: {}", e),
            }
        }
        prev_f5 = f5;

        let f9 = window.is_key_down(Key::F9);
        if f9 && !prev_f9 {
            match savestate::load_from_file(Path::new(state_path)) {
                Ok(loaded) => {
                    shared.with(|lcd| *lcd = loaded);
                    eprintln!("State loaded: {}", state_path);
                }
                Err(e) => eprintln!("Load error: {}", e),
            }
        }
        prev_f9 = f9;

        // Render
        let blink_phase = (start_time.elapsed().as_millis() / BLINK_MS) % 2 == 0;
        let snap = shared.snapshot();
        rast.render(&snap, blink_phase);
        let pixels = rast.as_pixel_buffer();
        for y in 0..rast.height() {
            for x in 0..rast.width() {
                let c = pixels[y * rast.width() + x];
                for sy in 0..scale {
                    let base = (y * scale + sy) * scaled_w + x * scale;
                    for sx in 0..scale {
                        scaled_buf[base + sx] = c;
                    }
                }
            }
        }
        window
            .update_with_buffer(&scaled_buf, scaled_w, scaled_h)
            .expect("update");

        fps_frames += 1;
        if last_fps_time.elapsed() >= Duration::from_secs(2) {
            let fps = fps_frames as f64 / last_fps_time.elapsed().as_secs_f64();
            window.set_title(&format!("charlcd-emu - {:.0} FPS ({}x)", fps, scale));
            fps_frames = 0;
            last_fps_time = Instant::now();
        }
    }

    stop.store(true, Ordering::Relaxed);
    let _ = sim.join();
}

// ─── Headless Mode ──────────────────────────────────────────────────────────

/// How long a scripted press is held, in steps. Long enough for the demo's
/// slide timer to fire at least once.
const SCRIPT_HOLD: usize = 10;

fn run_headless(args: &[String], shared: SharedHd44780, debug: bool) {
    let frames: usize = arg_value(args, "--frames")
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    // --press F:B pairs
    let mut presses: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--press" {
            if let Some(spec) = args.get(i + 1) {
                match parse_press(spec) {
                    Some(p) => presses.push(p),
                    None => eprintln!("Warning: bad --press spec '{}' (want F:B)", spec),
                }
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    let mut snapshots: Vec<usize> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--snapshot" {
            if let Some(f) = args.get(i + 1).and_then(|s| s.parse().ok()) {
                snapshots.push(f);
            }
            i += 2;
        } else {
            i += 1;
        }
    }

    let mut board = BoardDemo::new(shared.clone());
    if debug {
        println!("Running {} steps...", frames);
    }
    for frame in 0..frames {
        let mut levels = [false; BUTTON_COUNT];
        for &(at, button) in &presses {
            if frame >= at && frame < at + SCRIPT_HOLD {
                levels[button] = true;
            }
        }
        board.step(levels);

        if debug {
            let (cmds, data) = shared.with(|lcd| {
                let c = (lcd.dbg_cmd_count, lcd.dbg_data_count);
                lcd.dbg_reset_counters();
                c
            });
            if cmds > 0 || data > 0 {
                println!("  Step {:3}: cmd={:3} data={:3}", frame + 1, cmds, data);
            }
        }
        if snapshots.contains(&(frame + 1)) || (debug && frame == frames - 1) {
            println!("\n  === Step {} ===", frame + 1);
            print_panel(&shared);
        }
    }
}

fn parse_press(spec: &str) -> Option<(usize, usize)> {
    let (frame, button) = spec.split_once(':')?;
    let frame: usize = frame.parse().ok()?;
    let button: usize = button.parse().ok()?;
    if (1..=BUTTON_COUNT).contains(&button) {
        Some((frame, button - 1))
    } else {
        None
    }
}

/// Print the panel contents as ASCII. Custom glyph codes show as their
/// digit, other non-printables as '.'; zeroed cells are blank.
fn print_panel(shared: &SharedHd44780) {
    let snap = shared.snapshot();
    let mut border = String::from("  +");
    for _ in 0..snap.cols {
        border.push('-');
    }
    border.push('+');
    println!("{} {}", border, if snap.display_on { "" } else { "(off)" });
    for row in 0..snap.rows {
        let mut line = String::from("  |");
        for &code in snap.row(row) {
            line.push(match code {
                0 => ' ',
                1..=7 => (b'0' + code) as char,
                0x20..=0x7E => code as char,
                _ => '.',
            });
        }
        line.push('|');
        println!("{}", line);
    }
    println!("{}", border);
}
