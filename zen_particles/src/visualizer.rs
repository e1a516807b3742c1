//! Software-rendered point visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ SHAPE: HEART          COLOR #ff4d4d                          │
//! │ HAND: DETECTED  [██████░░░░]                                 │
//! │                                                              │
//! │                 · ·  particle cloud  · ·                     │
//! │                                                              │
//! │ GENERATING...                                                │
//! │ status line                                                  │
//! │ key legend                                                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every particle is a 2×2 splat added onto the framebuffer, so dense
//! regions glow brighter the way additive blending does on a GPU.

use std::io::{self, Write};
use std::sync::mpsc::Sender;

use glam::{Mat3, Vec3};
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use particle_shapes::{PointBuffer, ShapeArchetype};

use crate::camera::OrbitCamera;
use crate::error::{AppError, AppResult};
use crate::gesture::{SimInput, SimKey};
use crate::palette::Rgb;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:       usize = 960;
pub const WIN_H:       usize = 640;
pub const SPLAT:       usize = 2;
/// Per-particle opacity for additive blending.
pub const OPACITY:     f32   = 0.8;
const BG_COLOR:        u32   = 0xFF000000;
const HUD_TEXT:        u32   = 0xFFEEEEEE;
const HUD_DIM:         u32   = 0xFF888888;
const HUD_ACCENT:      u32   = 0xFFFFD700;
const BAR_W:           usize = 120;
const BAR_H:           usize = 6;
const STATUS_Y:        usize = WIN_H - 30;

// ════════════════════════════════════════════════════════════════════════════
// UI commands
// ════════════════════════════════════════════════════════════════════════════

/// Window keys that act on the application rather than the hand simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiCommand {
    SelectShape(ShapeArchetype),
    CycleColor,
    /// Ask for an AI prompt on stdin.
    Prompt,
    Quit,
}

/// Application command bound to `key`, if any.
pub fn key_command(key: Key) -> Option<UiCommand> {
    let cmd = match key {
        Key::Key1 => UiCommand::SelectShape(ShapeArchetype::Heart),
        Key::Key2 => UiCommand::SelectShape(ShapeArchetype::Flower),
        Key::Key3 => UiCommand::SelectShape(ShapeArchetype::Saturn),
        Key::Key4 => UiCommand::SelectShape(ShapeArchetype::MeditationFigure),
        Key::Key5 => UiCommand::SelectShape(ShapeArchetype::Fireworks),
        Key::Key6 => UiCommand::SelectShape(ShapeArchetype::DefaultCube),
        Key::C    => UiCommand::CycleColor,
        Key::G    => UiCommand::Prompt,
        Key::Q    => UiCommand::Quit,
        _         => return None,
    };
    Some(cmd)
}

/// Simulated-hand key bound to `key`, if any.
pub fn sim_key(key: Key) -> Option<SimKey> {
    match key {
        Key::Key0 => Some(SimKey::NoHands),
        Key::H    => Some(SimKey::OneHand),
        Key::J    => Some(SimKey::TwoHands),
        Key::Up   => Some(SimKey::Wider),
        Key::Down => Some(SimKey::Narrower),
        _         => None,
    }
}

const COMMAND_KEYS: [Key; 9] = [
    Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5, Key::Key6,
    Key::C, Key::G, Key::Q,
];
const SIM_ONE_SHOT: [Key; 3] = [Key::Key0, Key::H, Key::J];
const SIM_HELD:     [Key; 2] = [Key::Up, Key::Down];

/// Read a line of prompt text from stdin.
pub fn prompt_for_text(label: &str) -> io::Result<String> {
    print!("\n  {}: ", label);
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(buf.trim().to_string())
}

// ════════════════════════════════════════════════════════════════════════════
// Frame snapshot
// ════════════════════════════════════════════════════════════════════════════

/// HUD contents for one frame.
#[derive(Clone, Debug)]
pub struct Hud<'a> {
    pub shape:    &'a str,
    pub color:    Rgb,
    /// Hands in view as reported by the latest sample.
    pub detected: bool,
    pub distance: f32,
    pub loading:  bool,
    pub status:   &'a str,
}

/// Everything the renderer needs from the application for one frame.
#[derive(Clone, Debug)]
pub struct FrameView<'a> {
    pub live:       &'a PointBuffer,
    pub rotation_y: f32,
    pub color:      Rgb,
    pub camera:     &'a OrbitCamera,
    pub hud:        Option<Hud<'a>>,
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas: the framebuffer and its drawing primitives
// ════════════════════════════════════════════════════════════════════════════

pub struct Canvas {
    buf: Vec<u32>,
    w:   usize,
    h:   usize,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        Canvas { buf: vec![BG_COLOR; w * h], w, h }
    }

    pub fn pixels(&self) -> &[u32] { &self.buf }
    pub fn pixel(&self, x: usize, y: usize) -> u32 { self.buf[y * self.w + x] }

    pub fn clear(&mut self) { self.buf.fill(BG_COLOR); }

    /// Splat every live point, rotated about +Y and seen through `camera`.
    /// Returns how many points landed on screen.
    pub fn draw_particles(&mut self, view: &FrameView<'_>) -> usize {
        let projector = view.camera.projector(self.w, self.h);
        let spin      = Mat3::from_rotation_y(view.rotation_y);
        let add       = view.color.weighted(OPACITY);
        let mut drawn = 0;

        for [x, y, z] in view.live.points() {
            let p = spin * Vec3::new(x, y, z);
            let Some((sx, sy, _)) = projector.project(p) else { continue };
            if sx < 0.0 || sy < 0.0 { continue; }
            let (px, py) = (sx as usize, sy as usize);
            if px >= self.w || py >= self.h { continue; }

            for dy in 0..SPLAT {
                for dx in 0..SPLAT {
                    self.add_pixel(px + dx, py + dy, add);
                }
            }
            drawn += 1;
        }
        drawn
    }

    pub fn draw_hud(&mut self, hud: &Hud<'_>) {
        self.draw_label(&format!("SHAPE: {}", hud.shape), 10, 10, HUD_TEXT);
        self.draw_label(&format!("COLOR {}", hud.color), 10, 20, hud.color.to_argb());

        let hand = if hud.detected { "HAND: DETECTED" } else { "HAND: NONE" };
        self.draw_label(hand, 10, 34, if hud.detected { HUD_ACCENT } else { HUD_DIM });
        self.draw_bar(80, 33, hud.distance, if hud.detected { HUD_ACCENT } else { HUD_DIM });

        if hud.loading {
            self.draw_label("GENERATING...", 10, STATUS_Y - 14, HUD_ACCENT);
        }
        self.draw_label(hud.status, 10, STATUS_Y, HUD_TEXT);
        self.draw_label(
            "1-5=shape  6=cube  C=color  G=ai prompt  0/H/J=hands  UP/DOWN=spread  Q=quit",
            10, WIN_H - 14, HUD_DIM,
        );
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    /// Outlined bar filled to `fraction` of its width.
    fn draw_bar(&mut self, x: usize, y: usize, fraction: f32, color: u32) {
        let filled = (BAR_W as f32 * fraction.clamp(0.0, 1.0)) as usize;
        self.draw_border(x, y, BAR_W, BAR_H, HUD_DIM);
        self.fill_rect(x, y, filled, BAR_H, color);
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(self.h) {
            for col in x..(x+w).min(self.w) {
                self.buf[row * self.w + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        for col in x..(x+w).min(self.w) {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y+h-1, color);
        }
        for row in y..(y+h).min(self.h) {
            self.set_pixel(x, row, color);
            self.set_pixel(x+w-1, row, color);
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.w && y < self.h {
            self.buf[y * self.w + x] = color;
        }
    }

    /// Add per-channel contributions, saturating at white.
    fn add_pixel(&mut self, x: usize, y: usize, [r, g, b]: [u32; 3]) {
        if x >= self.w || y >= self.h { return; }
        let i   = y * self.w + x;
        let cur = self.buf[i];
        let ch  = |shift: u32, add: u32| (((cur >> shift) & 0xFF) + add).min(0xFF) << shift;
        self.buf[i] = 0xFF000000 | ch(16, r) | ch(8, g) | ch(0, b);
    }

    /// Minimal bitmap font: 3×5 characters for HUD text.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel(cx + col, y + row, color);
                    }
                }
            }
            cx += 4; // 3 wide + 1 gap
            if cx + 4 > self.w { break; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer: window, input and presentation
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    canvas: Canvas,
    sim_tx: Sender<SimInput>,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>) -> AppResult<Self> {
        let mut window = Window::new(
            "ZenParticles",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| AppError::Window(e.to_string()))?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            canvas: Canvas::new(WIN_W, WIN_H),
            sim_tx,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll the keyboard.  Hand-simulation keys go straight to the sim
    /// source; everything else comes back as [`UiCommand`]s.
    pub fn poll_input(&mut self) -> Vec<UiCommand> {
        if !self.window.is_open() { return vec![UiCommand::Quit]; }

        let mut commands = Vec::new();
        for key in COMMAND_KEYS {
            if self.window.is_key_pressed(key, KeyRepeat::No) {
                commands.extend(key_command(key));
            }
        }

        let pressed = SIM_ONE_SHOT.iter()
            .filter(|&&k| self.window.is_key_pressed(k, KeyRepeat::No))
            .chain(SIM_HELD.iter().filter(|&&k| self.window.is_key_pressed(k, KeyRepeat::Yes)));
        for &key in pressed {
            if let Some(sk) = sim_key(key) {
                let _ = self.sim_tx.send(SimInput::KeyDown(sk));
            }
        }
        commands
    }

    /// Tell the hand simulator to stop.
    pub fn shutdown_sim(&self) {
        let _ = self.sim_tx.send(SimInput::Quit);
    }

    /// Render and present one frame.
    pub fn render(&mut self, view: &FrameView<'_>) {
        self.canvas.clear();
        let drawn = self.canvas.draw_particles(view);
        log::trace!("{} of {} particles on screen", drawn, view.live.point_count());
        if let Some(hud) = &view.hud {
            self.canvas.draw_hud(hud);
        }
        if let Err(e) = self.window.update_with_buffer(self.canvas.pixels(), WIN_W, WIN_H) {
            log::warn!("frame not presented: {}", e);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        '"' => [0b101, 0b101, 0b000, 0b000, 0b000],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
