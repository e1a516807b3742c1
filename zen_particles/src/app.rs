//! Top-level application state.
//!
//! `AppState` owns the selected shape, the target and live particle buffers,
//! the orbit camera, the latest gesture sample and the AI generation worker.
//! Inputs flow one way: UI commands, gesture samples and generation results
//! update the state, then `tick` advances the animation and the render loop
//! draws a [`FrameView`] of it.

use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

use hand_gesture::{GestureSample, SampleSlot};
use particle_shapes::{generate, PointBuffer, ShapeArchetype};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ai::{
    CommandProvider, GenerationResult, Generator, OfflineProvider, PointCloudProvider,
    ProviderError,
};
use crate::animator::{FrameInput, ParticleAnimator};
use crate::camera::OrbitCamera;
use crate::error::AppResult;
use crate::gesture::{spawn_hand_source, SimInput};
use crate::palette::{self, Rgb, DEFAULT_COLOR};
use crate::visualizer::{prompt_for_text, FrameView, Hud, UiCommand, Visualizer};

/// Longest frame step fed to the animator; a stall (window drag, stdin
/// prompt) resumes smoothly instead of snapping.
pub const MAX_FRAME_DELTA: f32 = 0.1;

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub shape:       ShapeArchetype,
    pub color:       Rgb,
    pub point_count: usize,
    /// External command that turns a prompt into `{"points": [...]}`.
    pub points_cmd:  Option<String>,
    pub show_hud:    bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            shape:       ShapeArchetype::Heart,
            color:       DEFAULT_COLOR,
            point_count: 6000,
            points_cmd:  None,
            show_hud:    true,
        }
    }
}

impl AppConfig {
    /// The provider named by `points_cmd`, or the offline one.
    pub fn provider(&self) -> AppResult<Box<dyn PointCloudProvider>> {
        match &self.points_cmd {
            None => Ok(Box::new(OfflineProvider)),
            Some(line) => {
                let cmd = CommandProvider::from_command_line(line)
                    .ok_or_else(|| ProviderError::Unavailable("points command is blank".into()))?;
                Ok(Box::new(cmd))
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── what to show ──────────────────────────────────────────────────────
    archetype:   ShapeArchetype,
    color:       Rgb,
    point_count: usize,
    ai_points:   Option<PointBuffer>,
    target:      PointBuffer,

    // ── motion ────────────────────────────────────────────────────────────
    animator:    ParticleAnimator,
    camera:      OrbitCamera,
    gesture:     SampleSlot,

    // ── AI generation ─────────────────────────────────────────────────────
    generator:   Generator,

    rng:         StdRng,
    show_hud:    bool,

    // ── status message ────────────────────────────────────────────────────
    pub status:  String,
}

impl AppState {
    pub fn new<P: PointCloudProvider>(cfg: AppConfig, provider: P) -> Self {
        Self::with_rng(cfg, provider, StdRng::from_entropy())
    }

    /// Like [`AppState::new`] with an explicit random source.
    pub fn with_rng<P: PointCloudProvider>(cfg: AppConfig, provider: P, mut rng: StdRng) -> Self {
        let target   = generate(cfg.shape, cfg.point_count, None, &mut rng);
        let animator = ParticleAnimator::new(cfg.point_count, &mut rng);

        AppState {
            archetype:   cfg.shape,
            color:       cfg.color,
            point_count: cfg.point_count,
            ai_points:   None,
            target,
            animator,
            camera:      OrbitCamera::new(),
            gesture:     SampleSlot::new(),
            generator:   Generator::spawn(provider),
            rng,
            show_hud:    cfg.show_hud,
            status:      format!("Ready: {} × {} points", cfg.shape, cfg.point_count),
        }
    }

    fn rebuild_target(&mut self) {
        self.target = generate(
            self.archetype,
            self.point_count,
            self.ai_points.as_ref(),
            &mut self.rng,
        );
        log::debug!("target rebuilt: {} × {}", self.archetype, self.point_count);
    }

    // ── UI inputs ─────────────────────────────────────────────────────────

    /// Switch shape.  Re-selecting the current shape keeps its target.
    pub fn set_archetype(&mut self, archetype: ShapeArchetype) {
        if archetype == self.archetype { return; }
        self.archetype = archetype;
        self.rebuild_target();
        self.status = format!("Shape: {}", archetype);
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.color = color;
        self.status = format!("Color: {}", color);
    }

    pub fn cycle_color(&mut self) {
        self.set_color(palette::next_preset(self.color));
    }

    pub fn set_point_count(&mut self, point_count: usize) {
        if point_count == self.point_count { return; }
        self.point_count = point_count;
        self.rebuild_target();
        self.status = format!("{} points", point_count);
    }

    /// Apply a window command.  Returns false on quit.
    pub fn handle_command(&mut self, cmd: UiCommand) -> bool {
        match cmd {
            UiCommand::SelectShape(a) => self.set_archetype(a),
            UiCommand::CycleColor     => self.cycle_color(),
            UiCommand::Prompt         => { /* needs stdin; handled in run loop */ }
            UiCommand::Quit           => return false,
        }
        true
    }

    // ── gestures ──────────────────────────────────────────────────────────

    /// Store a sample for the next tick; the camera drifts only while no
    /// hand is steering.
    pub fn apply_gesture(&mut self, sample: GestureSample) {
        self.gesture.publish(sample);
        self.camera.set_auto_rotate(!sample.detected);
    }

    /// Apply the newest sample queued by the hand source, if any.
    pub fn drain_gestures(&mut self, rx: &Receiver<GestureSample>) {
        if self.gesture.drain(rx) {
            self.camera.set_auto_rotate(!self.gesture.latest().detected);
        }
    }

    // ── AI generation ─────────────────────────────────────────────────────

    /// Send a prompt to the generator.  Blank prompts are ignored (`None`).
    pub fn submit_prompt(&mut self, prompt: &str) -> Option<u64> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            log::debug!("ignoring blank prompt");
            return None;
        }
        let seq = self.generator.request(prompt);
        self.status = format!("Generating \"{}\"...", prompt);
        Some(seq)
    }

    /// Adopt a finished generation: its points, its prompt's color, and the
    /// AI shape.
    pub fn apply_generation(&mut self, result: GenerationResult) {
        self.color = palette::color_for_prompt(&result.prompt);
        self.ai_points = Some(result.points);
        self.archetype = ShapeArchetype::AiGenerated;
        self.rebuild_target();
        self.status = if result.fell_back {
            format!("Generation failed for \"{}\", showing fallback cloud", result.prompt)
        } else {
            format!("Generated \"{}\"", result.prompt)
        };
    }

    /// Apply the generator's latest result if it has arrived.
    pub fn poll_generation(&mut self) -> bool {
        match self.generator.poll() {
            Some(result) => { self.apply_generation(result); true }
            None         => false,
        }
    }

    // ── Per-frame tick ────────────────────────────────────────────────────

    pub fn tick(&mut self, elapsed: f32, delta: f32) {
        self.poll_generation();
        self.camera.tick(delta);
        let input = FrameInput { elapsed, delta, gesture: self.gesture.latest() };
        self.animator.tick(&self.target, input, &mut self.rng);
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn archetype(&self)   -> ShapeArchetype           { self.archetype }
    pub fn color(&self)       -> Rgb                      { self.color }
    pub fn point_count(&self) -> usize                    { self.point_count }
    pub fn target(&self)      -> &PointBuffer             { &self.target }
    pub fn ai_points(&self)   -> Option<&PointBuffer>     { self.ai_points.as_ref() }
    pub fn live(&self)        -> &PointBuffer             { self.animator.live() }
    pub fn gesture(&self)     -> GestureSample            { self.gesture.latest() }
    pub fn camera(&self)      -> &OrbitCamera             { &self.camera }
    pub fn is_loading(&self)  -> bool                     { self.generator.is_loading() }

    pub fn frame_view(&self) -> FrameView<'_> {
        let sample = self.gesture.latest();
        FrameView {
            live:       self.animator.live(),
            rotation_y: self.animator.rotation_y(),
            color:      self.color,
            camera:     &self.camera,
            hud:        self.show_hud.then(|| Hud {
                shape:    self.archetype.name(),
                color:    self.color,
                detected: sample.detected,
                distance: sample.distance,
                loading:  self.generator.is_loading(),
                status:   &self.status,
            }),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// This is the entry point called from `main.rs`.  It creates the visualizer,
/// the hand source (simulation by default, hardware with `--features leap`)
/// and the generation worker, and drives the render loop at ~60 fps.
pub fn run(cfg: AppConfig) -> AppResult<()> {
    let provider = cfg.provider()?;

    // ── Hand source ───────────────────────────────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    #[cfg(not(feature = "leap"))]
    let samples = spawn_hand_source(crate::gesture::SimHandSource { rx: sim_rx });
    #[cfg(feature = "leap")]
    let samples = {
        drop(sim_rx);
        spawn_hand_source(crate::gesture::LeapHandSource)
    };

    // ── Visualizer (owns the window and the sim input sender) ────────────
    let mut vis = Visualizer::new(sim_tx)?;

    // ── App state ─────────────────────────────────────────────────────────
    log::info!("starting with {} × {} points, color {}", cfg.shape, cfg.point_count, cfg.color);
    let mut app = AppState::new(cfg, provider);

    let start    = Instant::now();
    let mut last = start;

    // ── Main loop ─────────────────────────────────────────────────────────
    'frames: while vis.is_open() {
        // 1. Window commands
        for cmd in vis.poll_input() {
            match cmd {
                UiCommand::Prompt => match prompt_for_text("Describe a shape") {
                    Ok(text) => { app.submit_prompt(&text); }
                    Err(e)   => log::warn!("could not read prompt: {}", e),
                },
                other => if !app.handle_command(other) { break 'frames; },
            }
        }

        // 2. Gesture samples
        app.drain_gestures(&samples);

        // 3. Per-frame logic
        let now   = Instant::now();
        let delta = (now - last).as_secs_f32().min(MAX_FRAME_DELTA);
        last = now;
        app.tick((now - start).as_secs_f32(), delta);

        // 4. Render
        vis.render(&app.frame_view());
    }

    vis.shutdown_sim();
    log::info!("window closed");
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
