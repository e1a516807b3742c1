//! Text-to-point-cloud generation on a worker thread.
//!
//! A provider turns a free-text prompt into a flat `[x, y, z, …]` list.  The
//! render loop never waits on it: requests go to a worker thread and results
//! come back over a channel, tagged with the sequence number of the request
//! that produced them.  Only the newest request's result is ever applied.
//!
//! | Provider          | Behaviour                                           |
//! |-------------------|-----------------------------------------------------|
//! | `CommandProvider` | runs an external program, reads JSON from stdout    |
//! | `OfflineProvider` | always unavailable, so every request falls back     |
//!
//! A failed request is not an error for the caller: it yields the fallback
//! cloud, a loose 300-point cube.

use std::process::Command;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use particle_shapes::{uniform_cube, PointBuffer, ShapeError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;

/// Points in the fallback cloud.
pub const FALLBACK_POINTS: usize = 300;
/// Half-extent of the fallback cube.
pub const FALLBACK_HALF_EXTENT: f32 = 1.5;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no point-cloud provider available: {0}")]
    Unavailable(String),

    #[error("failed to run provider: {0}")]
    Io(#[from] std::io::Error),

    #[error("provider exited with {status}: {stderr}")]
    Command { status: String, stderr: String },

    #[error("malformed provider response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("provider returned no points")]
    Empty,

    #[error("provider returned unusable points: {0}")]
    Ragged(#[from] ShapeError),
}

// ════════════════════════════════════════════════════════════════════════════
// Providers
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can turn a prompt into flat coordinates.
pub trait PointCloudProvider: Send + 'static {
    fn name(&self) -> &str;
    fn generate(&mut self, prompt: &str) -> Result<Vec<f32>, ProviderError>;
}

impl PointCloudProvider for Box<dyn PointCloudProvider> {
    fn name(&self) -> &str { (**self).name() }

    fn generate(&mut self, prompt: &str) -> Result<Vec<f32>, ProviderError> {
        (**self).generate(prompt)
    }
}

/// Runs `program args… <prompt>` and parses `{"points": [...]}` from stdout.
///
/// The program should aim for about 150 points with coordinates roughly in
/// `[-2, 2]`.
#[derive(Clone, Debug)]
pub struct CommandProvider {
    program: String,
    args:    Vec<String>,
}

impl CommandProvider {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        CommandProvider { program: program.into(), args }
    }

    /// Split a whitespace-separated command line; `None` if it is blank.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(CommandProvider { program, args: words.collect() })
    }
}

impl PointCloudProvider for CommandProvider {
    fn name(&self) -> &str { &self.program }

    fn generate(&mut self, prompt: &str) -> Result<Vec<f32>, ProviderError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(prompt)
            .output()?;

        if !output.status.success() {
            return Err(ProviderError::Command {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        parse_points_response(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Used when no provider is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineProvider;

impl PointCloudProvider for OfflineProvider {
    fn name(&self) -> &str { "offline" }

    fn generate(&mut self, _prompt: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::Unavailable("no points command configured".into()))
    }
}

#[derive(Deserialize)]
struct PointsResponse {
    points: Vec<f32>,
}

/// Parse a `{"points": [x, y, z, …]}` document.
///
/// Text around the outermost braces (a code fence, a stray sentence) is
/// ignored.  A trailing partial triple is dropped.
pub fn parse_points_response(text: &str) -> Result<Vec<f32>, ProviderError> {
    let body = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _                                       => text,
    };
    let mut points = serde_json::from_str::<PointsResponse>(body)?.points;

    let extra = points.len() % 3;
    if extra != 0 {
        log::warn!("provider returned {} stray coordinate(s); dropping them", extra);
        points.truncate(points.len() - extra);
    }
    if points.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(points)
}

// ════════════════════════════════════════════════════════════════════════════
// Fallback
// ════════════════════════════════════════════════════════════════════════════

/// The cloud shown when generation fails.
pub fn fallback_cloud<R: Rng>(rng: &mut R) -> PointBuffer {
    uniform_cube(rng, FALLBACK_POINTS, FALLBACK_HALF_EXTENT)
}

/// Ask `provider` for a cloud and check it holds at least one whole point.
pub fn request_points<P>(provider: &mut P, prompt: &str) -> Result<PointBuffer, ProviderError>
where
    P: PointCloudProvider + ?Sized,
{
    let points = PointBuffer::from_coords(provider.generate(prompt)?)?;
    if points.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(points)
}

/// [`request_points`], but on any failure log it and return the fallback.
/// The flag is `true` when the fallback was used.
pub fn generate_or_fallback<P, R>(provider: &mut P, prompt: &str, rng: &mut R) -> (PointBuffer, bool)
where
    P: PointCloudProvider + ?Sized,
    R: Rng,
{
    match request_points(provider, prompt) {
        Ok(points) => {
            log::info!("{} generated {} points for {:?}", provider.name(), points.point_count(), prompt);
            (points, false)
        }
        Err(e) => {
            log::error!("generation for {:?} failed: {}; using fallback", prompt, e);
            (fallback_cloud(rng), true)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Generator: the worker thread
// ════════════════════════════════════════════════════════════════════════════

enum GenCommand {
    Generate { seq: u64, prompt: String },
    Quit,
}

/// One finished request, sent back to the render loop.
#[derive(Clone, Debug)]
pub struct GenerationResult {
    pub seq:       u64,
    pub prompt:    String,
    pub points:    PointBuffer,
    /// The provider failed and `points` is the fallback cloud.
    pub fell_back: bool,
}

/// Handle to the generation thread.
pub struct Generator {
    cmd_tx:    Sender<GenCommand>,
    result_rx: Receiver<GenerationResult>,
    /// Last sequence number handed out.
    latest:    u64,
    loading:   bool,
}

impl Generator {
    /// Spawn the worker; `provider` is moved onto it.
    pub fn spawn<P: PointCloudProvider>(provider: P) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<GenCommand>();
        let (result_tx, result_rx) = mpsc::channel::<GenerationResult>();

        log::info!("starting point-cloud worker ({})", provider.name());
        thread::spawn(move || generator_thread(provider, cmd_rx, result_tx));

        Generator { cmd_tx, result_rx, latest: 0, loading: false }
    }

    /// Queue a prompt.  Returns its sequence number; any earlier request
    /// still in flight is now stale.
    pub fn request(&mut self, prompt: &str) -> u64 {
        self.latest += 1;
        let seq = self.latest;
        if self.cmd_tx.send(GenCommand::Generate { seq, prompt: prompt.to_string() }).is_err() {
            log::error!("point-cloud worker is gone; request #{} dropped", seq);
            return seq;
        }
        self.loading = true;
        seq
    }

    /// The newest request's result, if it has arrived (non-blocking).
    /// Results from superseded requests are discarded.
    pub fn poll(&mut self) -> Option<GenerationResult> {
        let mut fresh = None;
        while let Ok(result) = self.result_rx.try_recv() {
            if result.seq == self.latest {
                fresh = Some(result);
            } else {
                log::debug!("discarding stale generation #{} (latest #{})", result.seq, self.latest);
            }
        }
        if fresh.is_some() {
            self.loading = false;
        }
        fresh
    }

    pub fn is_loading(&self) -> bool { self.loading }
    pub fn latest_seq(&self) -> u64  { self.latest }

    pub fn quit(&self) { let _ = self.cmd_tx.send(GenCommand::Quit); }
}

impl Drop for Generator {
    fn drop(&mut self) { self.quit(); }
}

fn generator_thread<P: PointCloudProvider>(
    mut provider: P,
    cmd_rx:       Receiver<GenCommand>,
    result_tx:    Sender<GenerationResult>,
) {
    let mut rng = StdRng::from_entropy();

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            GenCommand::Generate { seq, prompt } => {
                log::debug!("generation #{} started: {:?}", seq, prompt);
                let (points, fell_back) = generate_or_fallback(&mut provider, &prompt, &mut rng);
                let result = GenerationResult { seq, prompt, points, fell_back };
                if result_tx.send(result).is_err() {
                    return;
                }
            }
            GenCommand::Quit => return,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::{Duration, Instant};

    /// Replays canned outcomes in order, then reports unavailable.
    struct Scripted(VecDeque<Result<Vec<f32>, ProviderError>>);

    impl PointCloudProvider for Scripted {
        fn name(&self) -> &str { "scripted" }
        fn generate(&mut self, _prompt: &str) -> Result<Vec<f32>, ProviderError> {
            self.0.pop_front()
                .unwrap_or_else(|| Err(ProviderError::Unavailable("script exhausted".into())))
        }
    }

    fn scripted(outcomes: Vec<Result<Vec<f32>, ProviderError>>) -> Scripted {
        Scripted(outcomes.into())
    }

    fn wait_for(gen: &mut Generator) -> GenerationResult {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(r) = gen.poll() { return r; }
            assert!(Instant::now() < deadline, "generator never answered");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn assert_fallback(points: &PointBuffer) {
        assert_eq!(points.as_slice().len(), 900);
        assert!(points.as_slice().iter().all(|c| (-1.5..=1.5).contains(c)));
    }

    #[test]
    fn parses_plain_json() {
        let pts = parse_points_response(r#"{"points": [0, 1, 2, -0.5, 0.25, 1.5]}"#).unwrap();
        assert_eq!(pts, vec![0.0, 1.0, 2.0, -0.5, 0.25, 1.5]);
    }

    #[test]
    fn parses_fenced_json() {
        let text = "```json\n{\"points\": [1, 2, 3]}\n```";
        assert_eq!(parse_points_response(text).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn drops_partial_triple() {
        let pts = parse_points_response(r#"{"points": [1, 2, 3, 4, 5]}"#).unwrap();
        assert_eq!(pts, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(matches!(parse_points_response(r#"{"points": []}"#), Err(ProviderError::Empty)));
        assert!(matches!(parse_points_response(r#"{"points": [1, 2]}"#), Err(ProviderError::Empty)));
        assert!(matches!(parse_points_response("no json here"), Err(ProviderError::Parse(_))));
        assert!(matches!(parse_points_response(r#"{"pts": [1, 2, 3]}"#), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn failure_yields_fallback() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = scripted(vec![Err(ProviderError::Unavailable("network down".into()))]);
        let (points, fell_back) = generate_or_fallback(&mut p, "a teapot", &mut rng);
        assert!(fell_back);
        assert_fallback(&points);
    }

    #[test]
    fn ragged_and_empty_provider_output_are_told_apart() {
        let mut p = scripted(vec![Ok(vec![1.0, 2.0, 3.0, 4.0]), Ok(Vec::new())]);
        assert!(matches!(
            request_points(&mut p, "x"),
            Err(ProviderError::Ragged(ShapeError::RaggedBuffer { len: 4 }))
        ));
        assert!(matches!(request_points(&mut p, "x"), Err(ProviderError::Empty)));

        let mut rng = StdRng::seed_from_u64(6);
        let mut p = scripted(vec![Ok(vec![0.5, 0.5])]);
        let (points, fell_back) = generate_or_fallback(&mut p, "x", &mut rng);
        assert!(fell_back);
        assert_eq!(points.point_count(), FALLBACK_POINTS);
    }

    #[test]
    fn offline_always_falls_back() {
        let mut rng = StdRng::seed_from_u64(4);
        let (points, fell_back) = generate_or_fallback(&mut OfflineProvider, "anything", &mut rng);
        assert!(fell_back);
        assert_fallback(&points);
    }

    #[test]
    fn success_passes_points_through() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut p = scripted(vec![Ok(vec![0.5, -0.5, 1.0, 2.0, 0.0, -2.0])]);
        let (points, fell_back) = generate_or_fallback(&mut p, "two dots", &mut rng);
        assert!(!fell_back);
        assert_eq!(points.point_count(), 2);
        assert_eq!(points.point(1), [2.0, 0.0, -2.0]);
    }

    #[test]
    fn command_line_split() {
        let p = CommandProvider::from_command_line("  gen-points --model small ").unwrap();
        assert_eq!(p.name(), "gen-points");
        assert_eq!(p.args, vec!["--model".to_string(), "small".to_string()]);
        assert!(CommandProvider::from_command_line("   ").is_none());
    }

    #[test]
    fn missing_program_is_io_error() {
        let mut p = CommandProvider::new("/nonexistent/zen-points-generator", vec![]);
        assert!(matches!(p.generate("x"), Err(ProviderError::Io(_))));
    }

    #[test]
    fn worker_delivers_result() {
        let mut gen = Generator::spawn(scripted(vec![Ok(vec![1.0, 2.0, 3.0])]));
        assert!(!gen.is_loading());
        let seq = gen.request("a dot");
        assert!(gen.is_loading());

        let r = wait_for(&mut gen);
        assert_eq!(r.seq, seq);
        assert_eq!(r.prompt, "a dot");
        assert!(!r.fell_back);
        assert_eq!(r.points.as_slice(), &[1.0, 2.0, 3.0]);
        assert!(!gen.is_loading());
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut gen = Generator::spawn(scripted(vec![
            Ok(vec![1.0, 1.0, 1.0]),
            Ok(vec![2.0, 2.0, 2.0]),
        ]));
        let first  = gen.request("first");
        let second = gen.request("second");
        assert!(second > first);

        let r = wait_for(&mut gen);
        assert_eq!(r.seq, second);
        assert_eq!(r.points.point(0), [2.0, 2.0, 2.0]);

        thread::sleep(Duration::from_millis(20));
        assert!(gen.poll().is_none());
    }

    #[test]
    fn worker_failure_falls_back() {
        let mut gen = Generator::spawn(OfflineProvider);
        gen.request("ocean");
        let r = wait_for(&mut gen);
        assert!(r.fell_back);
        assert_fallback(&r.points);
    }
}
