//! # hand_gesture
//!
//! Turns raw hand-landmark detections into a single normalised openness
//! signal, [`GestureSample`], once per camera frame.
//!
//! ## Mapping
//!
//! | Hands | Landmarks | Raw distance `d` | Openness |
//! |---|---|---|---|
//! | 0 | — | — | `0`, not detected |
//! | 1 | thumb tip (4) ↔ index tip (8) | planar | `clamp((d − 0.02) × 5, 0, 1)` |
//! | 2+ | index tip (8) of the first two hands | planar | `clamp((d − 0.1) × 2, 0, 1)` |
//!
//! ## Frame handling
//!
//! [`HandTracker`] wraps a [`LandmarkDetector`] and owns the per-frame
//! bookkeeping: repeated frames (same presentation time) are not
//! re-detected, detector errors are logged and swallowed, and a tracker
//! built without a detector never reports a hand.

use std::fmt;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Landmark layout
// ════════════════════════════════════════════════════════════════════════════

/// Number of landmarks reported per detected hand.
pub const LANDMARKS_PER_HAND: usize = 21;
/// Wrist landmark index.
pub const WRIST: usize = 0;
/// Thumb tip landmark index.
pub const THUMB_TIP: usize = 4;
/// Index fingertip landmark index.
pub const INDEX_TIP: usize = 8;

/// Two-hand mapping: raw distance at which openness starts rising.
pub const TWO_HAND_OFFSET: f32 = 0.1;
pub const TWO_HAND_GAIN:   f32 = 2.0;
/// One-hand pinch mapping.
pub const ONE_HAND_OFFSET: f32 = 0.02;
pub const ONE_HAND_GAIN:   f32 = 5.0;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GestureError {
    #[error("hand has {got} landmarks, expected {expected}")]
    LandmarkCount { expected: usize, got: usize },

    #[error("detector initialisation failed on {delegate}: {reason}")]
    InitFailed { delegate: Delegate, reason: String },

    #[error("landmark inference failed: {0}")]
    Inference(String),
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark / Hand
// ════════════════════════════════════════════════════════════════════════════

/// One normalised landmark in camera space (`x`, `y` in `[0, 1]`).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z }
    }

    /// Euclidean distance in the image plane, ignoring depth.
    pub fn planar_distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A detected hand: exactly [`LANDMARKS_PER_HAND`] ordered landmarks.
#[derive(Clone, Debug, PartialEq)]
pub struct Hand {
    landmarks: [Landmark; LANDMARKS_PER_HAND],
}

impl Hand {
    pub fn new(landmarks: [Landmark; LANDMARKS_PER_HAND]) -> Self {
        Hand { landmarks }
    }

    pub fn from_landmarks(landmarks: Vec<Landmark>) -> Result<Self, GestureError> {
        let got = landmarks.len();
        let landmarks: [Landmark; LANDMARKS_PER_HAND] = landmarks.try_into()
            .map_err(|_| GestureError::LandmarkCount { expected: LANDMARKS_PER_HAND, got })?;
        Ok(Hand { landmarks })
    }

    pub fn landmarks(&self)    -> &[Landmark] { &self.landmarks }
    pub fn landmark(&self, i: usize) -> Landmark { self.landmarks[i] }
    pub fn thumb_tip(&self)    -> Landmark { self.landmarks[THUMB_TIP] }
    pub fn index_tip(&self)    -> Landmark { self.landmarks[INDEX_TIP] }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureSample + interpretation
// ════════════════════════════════════════════════════════════════════════════

/// The per-frame output: openness in `[0, 1]` and whether any hand was seen.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GestureSample {
    pub distance: f32,
    pub detected: bool,
}

impl GestureSample {
    /// No hand in view.
    pub const NONE: GestureSample = GestureSample { distance: 0.0, detected: false };

    pub fn detected(distance: f32) -> Self {
        GestureSample { distance: distance.clamp(0.0, 1.0), detected: true }
    }
}

/// Openness from the distance between two index fingertips.
pub fn two_hand_openness(raw: f32) -> f32 {
    ((raw - TWO_HAND_OFFSET) * TWO_HAND_GAIN).clamp(0.0, 1.0)
}

/// Openness from a single hand's thumb–index pinch distance.
pub fn one_hand_openness(raw: f32) -> f32 {
    ((raw - ONE_HAND_OFFSET) * ONE_HAND_GAIN).clamp(0.0, 1.0)
}

/// Map the hands of one detection result to a [`GestureSample`].
///
/// Hands beyond the second are ignored.
pub fn interpret(hands: &[Hand]) -> GestureSample {
    match hands {
        [] => GestureSample::NONE,
        [hand] => {
            let raw = hand.thumb_tip().planar_distance(&hand.index_tip());
            GestureSample { distance: one_hand_openness(raw), detected: true }
        }
        [first, second, ..] => {
            let raw = first.index_tip().planar_distance(&second.index_tip());
            GestureSample { distance: two_hand_openness(raw), detected: true }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Detector seam
// ════════════════════════════════════════════════════════════════════════════

/// A video frame as far as the tracker is concerned.
pub trait CameraFrame {
    /// Presentation timestamp in seconds; equal values mean the same frame.
    fn presentation_time(&self) -> f64;
    /// `(width, height)` in pixels; zero means no data yet.
    fn dimensions(&self) -> (u32, u32);
}

/// The external hand-landmark model.
pub trait LandmarkDetector {
    type Frame: CameraFrame;

    /// Detect hands in `frame`.  `timestamp_ms` strictly increases per call.
    fn detect(&mut self, frame: &Self::Frame, timestamp_ms: f64) -> Result<Vec<Hand>, GestureError>;
}

/// Execution backend requested from the detector runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delegate {
    Gpu,
    Cpu,
}

impl fmt::Display for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delegate::Gpu => f.write_str("GPU"),
            Delegate::Cpu => f.write_str("CPU"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectorOptions {
    pub delegate:  Delegate,
    pub max_hands: usize,
}

/// Try to build a detector on the GPU, then on the CPU.
///
/// Returns `None` when both attempts fail; pass that to
/// [`HandTracker::from_init`] to get a tracker that never reports a hand.
pub fn init_with_fallback<D, F>(mut create: F) -> Option<D>
where
    F: FnMut(DetectorOptions) -> Result<D, GestureError>,
{
    for delegate in [Delegate::Gpu, Delegate::Cpu] {
        let options = DetectorOptions { delegate, max_hands: 2 };
        match create(options) {
            Ok(detector) => {
                log::info!("hand landmark detector ready ({} delegate)", delegate);
                return Some(detector);
            }
            Err(e) => log::warn!("{} delegate unavailable: {}", delegate, e),
        }
    }
    log::error!("hand landmark detector could not be initialised; gestures disabled");
    None
}

// ════════════════════════════════════════════════════════════════════════════
// HandTracker: per-frame driver
// ════════════════════════════════════════════════════════════════════════════

/// Runs a [`LandmarkDetector`] at most once per unique camera frame.
pub struct HandTracker<D> {
    detector:        Option<D>,
    origin:          Instant,
    last_frame_time: Option<f64>,
    last_stamp_ms:   f64,
    last_sample:     GestureSample,
    /// Detector errors swallowed so far.
    errors:          u64,
}

impl<D: LandmarkDetector> HandTracker<D> {
    pub fn new(detector: D) -> Self {
        Self::from_init(Some(detector))
    }

    /// A tracker with no working detector.
    pub fn degraded() -> Self {
        Self::from_init(None)
    }

    /// Wrap the outcome of [`init_with_fallback`].
    pub fn from_init(detector: Option<D>) -> Self {
        HandTracker {
            detector,
            origin:          Instant::now(),
            last_frame_time: None,
            last_stamp_ms:   f64::NEG_INFINITY,
            last_sample:     GestureSample::NONE,
            errors:          0,
        }
    }

    pub fn is_degraded(&self)       -> bool          { self.detector.is_none() }
    pub fn last_sample(&self)       -> GestureSample { self.last_sample }
    pub fn error_count(&self)       -> u64           { self.errors }

    /// The wrapped detector, for sources whose frames come from the same
    /// device.  `None` when degraded.
    pub fn detector_mut(&mut self) -> Option<&mut D> { self.detector.as_mut() }

    /// Handle one camera callback.
    ///
    /// Returns a fresh sample, or `None` when the frame was skipped: already
    /// processed, empty, detector missing, or detection failed.  On `None`
    /// the previous sample stays current.
    pub fn process(&mut self, frame: &D::Frame) -> Option<GestureSample> {
        let detector = self.detector.as_mut()?;

        let (w, h) = frame.dimensions();
        if w == 0 || h == 0 {
            return None;
        }

        let pts = frame.presentation_time();
        if self.last_frame_time == Some(pts) {
            log::trace!("frame {:.3}s already processed", pts);
            return None;
        }
        self.last_frame_time = Some(pts);

        let now   = self.origin.elapsed().as_secs_f64() * 1000.0;
        let stamp = if now > self.last_stamp_ms { now } else { self.last_stamp_ms + 1.0 };
        self.last_stamp_ms = stamp;

        match detector.detect(frame, stamp) {
            Ok(hands) => {
                let sample = interpret(&hands);
                self.last_sample = sample;
                Some(sample)
            }
            Err(e) => {
                self.errors += 1;
                log::warn!("detection error (frame {:.3}s): {}", pts, e);
                None
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SampleSlot: the shared latest-sample cell
// ════════════════════════════════════════════════════════════════════════════

/// Holds the most recently published [`GestureSample`].
///
/// The whole snapshot is replaced on every publish, so a reader never sees
/// a distance from one frame paired with the detection flag of another.
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleSlot {
    current: GestureSample,
    updates: u64,
}

impl SampleSlot {
    pub fn new() -> Self { Self::default() }

    pub fn publish(&mut self, sample: GestureSample) {
        self.current = sample;
        self.updates += 1;
    }

    pub fn latest(&self) -> GestureSample { self.current }

    /// Number of samples published so far.
    pub fn updates(&self) -> u64 { self.updates }

    /// Publish the newest of any samples queued on `rx` (non-blocking).
    /// Returns true if the slot changed.
    pub fn drain(&mut self, rx: &Receiver<GestureSample>) -> bool {
        match rx.try_iter().last() {
            Some(sample) => { self.publish(sample); true }
            None         => false,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    const EPS: f32 = 1e-5;

    /// A hand with every landmark at `(x, y)` except the two tips.
    fn hand(thumb: (f32, f32), index: (f32, f32)) -> Hand {
        let mut lm = [Landmark::new(0.5, 0.8, 0.0); LANDMARKS_PER_HAND];
        lm[THUMB_TIP] = Landmark::new(thumb.0, thumb.1, 0.0);
        lm[INDEX_TIP] = Landmark::new(index.0, index.1, 0.0);
        Hand::new(lm)
    }

    // ── mapping ──────────────────────────────────────────────────────────

    #[test]
    fn two_hand_clamp_boundaries() {
        assert_eq!(two_hand_openness(0.1), 0.0);
        assert_eq!(two_hand_openness(0.05), 0.0);
        assert!((two_hand_openness(0.6) - 1.0).abs() < EPS);
        assert_eq!(two_hand_openness(0.9), 1.0);
        assert!((two_hand_openness(0.35) - 0.5).abs() < EPS);
    }

    #[test]
    fn one_hand_clamp_boundaries() {
        assert_eq!(one_hand_openness(0.02), 0.0);
        assert_eq!(one_hand_openness(0.0), 0.0);
        assert!((one_hand_openness(0.22) - 1.0).abs() < EPS);
        assert_eq!(one_hand_openness(0.5), 1.0);
    }

    #[test]
    fn no_hands_not_detected() {
        assert_eq!(interpret(&[]), GestureSample::NONE);
    }

    #[test]
    fn one_hand_uses_pinch() {
        // thumb–index 0.12 apart → (0.12 − 0.02) × 5 = 0.5
        let s = interpret(&[hand((0.40, 0.5), (0.52, 0.5))]);
        assert!(s.detected);
        assert!((s.distance - 0.5).abs() < 1e-4, "distance {}", s.distance);
    }

    #[test]
    fn two_hands_use_index_tips() {
        // index tips 0.3 apart → (0.3 − 0.1) × 2 = 0.4; pinches are closed
        let a = hand((0.30, 0.5), (0.30, 0.5));
        let b = hand((0.60, 0.5), (0.60, 0.5));
        let s = interpret(&[a, b]);
        assert!(s.detected);
        assert!((s.distance - 0.4).abs() < 1e-4, "distance {}", s.distance);
    }

    #[test]
    fn third_hand_ignored() {
        let a = hand((0.3, 0.5), (0.3, 0.5));
        let b = hand((0.6, 0.5), (0.6, 0.5));
        let c = hand((0.0, 0.0), (1.0, 1.0));
        assert_eq!(interpret(&[a.clone(), b.clone(), c]), interpret(&[a, b]));
    }

    #[test]
    fn planar_distance_ignores_depth() {
        let p = Landmark::new(0.0, 0.0, 0.0);
        let q = Landmark::new(0.3, 0.4, 9.0);
        assert!((p.planar_distance(&q) - 0.5).abs() < EPS);
    }

    #[test]
    fn wrong_landmark_count_rejected() {
        let err = Hand::from_landmarks(vec![Landmark::default(); 5]).unwrap_err();
        assert_eq!(err, GestureError::LandmarkCount { expected: 21, got: 5 });
        assert!(Hand::from_landmarks(vec![Landmark::default(); 21]).is_ok());
    }

    // ── tracker ──────────────────────────────────────────────────────────

    struct Frame { t: f64, w: u32 }

    impl CameraFrame for Frame {
        fn presentation_time(&self) -> f64 { self.t }
        fn dimensions(&self) -> (u32, u32) { (self.w, 480) }
    }

    /// Replays scripted results and records the timestamps it was given.
    struct Scripted {
        results: Vec<Result<Vec<Hand>, GestureError>>,
        calls:   Vec<f64>,
    }

    impl LandmarkDetector for Scripted {
        type Frame = Frame;
        fn detect(&mut self, _f: &Frame, ts: f64) -> Result<Vec<Hand>, GestureError> {
            self.calls.push(ts);
            if self.results.is_empty() { return Ok(Vec::new()); }
            self.results.remove(0)
        }
    }

    fn scripted(results: Vec<Result<Vec<Hand>, GestureError>>) -> Scripted {
        Scripted { results, calls: Vec::new() }
    }

    fn pinch() -> Vec<Hand> { vec![hand((0.40, 0.5), (0.52, 0.5))] }

    #[test]
    fn same_frame_not_reprocessed() {
        let mut t = HandTracker::new(scripted(vec![Ok(pinch()), Ok(pinch())]));
        assert!(t.process(&Frame { t: 1.0, w: 640 }).is_some());
        assert!(t.process(&Frame { t: 1.0, w: 640 }).is_none());
        assert_eq!(t.detector.as_ref().unwrap().calls.len(), 1);
        assert!(t.process(&Frame { t: 1.033, w: 640 }).is_some());
        assert_eq!(t.detector_mut().map(|d| d.calls.len()), Some(2));
    }

    #[test]
    fn detector_timestamps_strictly_increase() {
        let mut t = HandTracker::new(scripted(Vec::new()));
        for i in 0..20 {
            t.process(&Frame { t: i as f64, w: 640 });
        }
        let calls = &t.detector.as_ref().unwrap().calls;
        assert_eq!(calls.len(), 20);
        assert!(calls.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn detection_error_keeps_previous_sample() {
        let mut t = HandTracker::new(scripted(vec![
            Ok(pinch()),
            Err(GestureError::Inference("glitch".into())),
        ]));
        let first = t.process(&Frame { t: 0.0, w: 640 }).unwrap();
        assert!(first.detected);
        assert_eq!(t.process(&Frame { t: 0.1, w: 640 }), None);
        assert_eq!(t.last_sample(), first);
        assert_eq!(t.error_count(), 1);
    }

    #[test]
    fn empty_frame_skipped() {
        let mut t = HandTracker::new(scripted(vec![Ok(pinch())]));
        assert!(t.process(&Frame { t: 0.0, w: 0 }).is_none());
        assert!(t.detector.as_ref().unwrap().calls.is_empty());
    }

    #[test]
    fn degraded_tracker_never_detects() {
        let mut t: HandTracker<Scripted> = HandTracker::degraded();
        assert!(t.is_degraded());
        assert!(t.detector_mut().is_none());
        for i in 0..5 {
            assert!(t.process(&Frame { t: i as f64, w: 640 }).is_none());
        }
        assert_eq!(t.last_sample(), GestureSample::NONE);
    }

    // ── init fallback ────────────────────────────────────────────────────

    #[test]
    fn init_falls_back_to_cpu() {
        let mut tried = Vec::new();
        let d = init_with_fallback(|opts| {
            tried.push(opts.delegate);
            match opts.delegate {
                Delegate::Gpu => Err(GestureError::InitFailed {
                    delegate: Delegate::Gpu, reason: "no adapter".into(),
                }),
                Delegate::Cpu => Ok(opts),
            }
        });
        assert_eq!(tried, [Delegate::Gpu, Delegate::Cpu]);
        assert_eq!(d.map(|o| o.delegate), Some(Delegate::Cpu));
    }

    #[test]
    fn init_gives_up_after_both() {
        let d: Option<()> = init_with_fallback(|opts| Err(GestureError::InitFailed {
            delegate: opts.delegate, reason: "model missing".into(),
        }));
        assert!(d.is_none());
    }

    #[test]
    fn init_prefers_gpu() {
        let d = init_with_fallback(|opts| Ok::<_, GestureError>(opts.delegate));
        assert_eq!(d, Some(Delegate::Gpu));
    }

    // ── slot ─────────────────────────────────────────────────────────────

    #[test]
    fn slot_drain_keeps_newest() {
        let (tx, rx) = mpsc::channel();
        let mut slot = SampleSlot::new();
        assert!(!slot.drain(&rx));
        assert_eq!(slot.latest(), GestureSample::NONE);

        tx.send(GestureSample::detected(0.2)).unwrap();
        tx.send(GestureSample::detected(0.7)).unwrap();
        assert!(slot.drain(&rx));
        assert_eq!(slot.latest(), GestureSample::detected(0.7));
        assert_eq!(slot.updates(), 1);
    }
}
