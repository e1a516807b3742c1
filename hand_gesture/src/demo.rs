//! Prints the openness curves and runs a tracker over a short scripted clip.

use hand_gesture::{
    interpret, one_hand_openness, two_hand_openness,
    CameraFrame, GestureError, Hand, HandTracker, Landmark, LandmarkDetector,
    INDEX_TIP, LANDMARKS_PER_HAND, THUMB_TIP,
};

struct ClipFrame { t: f64, gap: f32 }

impl CameraFrame for ClipFrame {
    fn presentation_time(&self) -> f64 { self.t }
    fn dimensions(&self) -> (u32, u32) { (640, 480) }
}

/// Pretends to see one hand whose pinch gap is baked into the frame.
struct ClipDetector;

impl LandmarkDetector for ClipDetector {
    type Frame = ClipFrame;
    fn detect(&mut self, f: &ClipFrame, _ts: f64) -> Result<Vec<Hand>, GestureError> {
        if f.gap < 0.0 {
            return Err(GestureError::Inference("motion blur".to_string()));
        }
        let mut lm = [Landmark::new(0.5, 0.7, 0.0); LANDMARKS_PER_HAND];
        lm[THUMB_TIP] = Landmark::new(0.45, 0.5, 0.0);
        lm[INDEX_TIP] = Landmark::new(0.45 + f.gap, 0.5, 0.0);
        Ok(vec![Hand::new(lm)])
    }
}

fn main() {
    println!("\n=== Gesture Mapping Demo ===\n");

    // ── 1. Mapping curves ────────────────────────────────────────────────
    println!("1. Raw planar distance → openness");
    println!("   {:>6}  {:>9}  {:>9}", "raw", "one-hand", "two-hand");
    for i in 0..=14 {
        let raw = i as f32 * 0.05;
        println!("   {:>6.2}  {:>9.3}  {:>9.3}", raw, one_hand_openness(raw), two_hand_openness(raw));
    }
    println!();

    // ── 2. No hands ──────────────────────────────────────────────────────
    println!("2. Empty detection → {:?}", interpret(&[]));
    println!();

    // ── 3. Tracker over a clip with a repeated frame and a glitch ────────
    println!("3. Tracker over a scripted clip");
    let clip = [
        ClipFrame { t: 0.000, gap: 0.02 },
        ClipFrame { t: 0.033, gap: 0.08 },
        ClipFrame { t: 0.033, gap: 0.08 },  // same frame again
        ClipFrame { t: 0.066, gap: -1.0 },  // detector error
        ClipFrame { t: 0.100, gap: 0.20 },
    ];
    let mut tracker = HandTracker::new(ClipDetector);
    for f in &clip {
        match tracker.process(f) {
            Some(s) => println!("   t={:.3}s  sample {:?}", f.t, s),
            None    => println!("   t={:.3}s  skipped (holding {:?})", f.t, tracker.last_sample()),
        }
    }
}
