//! Hand sources: where gesture samples come from.
//!
//! Every source runs on its own thread and publishes [`GestureSample`]s over
//! an `mpsc` channel.  The render loop doesn't know whether the samples came
//! from real hardware or the keyboard simulator.
//!
//! | Source           | Input                                 | Feature |
//! |------------------|---------------------------------------|---------|
//! | `SimHandSource`  | keys from the visualizer window       | always  |
//! | `LeapHandSource` | LeapMotion palm and fingertip joints  | `leap`  |

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "leap")]
use hand_gesture::{init_with_fallback, Delegate, DetectorOptions};
use hand_gesture::{
    CameraFrame, GestureError, GestureSample, Hand, HandTracker, Landmark, LandmarkDetector,
    INDEX_TIP, LANDMARKS_PER_HAND, ONE_HAND_GAIN, ONE_HAND_OFFSET, THUMB_TIP, TWO_HAND_GAIN,
    TWO_HAND_OFFSET, WRIST,
};

// ════════════════════════════════════════════════════════════════════════════
// HandSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`GestureSample`]s over a channel.
pub trait HandSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<GestureSample>);
}

/// Spawn a hand source on its own thread and return the receiving end.
pub fn spawn_hand_source<S: HandSource>(source: S) -> Receiver<GestureSample> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// Simulation input
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the visualizer window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    KeyDown(SimKey),
    Quit,
}

/// Simulated key codes (mapped from minifb Key).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    NoHands,    // 0
    OneHand,    // H
    TwoHands,   // J
    Wider,      // Up
    Narrower,   // Down
}

/// Spread change per `Wider`/`Narrower` press.
pub const SPREAD_STEP: f32 = 0.1;

/// What the simulated camera sees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimPose {
    /// Hands in view: 0, 1 or 2.
    pub hands:  u8,
    /// How open the pose is, `0..=1`; maps straight to the sample distance.
    pub spread: f32,
}

impl Default for SimPose {
    fn default() -> Self { SimPose { hands: 0, spread: 0.5 } }
}

impl SimPose {
    pub fn apply(&mut self, key: SimKey) {
        match key {
            SimKey::NoHands  => self.hands = 0,
            SimKey::OneHand  => self.hands = 1,
            SimKey::TwoHands => self.hands = 2,
            SimKey::Wider    => self.spread = (self.spread + SPREAD_STEP).min(1.0),
            SimKey::Narrower => self.spread = (self.spread - SPREAD_STEP).max(0.0),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic hands
// ════════════════════════════════════════════════════════════════════════════

/// A relaxed open hand centred at `cx`, in normalized image coordinates.
fn rest_hand(cx: f32) -> [Landmark; LANDMARKS_PER_HAND] {
    let mut lm = [Landmark::new(cx, 0.8, 0.0); LANDMARKS_PER_HAND];
    for (i, l) in lm.iter_mut().enumerate().skip(1) {
        let finger = ((i - 1) / 4) as f32;
        let joint  = ((i - 1) % 4 + 1) as f32;
        *l = Landmark::new(cx + (finger - 2.0) * 0.03, 0.8 - joint * 0.05, -0.01 * joint);
    }
    lm[WRIST] = Landmark::new(cx, 0.85, 0.0);
    lm
}

/// Landmarks whose interpreted openness equals `pose.spread`.
pub fn synth_hands(pose: SimPose) -> Vec<Hand> {
    match pose.hands {
        0 => Vec::new(),
        1 => {
            let mut lm = rest_hand(0.5);
            let pinch = ONE_HAND_OFFSET + pose.spread / ONE_HAND_GAIN;
            lm[THUMB_TIP] = Landmark::new(0.5, 0.5, 0.0);
            lm[INDEX_TIP] = Landmark::new(0.5 + pinch, 0.5, 0.0);
            vec![Hand::new(lm)]
        }
        _ => {
            let gap = TWO_HAND_OFFSET + pose.spread / TWO_HAND_GAIN;
            let (lx, rx) = (0.5 - gap / 2.0, 0.5 + gap / 2.0);
            let mut left  = rest_hand(lx);
            let mut right = rest_hand(rx);
            left[INDEX_TIP]  = Landmark::new(lx, 0.4, 0.0);
            right[INDEX_TIP] = Landmark::new(rx, 0.4, 0.0);
            vec![Hand::new(left), Hand::new(right)]
        }
    }
}

/// One frame from the virtual camera.
#[derive(Clone, Copy, Debug)]
pub struct SimFrame {
    pub pose: SimPose,
    pub time: f64,
}

impl CameraFrame for SimFrame {
    fn presentation_time(&self) -> f64 { self.time }
    fn dimensions(&self) -> (u32, u32) { (640, 480) }
}

/// "Detects" the hands a [`SimFrame`] was rendered from.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimDetector;

impl LandmarkDetector for SimDetector {
    type Frame = SimFrame;

    fn detect(&mut self, frame: &SimFrame, _timestamp_ms: f64) -> Result<Vec<Hand>, GestureError> {
        Ok(synth_hands(frame.pose))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource: keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Virtual camera rate.
pub const SIM_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Hand source driven by [`SimInput`] events from the visualizer window.
///
/// A virtual camera captures the current [`SimPose`] about 30 times a
/// second.  Key presses between captures re-deliver the last frame, which
/// the tracker recognises and skips, just as a real camera callback can fire
/// twice for one video frame.
pub struct SimHandSource {
    pub rx: Receiver<SimInput>,
}

impl HandSource for SimHandSource {
    fn run(self: Box<Self>, tx: Sender<GestureSample>) {
        log::info!("simulated hand source started");
        run_sim(&self.rx, HandTracker::new(SimDetector), &tx);
    }
}

/// Virtual camera loop.  Returns on `Quit` or when either channel hangs up.
fn run_sim(rx: &Receiver<SimInput>, mut tracker: HandTracker<SimDetector>, tx: &Sender<GestureSample>) {
    let mut pose     = SimPose::default();
    let mut frame    = SimFrame { pose, time: 0.0 };
    let mut captured = Instant::now();

    loop {
        match rx.recv_timeout(SIM_FRAME_INTERVAL) {
            Ok(SimInput::KeyDown(key)) => {
                pose.apply(key);
                log::debug!("sim pose {:?}", pose);
            }
            Ok(SimInput::Quit) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if captured.elapsed() >= SIM_FRAME_INTERVAL {
            captured = Instant::now();
            frame = SimFrame { pose, time: frame.time + SIM_FRAME_INTERVAL.as_secs_f64() };
        }

        if let Some(sample) = tracker.process(&frame) {
            if tx.send(sample).is_err() { return; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapHandSource: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Hand source backed by a LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// Joint positions (mm above the device) are folded into the 21-landmark
/// layout in normalized image coordinates, so the usual openness mapping
/// applies unchanged.  If the device can't be opened on either attempt the
/// tracker is degraded and the source publishes nothing.
#[cfg(feature = "leap")]
pub struct LeapHandSource;

/// Width (mm) of the interaction box mapped onto `[0, 1]`.
#[cfg(feature = "leap")]
const LEAP_SPAN_MM: f32 = 400.0;
/// Palm height (mm) that maps to the image centre.
#[cfg(feature = "leap")]
const LEAP_CENTRE_Y_MM: f32 = 200.0;
/// Pause before the second open attempt, giving the LeapC service time to start.
#[cfg(feature = "leap")]
const LEAP_RETRY_DELAY: Duration = Duration::from_millis(500);

#[cfg(feature = "leap")]
fn leap_landmark(x: f32, y: f32, z: f32) -> Landmark {
    Landmark::new(
        0.5 + x / LEAP_SPAN_MM,
        0.5 - (y - LEAP_CENTRE_Y_MM) / LEAP_SPAN_MM,
        z / LEAP_SPAN_MM,
    )
}

#[cfg(feature = "leap")]
fn leap_hand(hand: &leaprs::Hand) -> Option<Hand> {
    macro_rules! joint {
        ($v:expr) => {{ let v = $v; leap_landmark(v.x, v.y, v.z) }};
    }

    let mut lm = Vec::with_capacity(LANDMARKS_PER_HAND);
    lm.push(joint!(hand.palm().position()));
    for digit in hand.digits() {
        lm.push(joint!(digit.metacarpal().next_joint()));
        lm.push(joint!(digit.proximal().next_joint()));
        lm.push(joint!(digit.intermediate().next_joint()));
        lm.push(joint!(digit.distal().next_joint()));
    }
    Hand::from_landmarks(lm).ok()
}

/// One tracking frame, hands already folded into landmarks.
#[cfg(feature = "leap")]
#[derive(Clone, Debug)]
pub struct LeapFrame {
    hands: Vec<Hand>,
    /// Device timestamp in seconds.
    time:  f64,
}

#[cfg(feature = "leap")]
impl CameraFrame for LeapFrame {
    fn presentation_time(&self) -> f64 { self.time }
    fn dimensions(&self) -> (u32, u32) { (LEAP_SPAN_MM as u32, LEAP_SPAN_MM as u32) }
}

/// An open LeapC connection.  Frames come off the same connection, so
/// detection is just handing back the hands each frame carries.
#[cfg(feature = "leap")]
pub struct LeapDetector {
    connection: leaprs::Connection,
}

#[cfg(feature = "leap")]
impl LeapDetector {
    /// Connect and open the device.  The CPU attempt is the fallback: it
    /// waits [`LEAP_RETRY_DELAY`] before trying again.
    pub fn open(options: DetectorOptions) -> Result<Self, GestureError> {
        use leaprs::{Connection, ConnectionConfig};

        let fail = |reason: String| GestureError::InitFailed { delegate: options.delegate, reason };

        if options.delegate == Delegate::Cpu {
            thread::sleep(LEAP_RETRY_DELAY);
        }
        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| fail(format!("LeapC connection: {:?}", e)))?;
        connection.open()
            .map_err(|e| fail(format!("LeapMotion device: {:?}", e)))?;
        Ok(LeapDetector { connection })
    }

    /// Wait up to 100 ms for the next tracking frame.
    fn next_frame(&mut self) -> Option<LeapFrame> {
        let msg = match self.connection.poll(100) {
            Ok(m)  => m,
            Err(e) => {
                log::warn!("LeapC poll error: {:?}", e);
                return None;
            }
        };
        match msg.event() {
            leaprs::Event::Tracking(frame) => Some(LeapFrame {
                hands: frame.hands().filter_map(|h| leap_hand(&h)).collect(),
                time:  frame.info.timestamp as f64 / 1e6,
            }),
            _ => None,
        }
    }
}

#[cfg(feature = "leap")]
impl LandmarkDetector for LeapDetector {
    type Frame = LeapFrame;

    fn detect(&mut self, frame: &LeapFrame, _timestamp_ms: f64) -> Result<Vec<Hand>, GestureError> {
        Ok(frame.hands.clone())
    }
}

#[cfg(feature = "leap")]
impl HandSource for LeapHandSource {
    fn run(self: Box<Self>, tx: Sender<GestureSample>) {
        let mut tracker = HandTracker::from_init(init_with_fallback(LeapDetector::open));
        if !tracker.is_degraded() {
            log::info!("LeapMotion hand source started");
        }

        loop {
            let frame = match tracker.detector_mut() {
                Some(device) => device.next_frame(),
                None         => return,
            };
            let Some(frame) = frame else { continue };
            if let Some(sample) = tracker.process(&frame) {
                if tx.send(sample).is_err() { return; }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_gesture::interpret;

    fn approx(a: f32, b: f32) -> bool { (a - b).abs() < 1e-4 }

    #[test]
    fn synthetic_hands_match_spread() {
        for hands in [1u8, 2] {
            for spread in [0.0f32, 0.25, 0.5, 0.9] {
                let s = interpret(&synth_hands(SimPose { hands, spread }));
                assert!(s.detected);
                assert!(approx(s.distance, spread), "{} hands, spread {}: got {}", hands, spread, s.distance);
            }
        }
        assert_eq!(interpret(&synth_hands(SimPose { hands: 0, spread: 0.7 })), GestureSample::NONE);
    }

    #[test]
    fn pose_keys() {
        let mut pose = SimPose::default();
        pose.apply(SimKey::TwoHands);
        assert_eq!(pose.hands, 2);
        for _ in 0..20 { pose.apply(SimKey::Wider); }
        assert_eq!(pose.spread, 1.0);
        for _ in 0..20 { pose.apply(SimKey::Narrower); }
        assert_eq!(pose.spread, 0.0);
        pose.apply(SimKey::NoHands);
        assert_eq!(pose.hands, 0);
    }

    #[test]
    fn tracker_skips_redelivered_frame() {
        let mut tracker = HandTracker::new(SimDetector);
        let frame = SimFrame { pose: SimPose { hands: 1, spread: 0.3 }, time: 1.0 };
        assert!(tracker.process(&frame).is_some());
        assert!(tracker.process(&frame).is_none());
        let next = SimFrame { time: 1.033, ..frame };
        assert!(tracker.process(&next).is_some());
    }

    #[test]
    fn sim_source_publishes_and_quits() {
        let (input_tx, input_rx) = mpsc::channel();
        let samples = spawn_hand_source(SimHandSource { rx: input_rx });

        input_tx.send(SimInput::KeyDown(SimKey::OneHand)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = None;
        while Instant::now() < deadline {
            if let Ok(s) = samples.recv_timeout(Duration::from_millis(100)) {
                if s.detected { seen = Some(s); break; }
            }
        }
        let s = seen.expect("no detected sample");
        assert!(approx(s.distance, SimPose::default().spread));

        input_tx.send(SimInput::Quit).unwrap();
        // drain until the source hangs up
        while samples.recv_timeout(Duration::from_secs(5)).is_ok() {}
        assert!(samples.try_recv().is_err());
    }

    #[test]
    fn degraded_tracker_loop_publishes_nothing() {
        let (input_tx, input_rx) = mpsc::channel();
        let (tx, samples) = mpsc::channel();
        let worker = thread::spawn(move || run_sim(&input_rx, HandTracker::from_init(None), &tx));

        input_tx.send(SimInput::KeyDown(SimKey::TwoHands)).unwrap();
        input_tx.send(SimInput::KeyDown(SimKey::Wider)).unwrap();
        thread::sleep(SIM_FRAME_INTERVAL * 4);
        input_tx.send(SimInput::Quit).unwrap();
        worker.join().unwrap();

        assert!(samples.try_recv().is_err());
    }
}
