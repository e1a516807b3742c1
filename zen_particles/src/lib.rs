//! # zen_particles
//!
//! A particle cloud that morphs between parametric shapes and AI-generated
//! point sets, breathing on its own and stretching open as your hands do.
//!
//! ## Gesture → Motion mapping
//!
//! | Hands in view | Measured distance | Effect |
//! |---|---|---|
//! | none | — | cloud breathes (`1 ± 0.2` scale), spins at 0.1 rad/s, camera orbits |
//! | one | thumb tip ↔ index tip | openness scales the cloud `0.5×`–`4×`, jitter grows |
//! | two | index tip ↔ index tip | as above; the first two hands count |
//!
//! ## Shapes
//!
//! Heart, Flower, Saturn, Meditation figure, Fireworks, an AI point set
//! (repeated to fill the particle count) and a plain cube.  Particles glide
//! toward the selected shape every frame.
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**: keyboard shortcuts stand in for hands.
//! * `leap`: **Hardware mode**: hand joints from a LeapMotion controller.
//!
//! ### Keyboard shortcuts
//!
//! | Key | Action |
//! |---|---|
//! | `1`–`5` | Heart, Flower, Saturn, Meditation, Fireworks |
//! | `6` | Cube |
//! | `C` | Next preset color |
//! | `G` | Type an AI prompt on the terminal |
//! | `0` / `H` / `J` | Simulate no hand / one hand / two hands |
//! | `Up` / `Down` | Open / close the simulated hands |
//! | `Q` | Quit |

pub mod ai;
pub mod animator;
pub mod app;
pub mod camera;
pub mod error;
pub mod gesture;
pub mod palette;
pub mod visualizer;
