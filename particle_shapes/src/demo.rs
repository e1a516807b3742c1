//! Walks every archetype once with a fixed seed and prints its extent.

use particle_shapes::{generate, uniform_cube, PointBuffer, ShapeArchetype};
use rand::{rngs::StdRng, SeedableRng};

fn show(label: &str, cloud: &PointBuffer) {
    match cloud.bounds() {
        Some((lo, hi)) => println!(
            "   {:<14} {:>5} pts  x[{:>6.2},{:>6.2}]  y[{:>6.2},{:>6.2}]  z[{:>6.2},{:>6.2}]",
            label, cloud.point_count(), lo[0], hi[0], lo[1], hi[1], lo[2], hi[2],
        ),
        None => println!("   {:<14} (empty)", label),
    }
}

fn main() {
    println!("\n=== Procedural Shape Demo (seed 2024) ===\n");
    let mut rng = StdRng::seed_from_u64(2024);

    // ── 1. Every parametric shape ────────────────────────────────────────
    println!("1. Parametric shapes, 6000 points each");
    for a in ShapeArchetype::procedural() {
        show(a.name(), &generate(a, 6000, None, &mut rng));
    }
    println!();

    // ── 2. AI point set repeated to fill the buffer ──────────────────────
    println!("2. AI point set (4 source points → 10 particles)");
    let ai = PointBuffer::from_points([
        [ 0.0,  2.0, 0.0],
        [-1.0, -1.0, 0.0],
        [ 1.0, -1.0, 0.0],
        [ 0.0,  0.0, 1.5],
    ]);
    let filled = generate(ShapeArchetype::AiGenerated, 10, Some(&ai), &mut rng);
    for (i, p) in filled.points().enumerate() {
        println!("   [{:>2}] {:?}", i, p);
    }
    println!();

    // ── 3. Fallbacks ─────────────────────────────────────────────────────
    println!("3. Fallbacks");
    show("AI, no points", &generate(ShapeArchetype::AiGenerated, 1000, None, &mut rng));
    show("cube ±1.5", &uniform_cube(&mut rng, 300, 1.5));
}
