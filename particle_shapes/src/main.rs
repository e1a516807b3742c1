//! Interactive explorer for the procedural particle shapes.
//! Samples a cloud and reports its extent, centroid and a few raw points.

use particle_shapes::{generate_shape, PointBuffer, ShapeArchetype};
use std::io::{self, Write};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    println!();
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║          Procedural Particle Shape Explorer          ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    loop {
        print_menu();
        let choice = read_line("Select a shape (1–7, or q to quit): ")?;

        if choice.trim().eq_ignore_ascii_case("q") {
            println!("\nGoodbye!\n");
            break;
        }

        let archetype = match choice.trim().parse::<usize>() {
            Ok(n) if (1..=7).contains(&n) => ShapeArchetype::all()[n - 1],
            _ => match choice.parse::<ShapeArchetype>() {
                Ok(a)  => a,
                Err(e) => { println!("  ⚠  {}\n", e); continue; }
            },
        };

        let n: usize = read_line("  How many points? (default 6000): ")?
            .trim().parse().unwrap_or(6000);
        let n = n.max(1).min(1_000_000);

        let cloud = generate_shape(archetype, n, None);
        report(archetype, &cloud);
    }
    Ok(())
}

fn report(archetype: ShapeArchetype, cloud: &PointBuffer) {
    println!();
    println!("  ┌─ {} ({} points, {} floats) ─", archetype, cloud.point_count(), cloud.as_slice().len());
    if let (Some((lo, hi)), Some(c)) = (cloud.bounds(), cloud.centroid()) {
        println!("  │  min      : [{:>7.3}, {:>7.3}, {:>7.3}]", lo[0], lo[1], lo[2]);
        println!("  │  max      : [{:>7.3}, {:>7.3}, {:>7.3}]", hi[0], hi[1], hi[2]);
        println!("  │  centroid : [{:>7.3}, {:>7.3}, {:>7.3}]", c[0], c[1], c[2]);
        let radius = cloud.points()
            .map(|p| (p[0]*p[0] + p[1]*p[1] + p[2]*p[2]).sqrt())
            .fold(0.0f32, f32::max);
        println!("  │  radius   : {:.3}", radius);
    }
    println!("  │");
    for (i, p) in cloud.points().take(5).enumerate() {
        println!("  │  [{:>2}] ({:>7.3}, {:>7.3}, {:>7.3})", i, p[0], p[1], p[2]);
    }
    println!("  └─");
    println!();
}

fn print_menu() {
    println!("  ┌──────────────────────────────────────────────────────┐");
    for (i, a) in ShapeArchetype::all().iter().enumerate() {
        println!("  │  {}. {:49} │", i + 1, a.name());
    }
    println!("  └──────────────────────────────────────────────────────┘");
    println!();
}

fn read_line(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(buf)
}
