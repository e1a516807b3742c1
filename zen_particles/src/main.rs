//! zen_particles: interactive entry point.

use std::io::{self, Write};

use clap::Parser;
use particle_shapes::ShapeArchetype;
use zen_particles::app::{run, AppConfig};
use zen_particles::palette::{Rgb, PRESETS};

/// Gesture-controlled particle clouds.
///
/// Without `--quick` any setting not given on the command line is asked for
/// on the terminal before the window opens.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Start immediately with defaults for anything not given.
    #[arg(long)]
    quick: bool,

    /// Initial shape (heart, flower, saturn, meditation, fireworks, cube).
    #[arg(long)]
    shape: Option<ShapeArchetype>,

    /// Number of particles.
    #[arg(long)]
    points: Option<usize>,

    /// Particle color as #rrggbb.
    #[arg(long)]
    color: Option<Rgb>,

    /// Command that turns a prompt (its last argument) into
    /// `{"points": [x, y, z, ...]}` on stdout.
    #[arg(long, env = "ZEN_POINTS_CMD")]
    points_cmd: Option<String>,

    /// Hide the on-screen status overlay.
    #[arg(long)]
    no_hud: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let cli = Cli::parse();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║           ZenParticles — Gesture Particle Clouds             ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Keyboard simulation  (use --features leap for hardware)");
    println!();

    let cfg = if cli.quick {
        println!("  Quick-start: heart, 6000 points, #ff4d4d\n");
        config_from_cli(cli)
    } else {
        configure_interactively(cli)?
    };

    println!();
    println!("  Opening visualizer window…");
    println!();

    run(cfg)?;
    Ok(())
}

fn config_from_cli(cli: Cli) -> AppConfig {
    let defaults = AppConfig::default();
    AppConfig {
        shape:       cli.shape.unwrap_or(defaults.shape),
        color:       cli.color.unwrap_or(defaults.color),
        point_count: cli.points.unwrap_or(defaults.point_count).max(1),
        points_cmd:  cli.points_cmd,
        show_hud:    !cli.no_hud,
    }
}

fn configure_interactively(cli: Cli) -> io::Result<AppConfig> {
    let mut cfg = AppConfig {
        points_cmd: cli.points_cmd.clone(),
        show_hud:   !cli.no_hud,
        ..AppConfig::default()
    };

    cfg.shape = match cli.shape {
        Some(s) => s,
        None    => pick_shape()?,
    };
    cfg.point_count = match cli.points {
        Some(n) => n,
        None    => read_line("  Particles (default 6000): ")?
            .trim().parse().unwrap_or(6000),
    }.clamp(1, 200_000);
    cfg.color = match cli.color {
        Some(c) => c,
        None    => pick_color()?,
    };

    if cfg.points_cmd.is_none() {
        let line = read_line("  AI points command (blank = offline fallback only): ")?;
        if !line.trim().is_empty() {
            cfg.points_cmd = Some(line.trim().to_string());
        }
    }
    Ok(cfg)
}

fn pick_shape() -> io::Result<ShapeArchetype> {
    println!("  Shape:");
    println!("    1.Heart  2.Flower  3.Saturn  4.Meditation  5.Fireworks  6.Cube");
    let shape = match read_line("    Choice (1–6, default 1): ")?.trim() {
        "2" => ShapeArchetype::Flower,
        "3" => ShapeArchetype::Saturn,
        "4" => ShapeArchetype::MeditationFigure,
        "5" => ShapeArchetype::Fireworks,
        "6" => ShapeArchetype::DefaultCube,
        _   => ShapeArchetype::Heart,
    };
    Ok(shape)
}

fn pick_color() -> io::Result<Rgb> {
    println!("  Color:");
    for (i, c) in PRESETS.iter().enumerate() {
        print!("    {}.{}", i + 1, c);
    }
    println!();
    loop {
        let line = read_line("    Preset number or #rrggbb (default 2): ")?;
        let line = line.trim();
        if line.is_empty() { return Ok(AppConfig::default().color); }
        if let Ok(n) = line.parse::<usize>() {
            if (1..=PRESETS.len()).contains(&n) { return Ok(PRESETS[n - 1]); }
        }
        match line.parse::<Rgb>() {
            Ok(c)  => return Ok(c),
            Err(e) => println!("    ⚠  {}", e),
        }
    }
}

fn read_line(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(buf)
}
