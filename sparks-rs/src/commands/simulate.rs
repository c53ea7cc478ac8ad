//! Headless preset simulation

use anyhow::{Context, Result};
use console::style;
use log::info;
use spark_sim::{EmitterRegistry, ParticleEmitter};

use crate::cli::SimulateArgs;
use crate::commands::load_preset;
use crate::utils::{
    add_table_row, create_progress_bar, create_table, format_count, format_seconds, format_vec3,
};

pub fn execute(args: SimulateArgs, quiet: bool) -> Result<()> {
    if !(args.seconds.is_finite() && args.seconds >= 0.0) {
        anyhow::bail!("--seconds must be a non-negative number, got {}", args.seconds);
    }

    let mut preset = load_preset(&args.preset)?;
    if let Some(seed) = args.seed {
        preset = preset.with_seed(seed);
    }

    let mut registry = EmitterRegistry::new();
    let created = preset
        .instantiate(&mut registry)
        .with_context(|| format!("Failed to instantiate preset {}", args.preset))?;

    let frames = (args.seconds * args.fps as f32).ceil() as u64;
    let dt = 1.0 / (args.fps as f32 * args.substeps as f32);
    info!(
        "Simulating {} frame(s) of {} tick(s) at dt = {:.5}s",
        frames, args.substeps, dt
    );

    let pb = create_progress_bar(frames, &args.preset, quiet);
    let mut peak_particles = 0;
    for _ in 0..frames {
        for _ in 0..args.substeps {
            registry.tick(dt);
        }

        if let Some(eye) = args.eye {
            let ids: Vec<_> = registry.ids().collect();
            for id in ids {
                if let Some(emitter) = registry.resolve_mut(id) {
                    emitter.sort_back_to_front(eye);
                }
            }
        }

        peak_particles = peak_particles.max(registry.stats().live_particles);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let stats = registry.stats();
    println!("{}", style("Simulation Summary").bold().cyan());
    println!("{}", style("==================").cyan());
    println!("{}: {}", style("Preset").bold(), args.preset);
    println!(
        "{}: {} ({} frames x {} ticks)",
        style("Simulated").bold(),
        format_seconds(frames as f32 / args.fps as f32),
        format_count(frames),
        args.substeps
    );
    println!(
        "{}: {}",
        style("Live particles").bold(),
        format_count(stats.live_particles as u64)
    );
    println!(
        "{}: {}",
        style("Peak particles").bold(),
        format_count(peak_particles as u64)
    );
    println!();

    let mut table = create_table(&["Id", "Name", "Live", "Emitted", "Remaining", "Position"]);
    for (name, id) in &created {
        let row = match registry.resolve(*id) {
            Some(emitter) => emitter_row(name, emitter),
            None => vec![
                id.to_string(),
                name.clone(),
                "-".to_string(),
                "-".to_string(),
                "swept".to_string(),
                "-".to_string(),
            ],
        };
        add_table_row(&mut table, row);
    }
    table.printstd();

    Ok(())
}

fn emitter_row(name: &str, emitter: &ParticleEmitter) -> Vec<String> {
    vec![
        emitter.id().to_string(),
        name.to_string(),
        format_count(emitter.particle_count() as u64),
        format_count(emitter.emitted_total()),
        format_seconds(emitter.remaining_life()),
        format_vec3(emitter.position()),
    ]
}
