//! Preset inspection

use anyhow::{Context, Result};
use console::style;
use spark_sim::EmitterRegistry;

use crate::commands::load_preset;
use crate::utils::{add_table_row, create_table, format_count, format_scalar, format_seconds};

pub fn execute(source: &str) -> Result<()> {
    let preset = load_preset(source)?;

    let mut registry = EmitterRegistry::new();
    let created = preset
        .instantiate(&mut registry)
        .with_context(|| format!("Preset {source} is invalid"))?;
    registry
        .validate()
        .with_context(|| format!("Preset {source} is invalid"))?;

    println!("{}", style("Preset Information").bold().cyan());
    println!("{}", style("==================").cyan());
    println!("{}: {}", style("Source").bold(), source);
    println!("{}: {}", style("Seed").bold(), preset.seed);
    println!("{}: {}", style("Emitters").bold(), created.len());
    println!();

    let mut table = create_table(&[
        "Id", "Name", "Duration", "Looping", "Child", "Rate", "Life", "Bursts", "Max", "Birth",
        "Death",
    ]);
    for ((name, id), config) in created.iter().zip(&preset.emitters) {
        let bursts: u64 = config.bursts.iter().map(|b| u64::from(b.count)).sum();
        add_table_row(
            &mut table,
            vec![
                id.to_string(),
                name.clone(),
                format_seconds(config.duration),
                yes_no(config.looping),
                yes_no(config.child),
                format_scalar(&config.emit_per_second),
                format_scalar(&config.life),
                format!("{} ({} total)", config.bursts.len(), format_count(bursts)),
                format_count(config.max_particles as u64),
                config.birth.join(", "),
                config.death.join(", "),
            ],
        );
    }
    table.printstd();

    println!();
    println!("{} {}", style("✓").green(), style("Preset is valid").green());
    Ok(())
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}
