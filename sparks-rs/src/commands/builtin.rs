//! Built-in preset export

use anyhow::{Context, Result};
use spark_sim::PresetDocument;

use crate::cli::PresetFormat;

pub fn execute(format: PresetFormat) -> Result<()> {
    let preset = PresetDocument::fountain();
    let text = match format {
        PresetFormat::Yaml => preset.to_yaml(),
        PresetFormat::Json => preset.to_json(),
    }
    .context("Failed to serialize built-in preset")?;

    println!("{}", text.trim_end());
    Ok(())
}
