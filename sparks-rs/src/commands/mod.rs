//! Command implementations

pub mod builtin;
pub mod inspect;
pub mod simulate;

use anyhow::{Context, Result};
use spark_sim::PresetDocument;
use std::path::Path;

/// Names accepted in place of a preset file
pub const BUILTIN_PRESETS: &[&str] = &["fountain"];

/// Load a preset file, or a built-in preset when no such file exists
pub fn load_preset(source: &str) -> Result<PresetDocument> {
    let path = Path::new(source);
    if path.exists() {
        return PresetDocument::from_path(path)
            .with_context(|| format!("Failed to load preset {}", path.display()));
    }

    match source {
        "fountain" => Ok(PresetDocument::fountain()),
        _ => anyhow::bail!(
            "No preset file '{}' (built-in presets: {})",
            source,
            BUILTIN_PRESETS.join(", ")
        ),
    }
}
