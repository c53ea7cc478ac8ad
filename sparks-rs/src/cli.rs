//! Root CLI structure for sparks

use clap::{Args, Parser, Subcommand, ValueEnum};
use glam::Vec3;

#[derive(Parser)]
#[command(name = "sparks")]
#[command(about = "Run and inspect particle emitter presets", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a preset headless and report per-emitter statistics
    Simulate(SimulateArgs),

    /// Validate a preset and list its emitters without running it
    Inspect {
        /// Preset file (.yaml, .yml, .json) or the name of a built-in preset
        preset: String,
    },

    /// Print the built-in fountain preset
    Builtin {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = PresetFormat::Yaml)]
        format: PresetFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Preset file (.yaml, .yml, .json) or the name of a built-in preset
    pub preset: String,

    /// Simulated time in seconds
    #[arg(short, long, default_value_t = 5.0)]
    pub seconds: f32,

    /// Frames per simulated second
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: u32,

    /// Registry ticks per frame
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub substeps: u32,

    /// Sort particles back to front from this eye position every frame (x,y,z)
    #[arg(long, value_parser = parse_vec3)]
    pub eye: Option<Vec3>,

    /// Override the preset's jitter seed
    #[arg(long, env = "SPARKS_SEED")]
    pub seed: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PresetFormat {
    Yaml,
    Json,
}

fn parse_vec3(value: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("expected x,y,z but got '{value}'"));
    };

    let component = |text: &str| {
        text.parse::<f32>()
            .map_err(|e| format!("invalid component '{text}': {e}"))
    };
    Ok(Vec3::new(component(*x)?, component(*y)?, component(*z)?))
}
