use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use glitchlab_core::buffer::Selection;
use glitchlab_core::effects::EffectType;
use glitchlab_media::SaveFormat;

#[derive(Parser, Debug)]
#[command(name = "glitchlab", version, about = "Signal-processing glitch effects for still images")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every effect and its parameters.
    Effects {
        /// Print the schema as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Apply a single effect to an image.
    Apply(ApplyArgs),
    /// Apply a JSON chain of effects to an image.
    Chain(ChainArgs),
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub io: ImageIo,

    /// Effect id, e.g. `pixel_sort`.
    #[arg(short, long)]
    pub effect: EffectType,

    /// Parameter override as `name=value`; repeatable.
    #[arg(short, long = "param", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Restrict the effect to `start:end:channel`; repeatable.
    #[arg(short, long = "select", value_name = "START:END:CHANNEL")]
    pub selections: Vec<Selection>,

    /// Seed for effects that draw random numbers.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ChainArgs {
    #[command(flatten)]
    pub io: ImageIo,

    /// Recipe file (JSON).
    #[arg(short, long, value_name = "FILE")]
    pub recipe: PathBuf,
}

#[derive(Args, Debug)]
pub struct ImageIo {
    /// Input image.
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output image.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Output format: png, jpeg, bmp or tiff. Defaults to the output
    /// extension, then png.
    #[arg(short, long)]
    pub format: Option<SaveFormat>,

    /// JPEG quality, 1-100.
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,
}

impl ImageIo {
    pub fn save_format(&self) -> SaveFormat {
        let format = self
            .format
            .or_else(|| SaveFormat::from_extension(&self.output))
            .unwrap_or_default();
        match self.quality {
            Some(quality) => format.with_quality(quality),
            None => format,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
