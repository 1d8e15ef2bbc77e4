use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ralign_core::align::{AlignerConfig, AlignerKind, ParamBag};
use ralign_core::job::JobConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Strategy to write defaults for
    #[arg(short, long, default_value = "rotate_translate_flip")]
    pub aligner: String,

    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a default JobConfig as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let kind: AlignerKind = args.aligner.parse()?;
    let config = JobConfig {
        aligner: AlignerConfig::from_params(kind, &ParamBag::new())?,
        ..JobConfig::default()
    };
    let toml_str = config.to_toml_string()?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
