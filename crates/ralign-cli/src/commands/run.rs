use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use ralign_core::job::{run_job, JobConfig, REPORT_FILE};

use super::DeviceArg;
use crate::summary::print_job_summary;

#[derive(Args)]
pub struct RunArgs {
    /// Job file (TOML); see `ralign config`
    pub config: PathBuf,

    /// Override the job's compute device
    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut config = JobConfig::load(&args.config)
        .with_context(|| format!("Failed to load job {}", args.config.display()))?;
    if let Some(device) = args.device {
        config.device = device.into();
    }

    print_job_summary(&config);

    let pb = ProgressBar::new(config.moving.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Aligning [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let report = run_job(&config, |n| pb.set_position(n as u64))?;
    pb.finish();

    println!(
        "Aligned {} images; transforms in {}",
        report.entries.len(),
        config.output_dir.join(REPORT_FILE).display()
    );
    if let Some(path) = &report.average {
        println!("Average saved to {}", path.display());
    }
    Ok(())
}
