use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use ralign_core::compute::{create_backend, BatchGeometry};
use ralign_core::io::{load_image, save_image};
use ralign_core::job::aligned_path;
use ralign_core::stack::mean_stack;

use super::DeviceArg;
use crate::summary::print_batch_results;

#[derive(Args)]
pub struct BatchArgs {
    /// Images to align
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Reference image
    #[arg(short, long)]
    pub reference: PathBuf,

    /// Largest translation searched in each direction, in pixels
    #[arg(long, default_value = "4")]
    pub shift: usize,

    /// Translation grid spacing in pixels
    #[arg(long, default_value = "1")]
    pub step: usize,

    /// Compute device
    #[arg(long, value_enum, default_value = "auto")]
    pub device: DeviceArg,

    /// Directory for the aligned images
    #[arg(short, long, default_value = "aligned")]
    pub output_dir: PathBuf,

    /// Also write the mean of the aligned stack here
    #[arg(long)]
    pub average: Option<PathBuf>,
}

pub fn run(args: &BatchArgs) -> Result<()> {
    let reference = load_image(&args.reference)
        .with_context(|| format!("Failed to read {}", args.reference.display()))?;

    println!("Reading {} images...", args.images.len());
    let images = args
        .images
        .iter()
        .map(|path| load_image(path).with_context(|| format!("Failed to read {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    let mut geometry = BatchGeometry::for_image(reference.nx(), reference.ny(), args.shift)?;
    geometry.step = args.step;
    let backend = create_backend(&args.device.into());

    let pb = ProgressBar::new(images.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Loading [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let results = ralign_core::job::align_stack(&images, &reference, geometry, backend.as_ref(), |n| {
        pb.set_position(n as u64)
    })?;
    pb.finish();

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
    for (path, (_, aligned)) in args.images.iter().zip(&results) {
        save_image(aligned, &aligned_path(&args.output_dir, path))?;
    }

    let names: Vec<String> = args.images.iter().map(|p| p.display().to_string()).collect();
    let alignments: Vec<_> = results.iter().map(|(a, _)| *a).collect();
    print_batch_results(backend.name(), &names, &alignments);

    if let Some(path) = &args.average {
        let aligned: Vec<_> = results.into_iter().map(|(_, image)| image).collect();
        save_image(&mean_stack(&aligned)?, path)?;
        println!("Average saved to {}", path.display());
    }
    println!("Saved to {}", args.output_dir.display());
    Ok(())
}
