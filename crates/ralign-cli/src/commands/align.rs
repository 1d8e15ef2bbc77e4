use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ralign_core::align::{align_with, ParamBag};
use ralign_core::compare::ComparatorConfig;
use ralign_core::compute::create_backend;
use ralign_core::io::{load_image, save_image};

use super::DeviceArg;
use crate::summary::print_transform;

#[derive(Args)]
pub struct AlignArgs {
    /// Image to align
    pub moving: PathBuf,

    /// Reference image (optional for translational)
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Alignment strategy (see `ralign list`)
    #[arg(short, long, default_value = "rotate_translate_flip")]
    pub aligner: String,

    /// Strategy option as key=value; may repeat
    #[arg(short = 'p', long = "param")]
    pub params: Vec<String>,

    /// Comparator used to score candidates
    #[arg(short, long, default_value = "ccc")]
    pub comparator: String,

    /// Normalize before comparing (sqeuclidean, dot)
    #[arg(long)]
    pub normalize: bool,

    /// Compute device
    #[arg(long, value_enum, default_value = "auto")]
    pub device: DeviceArg,

    /// Output file path
    #[arg(short, long, default_value = "aligned.tiff")]
    pub output: PathBuf,
}

pub fn run(args: &AlignArgs) -> Result<()> {
    let params = ParamBag::parse(&args.params)?;
    let moving = load_image(&args.moving)
        .with_context(|| format!("Failed to read {}", args.moving.display()))?;
    let reference = args
        .reference
        .as_ref()
        .map(|path| {
            load_image(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .transpose()?;

    let backend = create_backend(&args.device.into());
    let comparator_config = ComparatorConfig {
        normalize: args.normalize,
    };

    let aligned = align_with(
        &args.aligner,
        &params,
        &moving,
        reference.as_ref(),
        &args.comparator,
        &comparator_config,
        backend.as_ref(),
    )?;

    save_image(&aligned, &args.output)?;
    if let Some(t) = aligned.align_transform() {
        print_transform(&args.aligner, backend.name(), t);
    }
    println!("Saved to {}", args.output.display());
    Ok(())
}
