use anyhow::Result;
use clap::Args;
use console::Style;
use ralign_core::align::list_aligners;
use ralign_core::compare::list_comparators;

#[derive(Args)]
pub struct ListArgs {
    /// Also show each strategy's options
    #[arg(short, long)]
    pub params: bool,
}

pub fn run(args: &ListArgs) -> Result<()> {
    let name = Style::new().green().bold();
    let dim = Style::new().dim();

    println!("Aligners:");
    for info in list_aligners() {
        println!("  {:<22}{}", name.apply_to(info.name), info.description);
        if args.params {
            for p in info.params {
                println!(
                    "      {:<12}{} {}",
                    p.key,
                    dim.apply_to(format!("[{}]", p.default)),
                    p.help
                );
            }
        }
    }

    println!();
    println!("Comparators:");
    for (cmp, description) in list_comparators() {
        println!("  {:<22}{}", name.apply_to(cmp), description);
    }
    Ok(())
}
