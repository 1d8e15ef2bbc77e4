use console::Style;
use ralign_core::compute::BatchAlignment;
use ralign_core::job::JobConfig;
use ralign_core::transform::{Transform, TransformKind};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn rule(len: usize) -> String {
    "\u{2550}".repeat(len)
}

pub fn print_job_summary(config: &JobConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Alignment Job"));
    println!("  {}", s.title.apply_to(rule(13)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Reference"),
        s.path.apply_to(config.reference.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Images"),
        s.value.apply_to(config.moving.len())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Device"),
        s.method.apply_to(format!("{:?}", config.device))
    );
    println!();

    println!("  {}", s.header.apply_to("Strategy"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Aligner"),
        s.method.apply_to(config.aligner.kind())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Comparator"),
        s.method.apply_to(&config.comparator.name)
    );
    if config.comparator.config.normalize {
        println!("    {:<12}{}", s.label.apply_to("Normalize"), s.value.apply_to("yes"));
    }
    println!();

    match &config.average {
        Some(path) => println!(
            "  {:<14}{}",
            s.header.apply_to("Average"),
            s.path.apply_to(path.display())
        ),
        None => println!(
            "  {:<14}{}",
            s.header.apply_to("Average"),
            s.disabled.apply_to("disabled")
        ),
    }
    println!();
}

pub fn print_transform(aligner: &str, backend: &str, t: &Transform) {
    let s = Styles::new();

    println!();
    println!(
        "  {} {}",
        s.title.apply_to(aligner),
        s.label.apply_to(format!("({backend})"))
    );
    match t.kind() {
        TransformKind::TwoD => {
            let p = t.params_2d();
            println!("    {:<10}{}", s.label.apply_to("alpha"), s.value.apply_to(format!("{:.3}", p.alpha)));
            println!("    {:<10}{}", s.label.apply_to("tx"), s.value.apply_to(format!("{:.3}", p.tx)));
            println!("    {:<10}{}", s.label.apply_to("ty"), s.value.apply_to(format!("{:.3}", p.ty)));
            let mirror = if p.mirror {
                s.method.apply_to("yes")
            } else {
                s.disabled.apply_to("no")
            };
            println!("    {:<10}{}", s.label.apply_to("mirror"), mirror);
        }
        TransformKind::ThreeD => {
            println!("    {}", s.value.apply_to(t));
        }
    }
    println!();
}

pub fn print_batch_results(backend: &str, names: &[String], results: &[BatchAlignment]) {
    let s = Styles::new();

    println!();
    println!(
        "  {} {}",
        s.title.apply_to("Batch alignment"),
        s.label.apply_to(format!("({backend})"))
    );
    println!("  {}", s.title.apply_to(rule(15)));
    for (name, r) in names.iter().zip(results) {
        let mirror = if r.mirror { "M" } else { " " };
        println!(
            "  {:<32} {:>8.2}\u{b0} {:>6.1} {:>6.1} {} {}",
            s.path.apply_to(name),
            r.angle,
            r.sx,
            r.sy,
            s.method.apply_to(mirror),
            s.label.apply_to(format!("{:.4}", r.score))
        );
    }
    println!();
}
