// Mon Oct 19 2026 - Alex

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rtti_dumper::{
    config::Config,
    engine::{RttiSession, TaskHandle},
    memory::PeImage,
    output::ModuleReport,
    rtti::ClassGraph,
    utils::logging,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Recovers C++ classes from MSVC RTTI in a PE image", long_about = None)]
struct Args {
    #[arg(short, long)]
    binary: PathBuf,

    #[arg(short, long, default_value = "classes.json")]
    output: PathBuf,

    #[arg(long)]
    text_output: Option<PathBuf>,

    /// Only report classes whose name contains this (case-insensitive)
    #[arg(short, long)]
    filter: Option<String>,

    /// Also scan for code references and instances of every class
    #[arg(short, long)]
    scan: bool,

    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long)]
    no_progress: bool,
}

fn main() {
    let args = Args::parse();

    if args.verbose > 0 {
        logging::init_logger(args.verbose);
    } else {
        logging::init_from_env();
    }

    if let Err(e) = run(&args) {
        eprintln!("{} {:#}", "[!]".red(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    println!("{}", "RTTI Dumper".cyan().bold());
    println!("{}", "=".repeat(50).cyan());
    println!();

    let start_time = Instant::now();

    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    config.validate()?;

    println!("{} Loading binary: {}", "[*]".blue(), args.binary.display());
    let image = PeImage::load(&args.binary).with_context(|| format!("loading {}", args.binary.display()))?;

    let session = RttiSession::new(Arc::new(image), config);
    let module = session.module();
    println!(
        "{} Loaded {} ({}, base {}, {} sections)",
        "[+]".green(),
        module.name,
        module.width,
        module.base,
        module.sections.len()
    );

    let handle = session
        .process_rtti_async()
        .context("failed to start RTTI processing")?;
    let count = wait(handle, !args.no_progress, || session.processing_stage())?;
    println!("{} {}", "[+]".green(), session.processing_stage());
    println!("{} Recovered {} vtables", "[+]".green(), count);

    if args.scan {
        let handle = session.scan_all_async().context("failed to start reference scan")?;
        let hits = wait(handle, !args.no_progress, || "Scanning for code references and instances".to_string())?;
        println!("{} Found {} code references and instances", "[+]".green(), hits);
    }

    let graph = session.graph();
    let report = ModuleReport::new(session.module(), &graph, args.filter.as_deref());
    print_summary(&report, &graph);

    report
        .save_json(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("{} Results saved to: {}", "[+]".green(), args.output.display());

    if let Some(text_path) = &args.text_output {
        match report.save_text(&graph, text_path) {
            Ok(()) => println!("{} Text report saved to: {}", "[+]".green(), text_path.display()),
            Err(e) => eprintln!("{} Failed to save text report: {}", "[!]".red(), e),
        }
    }

    println!();
    println!("{}", "=".repeat(50).cyan());
    println!(
        "{} Done in {:.2}s",
        "[+]".green(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Polls a background task, showing `status` on a spinner until it finishes.
fn wait<T, F>(handle: TaskHandle<T>, show_progress: bool, status: F) -> Result<T>
where
    T: Send + 'static,
    F: Fn() -> String,
{
    let spinner = show_progress.then(|| {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            pb.set_style(style);
        }
        pb
    });

    while !handle.is_finished() {
        if let Some(pb) = &spinner {
            pb.set_message(status());
            pb.tick();
        }
        thread::sleep(Duration::from_millis(80));
    }

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    Ok(handle.join()?)
}

fn print_summary(report: &ModuleReport, graph: &ClassGraph) {
    println!();
    println!("{}", "Classes".cyan().bold());
    println!("{}", "-".repeat(40).cyan());

    for class in &report.classes {
        let name = if class.needs_review {
            class.formatted_name.yellow()
        } else {
            class.formatted_name.cyan()
        };
        println!(
            "  {} {} [{} functions]",
            name,
            class.vtable,
            class.functions.len().to_string().green()
        );

        for parent in &class.parents {
            println!("    {} {}", ":".dimmed(), parent.name.red());
        }
        for interface in &class.interfaces {
            println!("    {} {} {}", "+".dimmed(), interface.name.magenta(), interface.vtable);
        }
        if !class.code_references.is_empty() || !class.instances.is_empty() {
            println!(
                "    {} code references, {} instances",
                class.code_references.len(),
                class.instances.len()
            );
        }
    }

    println!();
    println!(
        "  Reported: {} of {} classes (generation {})",
        report.class_count.to_string().green(),
        graph.classes().count(),
        report.generation
    );
}
