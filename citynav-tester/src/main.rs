mod policy;
mod reports;
mod runner;
mod synthetic;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use citynav_core::{LEVEL_MAX, LEVEL_MIN};
use policy::PolicyKind;
use runner::{expand_tasks, run_benchmark};

#[derive(Debug, Parser)]
#[command(name = "citynav-tester", version)]
#[command(about = "Automated benchmark runs for the CityNav navigation harness")]
struct Args {
    /// Levels to run (comma-separated, or 'all')
    #[arg(long, default_value = "1,2,3")]
    levels: String,

    /// Policies to run (comma-separated, or 'all')
    #[arg(long, default_value = "all")]
    policies: String,

    /// List all available policies and exit
    #[arg(long)]
    list_policies: bool,

    /// Fail every n-th view render to exercise the fallback path
    #[arg(long)]
    flaky_views: Option<u32>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json", "markdown"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_policies(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let levels = parse_levels(&args.levels)?;
    let policies = parse_policies(&args.policies)?;
    let tasks = expand_tasks(&levels, &policies);
    let records = run_benchmark(&tasks, args.flaky_views, args.verbose);

    write_reports(&args, &records, start_time)?;

    if records.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn announce_banner() {
    println!("{}", "🗺️  CityNav Benchmark Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn maybe_list_policies(args: &Args) -> Result<bool> {
    if !args.list_policies {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available policies:")?;
    for kind in PolicyKind::ALL {
        writeln!(output_target.writer(), "  {}", kind.label())?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn split_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

fn parse_levels(levels_arg: &str) -> Result<Vec<u8>> {
    let mut levels = Vec::new();
    for token in split_csv(levels_arg) {
        if token == "all" {
            levels.extend(LEVEL_MIN..=LEVEL_MAX);
            continue;
        }
        let level: u8 = token
            .parse()
            .with_context(|| format!("invalid level: {token}"))?;
        if !(LEVEL_MIN..=LEVEL_MAX).contains(&level) {
            bail!("level {level} is out of range ({LEVEL_MIN}-{LEVEL_MAX})");
        }
        levels.push(level);
    }
    if levels.is_empty() {
        bail!("no levels selected");
    }
    Ok(levels)
}

fn parse_policies(policies_arg: &str) -> Result<Vec<PolicyKind>> {
    let mut policies = Vec::new();
    for token in split_csv(policies_arg) {
        if token == "all" {
            policies.extend(PolicyKind::ALL);
            continue;
        }
        match PolicyKind::parse(&token) {
            Some(kind) => policies.push(kind),
            None => bail!("unknown policy: {token}"),
        }
    }
    if policies.is_empty() {
        bail!("no policies selected");
    }
    Ok(policies)
}

fn write_reports(args: &Args, records: &[runner::TaskRecord], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, records)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, records)?,
        _ => {
            let duration = start_time.elapsed();
            reports::generate_console_report(&mut output_target, records, duration)?;
        }
    }

    let duration = start_time.elapsed();
    writeln!(&mut output_target)?;
    writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
