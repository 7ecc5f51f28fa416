//! Histogram isobar masses and decay angles under all Bose-symmetrization permutations.

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use laddu_angles::{run, Diagnostics, PlotOptions};

#[derive(Parser)]
#[command(name = "plot-angles")]
#[command(about = "Histogram isobar masses and Gottfried-Jackson/helicity angles per mass-bin range")]
#[command(version)]
struct Cli {
    /// Path to the output file (.root or .parquet)
    #[arg(value_name = "output-file")]
    output_file: PathBuf,

    /// Path to the decay template file
    #[arg(value_name = "template-file")]
    template_file: PathBuf,

    /// Mass bins to be calculated: all, N or N-M (repeatable, default: all)
    #[arg(short = 'b', long = "mass-bin", alias = "massBins", value_name = "massBin(s)")]
    mass_bins: Vec<String>,

    /// Path to the config file
    #[arg(short = 'c', long, value_name = "config-file", default_value = "rootpwa.config")]
    config_file: PathBuf,

    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// Do not draw progress bars
    #[arg(long)]
    no_progress: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    let options = PlotOptions::new(cli.output_file, cli.template_file)
        .mass_bins(cli.mass_bins)
        .config_file(cli.config_file)
        .show_progress(!cli.no_progress);
    let mut diagnostics = Diagnostics::new();
    match run(&options, &mut diagnostics) {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            diagnostics.error(err.to_string());
            println!("{}", diagnostics.summary());
            ExitCode::from(err.exit_code())
        }
    }
}
