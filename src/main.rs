use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossfill::{
    find_fill, find_fill_parallel, render_grid, FillFailure, FillOptions, Propagation, Structure,
    Vocabulary,
};
use instant::Duration;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PropagationArg {
    Incremental,
    Full,
}

/// Fill a crossword grid from a word list.
#[derive(Parser, Debug)]
#[command(name = "crossfill")]
struct Args {
    /// Grid structure file: `#` for blocks, `_` or `.` for open cells
    structure: PathBuf,

    /// Word list file, one word per line
    words: PathBuf,

    /// Give up after this many milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Give up after visiting this many search states
    #[arg(long)]
    max_states: Option<u64>,

    #[arg(long, value_enum, default_value = "incremental")]
    propagation: PropagationArg,

    /// Explore the first slot's candidates on multiple threads
    #[arg(long)]
    parallel: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let template = fs::read_to_string(&args.structure)
        .with_context(|| format!("reading structure from {}", args.structure.display()))?;
    let structure = Structure::from_template(&template)
        .with_context(|| format!("parsing structure from {}", args.structure.display()))?;

    let word_list = fs::read_to_string(&args.words)
        .with_context(|| format!("reading words from {}", args.words.display()))?;
    let vocabulary = Vocabulary::from_word_list(&word_list);

    let mut options = FillOptions::default().with_propagation(match args.propagation {
        PropagationArg::Incremental => Propagation::Incremental,
        PropagationArg::Full => Propagation::Full,
    });
    if let Some(time_limit_ms) = args.time_limit_ms {
        options = options.with_time_limit(Duration::from_millis(time_limit_ms));
    }
    if let Some(max_states) = args.max_states {
        options = options.with_max_states(max_states);
    }

    let result = if args.parallel {
        find_fill_parallel(&structure, &vocabulary, options)
    } else {
        find_fill(&structure, &vocabulary, options)
    };

    match result {
        Ok(success) => {
            info!(statistics = ?success.statistics, "found fill");
            println!("{}", render_grid(&structure, &success.assignment));
        }
        Err(FillFailure::NoSolution) => println!("No solution."),
        Err(FillFailure::BudgetExhausted) => {
            warn!("search budget exhausted");
            println!("No solution.");
        }
    }

    Ok(())
}
