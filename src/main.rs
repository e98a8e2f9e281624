use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{fs, io};

use clap::Parser;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use jasminsmith::{generate, render, ConfigError, GenerationError, GeneratorConfig, Token};

/// Generates Jasmin programs from seeds.
#[derive(Parser, Debug)]
#[command(name = "jasminsmith", version)]
struct Cli {
    /// First seed; defaults to one derived from the clock
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of consecutive seeds to generate
    #[arg(short = 'n', long, default_value_t = 1, conflicts_with_all = ["repeat", "first_error"])]
    count: u64,

    /// Keep generating until interrupted
    #[arg(short, long)]
    repeat: bool,

    /// Stop at the first seed that fails to generate
    #[arg(short, long)]
    first_error: bool,

    /// Embedded profile name
    #[arg(short, long, default_value = "default", conflicts_with = "config")]
    profile: String,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to write `<seed>.jazz` files to; stdout if omitted
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Print the token sequence instead of the rendered program
    #[arg(long)]
    tokens: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Gen(#[from] GenerationError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to install the Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

enum Repeat {
    N(u64),
    Forever,
    FirstError,
}

fn main() -> Result<(), MainError> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::profile(&cli.profile).map_err(|e| {
            warn!(available = ?jasminsmith::config::available_profiles(), "unknown profile");
            e
        })?,
    };
    let repeat = if cli.repeat {
        Repeat::Forever
    } else if cli.first_error {
        Repeat::FirstError
    } else {
        Repeat::N(cli.count)
    };
    let first_seed = cli.seed.unwrap_or_else(clock_seed);

    if let Some(out) = &cli.out {
        fs::create_dir_all(out.join("failures"))?;
    }

    let is_interrupted: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    let r = is_interrupted.clone();
    ctrlc::set_handler(move || r.store(true, Ordering::SeqCst))?;

    info!(first_seed, profile = %cli.profile, "starting");
    let mut count = 0u64;
    let mut errors = 0u64;
    while !is_interrupted.load(Ordering::SeqCst)
        && match repeat {
            Repeat::N(n) => n > count,
            Repeat::Forever => true,
            Repeat::FirstError => errors < 1,
        }
    {
        let seed = first_seed.wrapping_add(count);
        count += 1;
        match generate(seed, &config) {
            Ok(tokens) => emit(&cli, seed, &tokens)?,
            Err(e) => {
                errors += 1;
                let timestamp = chrono::Utc::now().format("%Y-%m-%d:%H:%M:%S%.f");
                warn!(seed, %timestamp, error = %e, "generation failed");
                if let Some(out) = &cli.out {
                    fs::write(out.join("failures").join(format!("{}_{}.txt", timestamp, seed)), format!("{}\n", e))?;
                }
            }
        }
    }
    info!(count, errors, "finished");
    Ok(())
}

fn emit(cli: &Cli, seed: u64, tokens: &[Token]) -> Result<(), MainError> {
    let text = if cli.tokens {
        tokens.iter().map(|t| format!("{:?}\n", t)).collect::<String>()
    } else {
        format!("{}{}", header(seed), render(tokens))
    };
    match &cli.out {
        Some(dir) => {
            let path = dir.join(format!("{}.jazz", seed));
            debug!(seed, path = %path.display(), "writing program");
            fs::write(path, text)?;
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn header(seed: u64) -> String {
    format!(
        "// Program seed: {}\n// Generated by jasminsmith on {}\n\n",
        seed,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

fn clock_seed() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
