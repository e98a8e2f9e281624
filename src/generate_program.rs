use std::error::Error;
use std::io::{self, Read};
use std::path::PathBuf;
use std::fs;

use clap::Parser;

use jasminsmith::{make_program_str, GeneratorConfig};

/// Generates one program from the raw bytes on stdin.
#[derive(Parser, Debug)]
#[command(name = "generate-program")]
struct Args {
    /// Where to write the rendered program
    output: PathBuf,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    let mut buffer = vec![];
    io::stdin().read_to_end(&mut buffer)?;
    let program = make_program_str(&buffer, &config)?;
    fs::write(args.output, program)?;
    Ok(())
}
