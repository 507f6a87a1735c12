use std::path::PathBuf;

use clap::Parser;

/// Writes the difference of two WAVE files to a 64-bit float WAVE file and prints
/// the peak and average difference of each channel.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Compare directories: files with the same name are compared and
    /// subdirectories are compared recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Output file, or output directory with --recursive
    #[arg(short, long)]
    pub output: PathBuf,

    /// Log progress to stderr (RUST_LOG overrides this)
    #[arg(short, long)]
    pub verbose: bool,

    /// First input file or directory
    pub file1: PathBuf,

    /// Second input file or directory
    pub file2: PathBuf,
}

pub fn parse() -> Cli {
    Cli::parse()
}
