//! Compares two WAVE files, or two directories of WAVE files.
//!
//! The difference of the inputs is written to a 64-bit float WAVE file, and the peak and
//! average difference of each channel is printed.

use anyhow::{bail, Result};

pub mod cli;
pub mod diff;
pub mod logging;
pub mod stats;

/// Runs the comparison described by `cli`.
pub fn run(cli: &cli::Cli) -> Result<()> {
    if cli.recursive {
        let outcome = diff::diff_dirs(&cli.file1, &cli.file2, &cli.output)?;
        println!("{} compared, {} failed", outcome.compared, outcome.failed);
        if outcome.failed > 0 {
            bail!("{} file pairs couldn't be compared", outcome.failed);
        }
    } else {
        let report = diff::diff_files(&cli.file1, &cli.file2, &cli.output)?;
        print!("{}", report);
    }
    Ok(())
}
