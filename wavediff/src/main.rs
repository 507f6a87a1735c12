use std::process::ExitCode;

use tracing::error;
use wavediff::{cli, logging};

fn main() -> ExitCode {
    let cli = cli::parse();
    logging::init_logging(cli.verbose);
    match wavediff::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("wavediff: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
