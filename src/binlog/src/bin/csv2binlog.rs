use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

/// Converts a column-oriented csv file into a binary data log.
#[derive(Parser)]
#[command(name = "csv2binlog")]
struct Args {
    /// Input csv file with a header line and comma-separated numeric rows.
    csv_path: PathBuf,

    /// Output log file. Defaults to the input path with a `.binlog`
    /// extension.
    binlog_path: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let binlog_path = args
        .binlog_path
        .unwrap_or_else(|| args.csv_path.with_extension("binlog"));
    info!("[input] csv file: {}", args.csv_path.display());
    info!("[output] binlog file: {}", binlog_path.display());

    match binlog::create_log_file_by_csv_file(&args.csv_path, &binlog_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("csv conversion failed: {error}");
            ExitCode::FAILURE
        }
    }
}
