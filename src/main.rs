use std::process::ExitCode;

use clap::Parser;
use log::info;
use rfierce::api::{ScanConfig, ScanReport, Scanner};
use rfierce::error::ScanError;
use rfierce::input::Opts;
use rfierce::logger;
use rfierce::output::export_report;

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();

    if let Err(e) = logger::init_logger(opts.verbose) {
        eprintln!("failed to initialize logger: {}", e);
    }

    tokio::select! {
        result = run_scan(&opts) => match result {
            Ok(report) => {
                info!("{} subdomains found", report.findings.len());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!("Exiting...");
            ExitCode::SUCCESS
        }
    }
}

/// 执行扫描主逻辑
async fn run_scan(opts: &Opts) -> Result<ScanReport, ScanError> {
    let config = ScanConfig::from_opts(opts)?;
    info!(
        "target {:?}, {} subdomains, expander {:?}",
        config.domain,
        config.subdomains.len(),
        config.expander
    );

    let scanner = Scanner::from_config(config)?;
    let report = scanner.run().await?;

    if let Some(path) = &opts.output {
        export_report(&report, path, opts.format)?;
        info!("results exported to {}", path.display());
    }
    Ok(report)
}
