//! # NSE Live Data Test
//!
//! Runs the NSE client against the exchange and prints what comes back.
//! Pass a JSON5 config path as the first argument to override the defaults,
//! and equity symbols after it (default: INFY TCS).

use lib_nse::markets::nse::ReportKind;
use lib_nse::{Nse, NseConfig};
use std::path::Path;

/// Executes the live fetches.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // // Statement: LoggerLocal forwards to the `log` facade; env_logger prints it
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => NseConfig::from_file(Path::new(&path))?,
        None => NseConfig::default(),
    };
    let mut symbols: Vec<String> = args.collect();
    if symbols.is_empty() {
        symbols = vec!["INFY".to_string(), "TCS".to_string()];
    }

    let nse = Nse::new(config)?;
    println!("{}", nse);

    println!("[*] Market open: {}", nse.market_status().await?);

    let holidays = nse.get_holiday_list().await?;
    println!("[*] Closed days left this year: {}", holidays.len());

    match nse.get_quotes(&symbols, true).await {
        Ok(batch) => println!("[SUCCESS] Quotes:\n{}", batch.as_json().unwrap_or_default()),
        Err(e) => eprintln!("[ERROR] Quotes failed: {}", e),
    }

    match nse.get_top(&[ReportKind::Gainers, ReportKind::Losers], true).await {
        Ok(reports) => {
            for report in reports {
                println!("[SUCCESS] Report:\n{}", report.as_json().unwrap_or_default());
            }
        }
        Err(e) => eprintln!("[ERROR] Reports failed: {}", e),
    }

    for (name, stats) in nse.cache_stats() {
        log::info!("cache {}: {:?}", name, stats);
    }

    Ok(())
}
