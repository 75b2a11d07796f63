//! GexFlow CLI
//!
//! Loads a saved chain export (JSON or CSV), runs the exposure pipeline
//! once, and prints the headline dealer-positioning numbers.

use std::fs;

use chrono_tz::America::New_York;

use gexflow::prelude::*;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let path = match args.next() {
        Some(p) => p,
        None => {
            println!("Usage: gexflow <chain-file> [all|monthly|0dte|opex] [rate-percent]");
            return;
        }
    };
    let scope = match args.next() {
        None => ExpiryScope::All,
        Some(text) => match ExpiryScope::parse(&text) {
            Some(s) => s,
            None => {
                println!("Unknown scope '{}' (expected all, monthly, 0dte, or opex)", text);
                return;
            }
        },
    };
    let rate_percent: f64 = match args.next() {
        None => 5.0,
        Some(text) => match text.parse() {
            Ok(r) => r,
            Err(_) => {
                println!("Rate must be a number in percent, got '{}'", text);
                return;
            }
        },
    };

    println!("GexFlow Dealer Exposure");
    println!("=======================\n");

    let raw = match fs::read_to_string(&path) {
        Ok(r) => r,
        Err(e) => {
            println!("Error: could not read {}: {}", path, e);
            return;
        }
    };

    // JSON exports open with the response object; everything else is
    // treated as a CSV export.
    let parsed = if raw.trim_start().starts_with('{') {
        parse_json_chain(&raw, New_York)
    } else {
        parse_csv_chain(&raw, New_York)
    };
    let chain = match parsed {
        Ok(c) => c,
        Err(e) => {
            println!("Error: {}", e);
            return;
        }
    };

    println!("Chain: {}", chain.as_of_label);
    println!("  Spot: {:.2}", chain.spot);
    println!("  Rows: {}", chain.contracts.len());
    println!("  Expirations: {}", chain.contracts.expiries().len());

    let engine = ExposureEngine::new(RateProvider::new(FixedRate::new(rate_percent)));
    let snapshot = match engine.analyze(&chain, scope) {
        Ok(s) => s,
        Err(e) => {
            println!("\nAnalysis failed: {}", e);
            return;
        }
    };

    println!("\nScope: {} ({} rows)", scope.label(), snapshot.contracts.len());
    println!("  First expiry: {}", snapshot.first_expiry.format("%Y-%m-%d"));
    match snapshot.monthly_opex {
        Some(opex) => println!("  Monthly OPEX: {}", opex.format("%Y-%m-%d")),
        None => println!("  Monthly OPEX: unresolved"),
    }
    println!(
        "  Ladder: {} levels over [{:.0}, {:.0}]",
        snapshot.ladder.len(),
        snapshot.band.0,
        snapshot.band.1
    );

    println!("\nNet Dealer Exposure (bn):");
    println!("  Delta: {:+.3}", snapshot.total_delta());
    println!("  Gamma: {:+.3}", snapshot.total_gamma());
    println!("  Vanna: {:+.3}", snapshot.total_vanna());
    println!("  Charm: {:+.3}", snapshot.total_charm());

    println!("\nFlip Points:");
    match snapshot.delta_flip {
        Some(level) => println!("  Delta: {:.2}", level),
        None => println!("  Delta: none inside the band"),
    }
    match snapshot.gamma_flip {
        Some(level) => println!("  Gamma: {:.2}", level),
        None => println!("  Gamma: none inside the band"),
    }

    // The rows carrying the most gamma dominate hedging flow near spot.
    let mut by_gamma: Vec<&ContractExposure> = snapshot.per_contract.iter().collect();
    by_gamma.sort_by(|a, b| b.gamma.abs().total_cmp(&a.gamma.abs()));

    println!("\nLargest Gamma Rows:");
    for row in by_gamma.iter().take(5) {
        println!(
            "  {} K={:<8.0} gamma {:+.4}  delta {:+.4}",
            row.expiry.format("%Y-%m-%d"),
            row.strike,
            row.gamma,
            row.delta
        );
    }

    println!("\n--- Done ---");
}
