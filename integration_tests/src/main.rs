//! Integration tests for the environmental sensor firmware.
//!
//! Run after flashing the firmware to test the BLE peripheral end to end:
//! advertising, characteristic reads, notifications and re-advertising
//! after disconnect.

mod ble_client;
mod protocol;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use ble_client::SensorClient;
use protocol::DEVICE_NAME;
use tests::{print_results, run_connected_tests, run_test, test_readvertise};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "BLE integration tests for the environmental sensor firmware")]
struct Args {
    /// BLE device name to scan for
    #[arg(long, default_value = DEVICE_NAME)]
    ble_name: String,

    /// BLE scan timeout in seconds
    #[arg(long, default_value = "10")]
    scan_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let scan_timeout = Duration::from_secs(args.scan_timeout);

    println!("{}", "Environmental Sensor Integration Tests".bold());
    println!("Device: BLE (scanning for \"{}\")", args.ble_name);
    println!();

    println!("Scanning for BLE device \"{}\"...", args.ble_name);
    let client = SensorClient::connect_by_name(&args.ble_name, scan_timeout).await?;
    println!("{}", "  BLE connected!".green());

    println!("\n{}", "Running tests...".bold());
    println!();

    let mut results = run_connected_tests(&client, &args.ble_name).await;
    results.push(
        run_test("Advertising resumes after disconnect", || {
            test_readvertise(client, &args.ble_name, scan_timeout)
        })
        .await,
    );

    print_results(&results);

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
