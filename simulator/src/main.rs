mod report;

use clap::Parser;
use report::{generate_report, StatusReport};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Simulates a fleet of devices posting status reports",
    long_about = None
)]
struct Args {
    /// Base URL of the status service
    #[arg(long, env = "API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// Reports per second across all devices
    #[arg(long, env = "RATE", default_value_t = 100)]
    rate: u64,

    /// Number of simulated devices
    #[arg(long, env = "DEVICES", default_value_t = 50)]
    devices: usize,

    /// Include a device name in every report
    #[arg(long, env = "NAMED", default_value_t = false)]
    named: bool,

    /// Reports sent per burst
    #[arg(long, env = "BURST_SIZE", default_value_t = 20)]
    burst_size: usize,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if args.rate == 0 || args.devices == 0 || args.burst_size == 0 {
        error!("RATE, DEVICES and BURST_SIZE must be greater than zero");
        std::process::exit(1);
    }

    info!("Starting device status simulator");
    info!(
        "API: {}, Rate: {} reports/s, Devices: {}, Named: {}",
        args.api_url, args.rate, args.devices, args.named
    );

    let client = match Client::builder().timeout(Duration::from_secs(5)).build() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let endpoint = format!("{}/api/device/status", args.api_url.trim_end_matches('/'));

    let mut rng = rand::thread_rng();
    let mut counter = 0u64;
    let mut failed = 0u64;

    let burst_interval = Duration::from_millis((args.burst_size as u64 * 1000) / args.rate);
    info!("Posting in bursts of {} reports every {:?}", args.burst_size, burst_interval);

    loop {
        let burst_start = Instant::now();
        let mut in_flight = JoinSet::new();

        for _ in 0..args.burst_size {
            let index = (counter % args.devices as u64) as usize;
            let report = generate_report(&mut rng, index, args.named);
            counter += 1;

            let client = client.clone();
            let endpoint = endpoint.clone();
            in_flight.spawn(async move { post_report(&client, &endpoint, &report).await });
        }

        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok(true) => {}
                Ok(false) => failed += 1,
                Err(e) => {
                    error!("Report task failed: {}", e);
                    failed += 1;
                }
            }
        }

        if counter % 1000 < args.burst_size as u64 {
            info!("Posted {} reports ({} failed)", counter, failed);
        }

        let elapsed = burst_start.elapsed();
        if elapsed < burst_interval {
            tokio::time::sleep(burst_interval - elapsed).await;
        } else if elapsed > burst_interval * 2 {
            warn!(
                "Burst took {:?}, target was {:?} - service may be overloaded",
                elapsed, burst_interval
            );
        }
    }
}

async fn post_report(client: &Client, endpoint: &str, report: &StatusReport) -> bool {
    match client.post(endpoint).json(report).send().await {
        Ok(response) if response.status().is_success() => {
            debug!(serial_no = %report.serial_no, "Report accepted");
            true
        }
        Ok(response) => {
            warn!(
                serial_no = %report.serial_no,
                "Report rejected with status {}",
                response.status()
            );
            false
        }
        Err(e) => {
            warn!(serial_no = %report.serial_no, "Failed to post report: {}", e);
            false
        }
    }
}
