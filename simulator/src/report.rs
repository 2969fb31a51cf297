use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

const FIRMWARE_VERSIONS: [&str; 3] = ["1.4.2", "1.5.0", "2.0.0-rc1"];
const LOCATIONS: [&str; 5] = ["Boiler Room", "Cold Store", "Dock 3", "Roof", "Lab"];

/// One status report as a device would send it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub serial_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub report_id: Uuid,
    pub reported_at: DateTime<Utc>,
    pub firmware: String,
    pub temperature: f64,
    pub humidity: f64,
    pub battery: f64,
    pub online: bool,
}

pub fn serial_for(index: usize) -> String {
    format!("DEV-{:05}", index)
}

/// Label derived from the serial index so a device keeps its name across reports.
pub fn name_for(index: usize) -> String {
    format!("{} #{}", LOCATIONS[index % LOCATIONS.len()], index)
}

pub fn generate_report(rng: &mut impl Rng, index: usize, named: bool) -> StatusReport {
    let temperature = if rng.gen_bool(0.05) {
        rng.gen_range(-50.0..100.0) // 5% outliers
    } else {
        rng.gen_range(15.0..35.0)
    };

    let battery = if rng.gen_bool(0.02) {
        rng.gen_range(0.0..20.0) // 2% low battery
    } else {
        rng.gen_range(20.0..100.0)
    };

    StatusReport {
        serial_no: serial_for(index),
        name: named.then(|| name_for(index)),
        report_id: Uuid::new_v4(),
        reported_at: Utc::now(),
        firmware: FIRMWARE_VERSIONS[index % FIRMWARE_VERSIONS.len()].to_string(),
        temperature,
        humidity: rng.gen_range(30.0..80.0),
        battery,
        online: !rng.gen_bool(0.01),
    }
}
