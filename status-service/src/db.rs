use crate::config::DatabaseSettings;
use crate::errors::{Error, Result};
use crate::metrics::{STORE_FAILURES_TOTAL, STORE_LATENCY_SECONDS};
use crate::model::{DeviceStatusReport, NewStatusReport};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const INSERT_REPORT: &str = r#"
    INSERT INTO device_status (serial_no, name, data)
    VALUES ($1, $2, $3::jsonb)
    RETURNING id
    "#;

// Equal timestamps resolve to the most recently assigned id.
const SELECT_LATEST_REPORT: &str = r#"
    SELECT id, serial_no, name, "timestamp"::text AS "timestamp", data::text AS data
    FROM device_status
    WHERE serial_no = $1
    ORDER BY "timestamp" DESC, id DESC
    LIMIT 1
    "#;

/// Connects to Postgres and makes sure the `device_status` schema exists.
///
/// Safe to call on every start. Any error here means the service must not
/// begin serving.
pub async fn make_pool(settings: &DatabaseSettings) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .connect_with(settings.connect_options()?)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

/// Persistence for device status reports.
///
/// Handlers only see this trait; the Postgres implementation is built once at
/// startup and handed to the router.
pub trait StatusStore: Send + Sync + 'static {
    /// Writes one immutable report and returns its assigned id.
    fn insert(&self, report: NewStatusReport) -> impl Future<Output = Result<i32>> + Send;

    /// Returns the newest report for `serial_no`, or `None` when the device
    /// never reported.
    fn find_latest(
        &self,
        serial_no: &str,
    ) -> impl Future<Output = Result<Option<DeviceStatusReport>>> + Send;
}

#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    id: i32,
    serial_no: String,
    name: Option<String>,
    timestamp: String,
    data: String,
}

impl TryFrom<StatusRow> for DeviceStatusReport {
    type Error = Error;

    fn try_from(row: StatusRow) -> Result<Self> {
        let data = serde_json::from_str(&row.data)
            .map_err(|source| Error::CorruptPayload { id: row.id, source })?;

        Ok(Self {
            id: row.id,
            serial_no: row.serial_no,
            name: row.name,
            timestamp: row.timestamp,
            data,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl StatusStore for PgStatusStore {
    async fn insert(&self, report: NewStatusReport) -> Result<i32> {
        // Serialization problems never reach the database.
        let payload = serde_json::to_string(&report.data)?;

        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i32>(INSERT_REPORT)
            .bind(&report.serial_no)
            .bind(report.name)
            .bind(payload)
            .fetch_one(&self.pool)
            .await;
        STORE_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());

        let id = result.map_err(|e| {
            STORE_FAILURES_TOTAL.inc();
            error!(serial_no = %report.serial_no, "Failed to insert status report: {}", e);
            e
        })?;

        debug!(id, serial_no = %report.serial_no, "Inserted status report");
        Ok(id)
    }

    async fn find_latest(&self, serial_no: &str) -> Result<Option<DeviceStatusReport>> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, StatusRow>(SELECT_LATEST_REPORT)
            .bind(serial_no)
            .fetch_optional(&self.pool)
            .await;
        STORE_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());

        let row = result.map_err(|e| {
            STORE_FAILURES_TOTAL.inc();
            error!(serial_no, "Failed to query latest status report: {}", e);
            e
        })?;

        row.map(DeviceStatusReport::try_from).transpose()
    }
}
