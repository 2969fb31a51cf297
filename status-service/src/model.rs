use serde::Serialize;
use serde_json::Value;

/// A validated status report that has not been written yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewStatusReport {
    pub serial_no: String,
    pub name: Option<String>,
    /// The complete payload as received, `serialNo` and `name` included.
    pub data: Value,
}

/// A persisted device status report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatusReport {
    pub id: i32,
    pub serial_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Insert time in the database's own text form.
    pub timestamp: String,
    pub data: Value,
}

/// Body returned after a successful ingest
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i32,
}
