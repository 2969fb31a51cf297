use crate::errors::{Error, Result};
use crate::model::NewStatusReport;
use serde_json::Value;

pub const INVALID_BODY: &str = "Invalid request body";
pub const SERIAL_NO_REQUIRED: &str = "serialNo is required";

const SERIAL_NO_FIELD: &str = "serialNo";
const NAME_FIELD: &str = "name";

/// Parses a raw ingest body into a report ready for storage.
///
/// The body must be a JSON object carrying a non-empty string `serialNo`.
/// A string `name` is picked up when present; any other shape is ignored and
/// left untouched in the payload.
pub fn parse_report(body: &[u8]) -> Result<NewStatusReport> {
    let data: Value =
        serde_json::from_slice(body).map_err(|_| Error::Validation(INVALID_BODY.to_string()))?;

    let fields = data
        .as_object()
        .ok_or_else(|| Error::Validation(INVALID_BODY.to_string()))?;

    let serial_no = match fields.get(SERIAL_NO_FIELD) {
        Some(Value::String(serial_no)) if !serial_no.is_empty() => serial_no.clone(),
        _ => return Err(Error::Validation(SERIAL_NO_REQUIRED.to_string())),
    };

    let name = fields
        .get(NAME_FIELD)
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(NewStatusReport {
        serial_no,
        name,
        data,
    })
}
