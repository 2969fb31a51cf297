use crate::config::HttpSettings;
use crate::db::StatusStore;
use crate::errors::Error;
use crate::metrics::{
    LOOKUPS_NOT_FOUND_TOTAL, LOOKUPS_TOTAL, REPORTS_RECEIVED_TOTAL, REPORTS_REJECTED_TOTAL,
    REPORTS_STORED_TOTAL,
};
use crate::model::{CreatedResponse, DeviceStatusReport};
use crate::validate::{parse_report, INVALID_BODY};
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        DefaultBodyLimit, Path, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

struct AppState<S> {
    store: Arc<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

pub fn create_router<S: StatusStore>(store: S) -> Router {
    let state = AppState {
        store: Arc::new(store),
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/device/status", post(create_status::<S>))
        .route("/api/device/status/:serial_no", get(get_latest_status::<S>))
        .with_state(state)
}

/// Wraps the application with the body size limit, request logging and,
/// when enabled, CORS.
pub fn apply_layers(router: Router, settings: &HttpSettings) -> Router {
    let router = router
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(TraceLayer::new_for_http());
    match cors_layer(settings) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(settings: &HttpSettings) -> Option<CorsLayer> {
    if !settings.cors_enabled {
        return None;
    }

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Credentials cannot be combined with a wildcard origin.
    if settings.allows_any_origin() {
        return Some(cors.allow_origin(AllowOrigin::any()));
    }

    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    Some(
        cors.allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true),
    )
}

async fn health() -> &'static str {
    "OK"
}

async fn create_status<S: StatusStore>(
    State(state): State<AppState<S>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CreatedResponse>, ApiError> {
    REPORTS_RECEIVED_TOTAL.inc();

    let body = body.map_err(|rejection| {
        REPORTS_REJECTED_TOTAL.inc();
        ApiError::body_rejected(rejection)
    })?;

    let report = parse_report(&body).map_err(|e| {
        REPORTS_REJECTED_TOTAL.inc();
        ApiError::from(e)
    })?;

    let serial_no = report.serial_no.clone();
    let id = state
        .store
        .insert(report)
        .await
        .map_err(ApiError::insert_failed)?;

    REPORTS_STORED_TOTAL.inc();
    info!(id, serial_no = %serial_no, "Status report stored");

    Ok(Json(CreatedResponse { id }))
}

async fn get_latest_status<S: StatusStore>(
    State(state): State<AppState<S>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<DeviceStatusReport>, ApiError> {
    LOOKUPS_TOTAL.inc();

    let Path(serial_no) = path.map_err(|rejection| {
        debug!("Rejected serial number path: {}", rejection.body_text());
        ApiError::BadRequest(INVALID_SERIAL_NO.to_string())
    })?;

    match state.store.find_latest(&serial_no).await {
        Ok(Some(report)) => Ok(Json(report)),
        Ok(None) => {
            LOOKUPS_NOT_FOUND_TOTAL.inc();
            debug!(serial_no = %serial_no, "No status report found");
            Err(ApiError::NotFound)
        }
        Err(e) => Err(ApiError::lookup_failed(e)),
    }
}

const INVALID_SERIAL_NO: &str = "Invalid serial number";
const BODY_TOO_LARGE: &str = "Request body too large";

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    PayloadTooLarge,
    NotFound,
    Internal { message: &'static str, source: Error },
}

impl ApiError {
    fn body_rejected(rejection: BytesRejection) -> Self {
        debug!("Failed to read request body: {}", rejection.body_text());
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLarge,
            _ => Self::BadRequest(INVALID_BODY.to_string()),
        }
    }

    fn insert_failed(source: Error) -> Self {
        let message = match source {
            Error::Json(_) => "Failed to process data",
            _ => "Failed to insert record",
        };
        Self::Internal { message, source }
    }

    fn lookup_failed(source: Error) -> Self {
        let message = match source {
            Error::CorruptPayload { .. } => "Failed to parse data",
            _ => "Failed to query record",
        };
        Self::Internal { message, source }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(message) => Self::BadRequest(message),
            other => Self::Internal {
                message: "Internal server error",
                source: other,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => {
                debug!("Rejected request: {}", message);
                (StatusCode::BAD_REQUEST, message)
            }
            Self::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE.to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, "Device status not found".to_string()),
            Self::Internal { message, source } => {
                error!("API error: {}: {}", message, source);
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
