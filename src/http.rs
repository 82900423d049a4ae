//! JSON/HTTP surface over the [`Engine`].
//!
//! | Method | Path                  | Engine call            |
//! |--------|-----------------------|------------------------|
//! | GET    | `/api/tables`         | `list_tables`          |
//! | GET    | `/api/availability`   | `availability`         |
//! | GET    | `/api/recommendation` | `recommend`            |
//! | POST   | `/api/reservations`   | `create_reservation`   |

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{MatchedPath, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use ulid::Ulid;

use crate::engine::{Engine, EngineError};
use crate::limits::MAX_FEATURE_TOKENS;
use crate::model::*;
use crate::observability::{REQUESTS_TOTAL, REQUEST_DURATION_SECONDS};

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/api/tables", get(list_tables))
        .route("/api/availability", get(availability))
        .route("/api/recommendation", get(recommendation))
        .route("/api/reservations", post(create_reservation))
        .route_layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// Serve files under `dir` for every path no API route matches.
/// Directory requests resolve to their `index.html`.
pub fn with_static_files(router: Router, dir: &Path) -> Router {
    router.fallback_service(ServeDir::new(dir))
}

// ── Handlers ────────────────────────────────────────────────────

async fn list_tables(
    State(engine): State<Arc<Engine>>,
) -> Result<Json<Vec<DiningTable>>, EngineError> {
    Ok(Json(engine.list_tables().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotParams {
    date: Option<String>,
    time: Option<String>,
    party_size: Option<String>,
    zone: Option<String>,
    features: Option<String>,
}

struct Slot {
    date: NaiveDate,
    time: NaiveTime,
    party_size: u32,
    zone: Option<Zone>,
}

impl SlotParams {
    fn slot(&self) -> Result<Slot, EngineError> {
        Ok(Slot {
            date: parse_date(required(&self.date, "date")?)?,
            time: parse_time(required(&self.time, "time")?)?,
            party_size: parse_party_size(required(&self.party_size, "partySize")?)?,
            zone: parse_zone(self.zone.as_deref())?,
        })
    }
}

async fn availability(
    State(engine): State<Arc<Engine>>,
    params: Result<Query<SlotParams>, QueryRejection>,
) -> Result<Json<Vec<TableAvailability>>, EngineError> {
    let Query(params) = params.map_err(|e| EngineError::InvalidInput(e.body_text()))?;
    let slot = params.slot()?;
    let tables = engine
        .availability(slot.date, slot.time, slot.party_size, slot.zone)
        .await?;
    Ok(Json(tables))
}

async fn recommendation(
    State(engine): State<Arc<Engine>>,
    params: Result<Query<SlotParams>, QueryRejection>,
) -> Result<Json<Recommendation>, EngineError> {
    let Query(params) = params.map_err(|e| EngineError::InvalidInput(e.body_text()))?;
    let slot = params.slot()?;
    let features = parse_features(params.features.as_deref())?;
    let rec = engine
        .recommend(slot.date, slot.time, slot.party_size, slot.zone, &features)
        .await?;
    Ok(Json(rec))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateReservationRequest {
    table_id: String,
    date: String,
    time: String,
    party_size: i64,
}

async fn create_reservation(
    State(engine): State<Arc<Engine>>,
    body: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<StatusCode, EngineError> {
    let Json(req) = body.map_err(|e| EngineError::InvalidInput(e.body_text()))?;
    let table_id: Ulid = req
        .table_id
        .trim()
        .parse()
        .map_err(|_| EngineError::InvalidInput(format!("invalid tableId: {}", req.table_id)))?;
    let date = parse_date(&req.date)?;
    let time = parse_time(&req.time)?;
    // Non-positive sizes clamp to 0, which the engine rejects after the table lookup.
    let party_size = req.party_size.clamp(0, u32::MAX as i64) as u32;

    engine
        .create_reservation(table_id, date, time, party_size)
        .await?;
    Ok(StatusCode::OK)
}

// ── Parameter parsing ───────────────────────────────────────────

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, EngineError> {
    value
        .as_deref()
        .ok_or_else(|| EngineError::InvalidInput(format!("missing parameter: {name}")))
}

/// `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| EngineError::InvalidInput(format!("invalid date (want YYYY-MM-DD): {s}")))
}

/// `HH:mm`, or `HH:mm:ss`.
pub fn parse_time(s: &str) -> Result<NaiveTime, EngineError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| EngineError::InvalidInput(format!("invalid time (want HH:mm): {s}")))
}

pub fn parse_party_size(s: &str) -> Result<u32, EngineError> {
    let n: i64 = s
        .trim()
        .parse()
        .map_err(|_| EngineError::InvalidInput(format!("invalid partySize: {s}")))?;
    if n <= 0 {
        return Err(EngineError::InvalidInput("partySize must be positive".into()));
    }
    u32::try_from(n).map_err(|_| EngineError::InvalidInput(format!("partySize too large: {n}")))
}

/// Absent or blank means no zone filter.
pub fn parse_zone(s: Option<&str>) -> Result<Option<Zone>, EngineError> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(z) => z.parse().map(Some).map_err(EngineError::InvalidInput),
    }
}

/// Comma-separated, trimmed, case-insensitive. Blank tokens are skipped;
/// any unknown token rejects the whole list.
pub fn parse_features(s: Option<&str>) -> Result<BTreeSet<Feature>, EngineError> {
    let Some(s) = s else {
        return Ok(BTreeSet::new());
    };
    let tokens: Vec<&str> = s.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
    if tokens.len() > MAX_FEATURE_TOKENS {
        return Err(EngineError::LimitExceeded("too many features"));
    }
    tokens
        .into_iter()
        .map(|t| t.parse::<Feature>().map_err(EngineError::InvalidInput))
        .collect()
}

// ── Errors & metrics ────────────────────────────────────────────

impl EngineError {
    pub fn status(&self) -> StatusCode {
        match self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::CapacityExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::SlotTaken(_) | EngineError::AlreadyExists(_) => StatusCode::CONFLICT,
            EngineError::InvalidInput(_) | EngineError::LimitExceeded(_) => StatusCode::BAD_REQUEST,
            EngineError::WalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".into());
    let started = Instant::now();
    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(REQUESTS_TOTAL, "route" => route.clone(), "status" => status).increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "route" => route)
        .record(started.elapsed().as_secs_f64());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_trimmed_case_insensitive() {
        let f = parse_features(Some(" window, Quiet ,,kids_near")).unwrap();
        assert_eq!(
            f,
            BTreeSet::from([Feature::Window, Feature::Quiet, Feature::KidsNear])
        );
        assert!(parse_features(None).unwrap().is_empty());
        assert!(parse_features(Some("  ")).unwrap().is_empty());
    }

    #[test]
    fn unknown_feature_rejects_list() {
        assert!(matches!(
            parse_features(Some("WINDOW,balcony")),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn duplicate_features_collapse() {
        let f = parse_features(Some("window,WINDOW")).unwrap();
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn too_many_feature_tokens() {
        let many = vec!["QUIET"; MAX_FEATURE_TOKENS + 1].join(",");
        assert!(matches!(
            parse_features(Some(&many)),
            Err(EngineError::LimitExceeded(_))
        ));
    }

    #[test]
    fn party_size_must_be_positive() {
        assert_eq!(parse_party_size("4").unwrap(), 4);
        assert!(parse_party_size("0").is_err());
        assert!(parse_party_size("-2").is_err());
        assert!(parse_party_size("four").is_err());
        assert!(parse_party_size("99999999999").is_err());
    }

    #[test]
    fn date_and_time_formats() {
        assert_eq!(
            parse_date("2026-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        assert!(parse_date("01.03.2026").is_err());
        assert!(parse_date("2026-02-30").is_err());

        assert_eq!(parse_time("18:30").unwrap(), NaiveTime::from_hms_opt(18, 30, 0).unwrap());
        assert_eq!(parse_time("18:30:00").unwrap(), NaiveTime::from_hms_opt(18, 30, 0).unwrap());
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("6pm").is_err());
    }

    #[test]
    fn zone_blank_means_any() {
        assert_eq!(parse_zone(None).unwrap(), None);
        assert_eq!(parse_zone(Some("")).unwrap(), None);
        assert_eq!(parse_zone(Some("terrace")).unwrap(), Some(Zone::Terrace));
        assert!(parse_zone(Some("ROOFTOP")).is_err());
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(EngineError::NotFound(Ulid::nil()).status(), StatusCode::NOT_FOUND);
        assert_eq!(EngineError::SlotTaken(Ulid::nil()).status(), StatusCode::CONFLICT);
        assert_eq!(
            EngineError::CapacityExceeded { party_size: 5, capacity: 4 }.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(EngineError::InvalidInput("x".into()).status(), StatusCode::BAD_REQUEST);
    }
}
