//! HTTP surface
//!
//! Five GET endpoints over the shared [`AppState`]:
//!
//! | Route         | Report                              |
//! |---------------|-------------------------------------|
//! | `/penalty`    | per-date termination penalties      |
//! | `/vested`     | daily vested-funds series           |
//! | `/dailyfee`   | reference daily fees                |
//! | `/spdailyfee` | per-SP fee total and projection     |
//! | `/faultfee`   | standalone 32 GiB fault fee         |
//!
//! The default response is `text/plain` CSV (or a formatted table on the
//! fee routes). `json=1` switches to the `{code, msg, data}` envelope.
//! Errors carry HTTP 400 (caller) or 500 (upstream/internal) in both modes;
//! the envelope repeats the status in its `code` field.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use sectorfee_core::epoch::DateMapper;
use sectorfee_core::error::EconError;
use sectorfee_core::types::MinerId;
use sectorfee_core::version::VersionSchedule;
use sectorfee_economics::dailyfee::FEE_RENDER_DIGITS;
use sectorfee_economics::report::{daily_fee_text, sp_fee_text, vesting_csv};
use sectorfee_state::StateAdapter;

use crate::compute;

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<dyn StateAdapter>,
    pub mapper: DateMapper,
    pub versions: VersionSchedule,
}

/// Uniform JSON envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: u16,
    pub msg: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            code: 200,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    fn err(code: u16, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

fn fail(json_mode: bool, code: u16, msg: String) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if json_mode {
        (status, Json(ApiResponse::<()>::err(code, msg))).into_response()
    } else {
        (status, msg).into_response()
    }
}

fn econ_fail(json_mode: bool, err: &EconError) -> Response {
    tracing::warn!(error = %err, "request failed");
    fail(json_mode, err.status_code(), err.to_string())
}

fn missing_miner(json_mode: bool) -> Response {
    fail(json_mode, 400, "please specify a miner".to_string())
}

fn plain(body: String) -> Response {
    ([(CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

/// Lenient boolean flag: absent or unparsable means false
fn parse_flag(value: &Option<String>) -> bool {
    match value.as_deref() {
        Some(s) => matches!(s, "1" | "t" | "T" | "true" | "TRUE" | "True"),
        None => false,
    }
}

/// Lenient day offset: absent or unparsable means zero
fn parse_offset(value: &Option<String>) -> i64 {
    value
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn require_miner(raw: &Option<String>, json_mode: bool) -> Result<MinerId, Response> {
    let Some(raw) = raw.as_deref() else {
        return Err(missing_miner(json_mode));
    };
    MinerId::parse(raw).map_err(|e| econ_fail(json_mode, &e))
}

#[derive(Debug, Deserialize)]
pub struct PenaltyQuery {
    miner: Option<String>,
    all: Option<String>,
    offset: Option<String>,
    json: Option<String>,
}

pub async fn penalty(
    State(state): State<AppState>,
    Query(q): Query<PenaltyQuery>,
) -> Response {
    let json_mode = parse_flag(&q.json);
    let miner = match require_miner(&q.miner, json_mode) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    let report = compute::penalty_report(
        state.adapter.as_ref(),
        &state.mapper,
        &state.versions,
        &miner,
        parse_flag(&q.all),
        parse_offset(&q.offset),
    )
    .await;

    match report {
        // JSON omits the totals row; CSV carries it in-band
        Ok(report) if json_mode => Json(ApiResponse::ok(report.rows)).into_response(),
        Ok(report) => plain(report.to_csv()),
        Err(e) => econ_fail(json_mode, &e),
    }
}

#[derive(Debug, Deserialize)]
pub struct VestedQuery {
    miner: Option<String>,
    offset: Option<String>,
    json: Option<String>,
}

pub async fn vested(
    State(state): State<AppState>,
    Query(q): Query<VestedQuery>,
) -> Response {
    let json_mode = parse_flag(&q.json);
    let miner = match require_miner(&q.miner, json_mode) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    let rows = compute::vested_report(
        state.adapter.as_ref(),
        &state.mapper,
        &miner,
        parse_offset(&q.offset),
        Utc::now(),
    )
    .await;

    match rows {
        Ok(rows) if json_mode => Json(ApiResponse::ok(rows)).into_response(),
        Ok(rows) => plain(vesting_csv(&rows)),
        Err(e) => econ_fail(json_mode, &e),
    }
}

#[derive(Debug, Deserialize)]
pub struct DailyFeeQuery {
    json: Option<String>,
}

pub async fn dailyfee(
    State(state): State<AppState>,
    Query(q): Query<DailyFeeQuery>,
) -> Response {
    let json_mode = parse_flag(&q.json);
    match compute::daily_fee(state.adapter.as_ref()).await {
        Ok((head, supply, quote)) if json_mode => Json(ApiResponse::ok(json!({
            "height": head.epoch,
            "timestamp": head.timestamp,
            "circulating": supply.format_units(0),
            "fees": quote,
        })))
        .into_response(),
        Ok((head, supply, quote)) => plain(daily_fee_text(&head, &supply, &quote)),
        Err(e) => econ_fail(json_mode, &e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SpDailyFeeQuery {
    miner: Option<String>,
    json: Option<String>,
}

pub async fn spdailyfee(
    State(state): State<AppState>,
    Query(q): Query<SpDailyFeeQuery>,
) -> Response {
    let json_mode = parse_flag(&q.json);
    let miner = match require_miner(&q.miner, json_mode) {
        Ok(m) => m,
        Err(resp) => return resp,
    };

    match compute::sp_daily_fee(state.adapter.as_ref(), &miner).await {
        Ok((head, summary)) if json_mode => Json(ApiResponse::ok(json!({
            "height": head.epoch,
            "timestamp": head.timestamp,
            "miner": miner.to_string(),
            "summary": summary,
        })))
        .into_response(),
        Ok((head, summary)) => plain(sp_fee_text(&head, &miner, &summary)),
        Err(e) => econ_fail(json_mode, &e),
    }
}

#[derive(Debug, Deserialize)]
pub struct FaultFeeQuery {
    miner: Option<String>,
    json: Option<String>,
}

pub async fn faultfee(
    State(state): State<AppState>,
    Query(q): Query<FaultFeeQuery>,
) -> Response {
    let json_mode = parse_flag(&q.json);
    // the fee is quoted for a nominal sector; the miner is validated only
    if let Err(resp) = require_miner(&q.miner, json_mode) {
        return resp;
    }

    match compute::fault_fee(state.adapter.as_ref()).await {
        Ok(fee) if json_mode => {
            Json(ApiResponse::ok(fee.format_units(FEE_RENDER_DIGITS))).into_response()
        }
        Ok(fee) => plain(format!("{} FIL\n", fee.format_units(FEE_RENDER_DIGITS))),
        Err(e) => econ_fail(json_mode, &e),
    }
}

pub async fn health() -> &'static str {
    "ok"
}
