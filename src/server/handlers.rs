use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
};
use serde::Serialize;
use tracing::error;

use crate::html_template::get_map_html;
use crate::mapper::{DepthColor, DEPTH_BANDS};
use crate::processing::{Marker, ProcessingSummary};

use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct LegendEntry {
    pub color: DepthColor,
    pub label: &'static str,
    pub low_km: Option<f64>,
    pub high_km: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub feed_url: String,
    #[serde(flatten)]
    pub summary: ProcessingSummary,
}

pub(crate) fn internal_error(e: anyhow::Error) -> StatusCode {
    error!("Request failed: {:#}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}

pub async fn index_html(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    get_map_html(&state.settings).map_err(internal_error)
}

// Markers in feed order
pub async fn get_markers(State(state): State<AppState>) -> Json<Vec<Marker>> {
    Json(state.marker_set.markers.clone())
}

pub async fn get_legend() -> Json<Vec<LegendEntry>> {
    let entries = DEPTH_BANDS
        .iter()
        .map(|band| LegendEntry {
            color: band.color,
            label: band.label,
            low_km: band.low_km,
            high_km: band.high_km,
        })
        .collect();
    Json(entries)
}

pub async fn get_summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    Json(SummaryResponse {
        feed_url: state.settings.feed_url.clone(),
        summary: state.marker_set.summary.clone(),
    })
}
