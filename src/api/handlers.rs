//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{error, info};

use crate::state::{AppState, Settings, SettingsPatch, TimerState};
use super::responses::{ApiResponse, HealthResponse, StatusResponse};

fn status_view(state: &AppState, timer: &TimerState) -> Result<StatusResponse, StatusCode> {
    let settings = state.get_settings().map_err(|e| {
        error!("Failed to get settings: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(StatusResponse::new(timer, &settings))
}

/// Handle POST /toggle - Start or pause the countdown
pub async fn toggle_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    match state.toggle() {
        Ok(timer) => {
            let message = if timer.is_active { "Timer started" } else { "Timer paused" };
            info!("Toggle endpoint called - {}", message.to_lowercase());
            let view = status_view(&state, &timer)?;
            Ok(Json(ApiResponse::for_timer(message.to_string(), view)))
        }
        Err(e) => {
            error!("Failed to toggle timer: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /skip - Move to the next phase immediately
pub async fn skip_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    match state.skip() {
        Ok(timer) => {
            info!("Skip endpoint called - now in {}", timer.mode.label());
            let view = status_view(&state, &timer)?;
            Ok(Json(ApiResponse::for_timer(
                format!("Skipped to {}", timer.mode.label()),
                view,
            )))
        }
        Err(e) => {
            error!("Failed to skip phase: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /status - Return what a renderer needs
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let timer = match state.get_timer_state() {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to get timer state: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    Ok(Json(status_view(&state, &timer)?))
}

/// Handle GET /settings - Return the current settings
pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> Result<Json<Settings>, StatusCode> {
    match state.get_settings() {
        Ok(settings) => Ok(Json(settings)),
        Err(e) => {
            error!("Failed to get settings: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle PUT /settings - Apply a partial update, clamping out-of-range values
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<Settings>, StatusCode> {
    match state.update_settings(&patch) {
        Ok(settings) => {
            info!("Settings endpoint called - settings updated");
            Ok(Json(settings))
        }
        Err(e) => {
            error!("Failed to update settings: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (last_action, last_action_time) = state.get_last_action();
    Json(HealthResponse::ok(state.get_uptime(), last_action, last_action_time))
}
