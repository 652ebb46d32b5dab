use axum::{extract::State, Json};
use serde::Serialize;

use crate::lifecycle::startup::ServerContext;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub server_name: String,
    pub state: &'static str,
    pub config_generation: u64,
    pub active_connections: u64,
    pub per_user_ports: Vec<String>,
}

/// Reload the configuration and report the outcome as plain text.
pub async fn reload(State(ctx): State<ServerContext>) -> String {
    if ctx.shutdown.is_shutting_down() {
        return "Error reloading configuration: server is shutting down\n".to_string();
    }

    match ctx.reloader.reload().await {
        Ok(report) => {
            let mut body = String::from("Reloaded configuration\n");
            for failure in &report.sink_failures {
                body.push_str(&format!("Warning: {failure}\n"));
            }
            body
        }
        Err(e) => format!("Error reloading configuration: {e}\n"),
    }
}

pub async fn get_status(State(ctx): State<ServerContext>) -> Json<SystemStatus> {
    let server_name = ctx
        .config
        .current()
        .map(|c| c.server_name.clone())
        .unwrap_or_default();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        server_name,
        state: ctx.shutdown.state().as_str(),
        config_generation: ctx.config.generation(),
        active_connections: ctx.shutdown.active_work(),
        per_user_ports: ctx
            .ports
            .open_ports()
            .into_iter()
            .map(|addr| addr.to_string())
            .collect(),
    })
}
