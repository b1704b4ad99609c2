use std::io::ErrorKind;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::process::Command;

use crate::admin::AdminState;

#[derive(Debug, Serialize)]
pub struct AdminReply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdminReply {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            error: None,
        }
    }
}

/// Run the configured restart command and report its output.
pub async fn restart_browser(State(state): State<AdminState>) -> (StatusCode, Json<AdminReply>) {
    let process = &state.config.process_name;
    let Some((program, args)) = state.config.restart_command.split_first() else {
        tracing::error!("No restart command configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AdminReply::message(format!("Failed to restart {process}."))),
        );
    };

    tracing::info!(process = %process, program = %program, "Restarting browser");

    let output = match Command::new(program).args(args).output().await {
        Ok(output) => output,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::error!(program = %program, "Restart command not found");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdminReply::message(format!("{program} command not found."))),
            );
        }
        Err(e) => {
            tracing::error!(program = %program, error = %e, "Failed to run restart command");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdminReply {
                    error: Some(e.to_string()),
                    ..AdminReply::message(format!("Failed to restart {process}."))
                }),
            );
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.status.success() {
        tracing::info!(process = %process, "Browser restart initiated");
        (
            StatusCode::OK,
            Json(AdminReply {
                details: Some(stdout),
                ..AdminReply::message(format!("{process} restart initiated."))
            }),
        )
    } else {
        tracing::error!(process = %process, status = %output.status, stderr = %stderr.trim_end(), "Browser restart failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AdminReply {
                error: Some(stderr),
                ..AdminReply::message(format!("Failed to restart {process}."))
            }),
        )
    }
}

pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(AdminReply::message("Method Not Allowed. Use POST.")),
    )
        .into_response()
}

/// Only POST is served: any other method is a wrong method, a POST that
/// misses is an unknown endpoint.
pub async fn fallback(method: Method) -> Response {
    if method != Method::POST {
        return method_not_allowed().await;
    }
    (
        StatusCode::NOT_FOUND,
        Json(AdminReply::message("Endpoint not found. Use POST /restart-chromium.")),
    )
        .into_response()
}
