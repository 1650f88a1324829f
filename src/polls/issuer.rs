//! Code Issuer
//!
//! Minimal HTTP surface for obtaining anonymous vote codes out-of-band.
//! Two GET routes: one lists a poll's options, the other redeems an option
//! for a one-time code together with the exact chat command to cast it.
//! Holds no state of its own; every outcome comes from the poll store.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::PollServiceConfig;
use crate::polls::store::{PollError, PollStore};

/// Code issuer errors
#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    #[error("Bind error: {0}")]
    Bind(String),
    #[error("Server error: {0}")]
    Serve(String),
}

/// Body of the options-listing route
#[derive(Debug, Serialize, Deserialize)]
pub struct OptionsResponse {
    pub options: Vec<String>,
}

/// Build the issuer router under the configured path prefix
pub fn router(prefix: &str, store: Arc<PollStore>) -> Router {
    let prefix = prefix.trim_end_matches('/');
    Router::new()
        .route(&format!("{prefix}/{{id}}"), get(get_options))
        .route(&format!("{prefix}/{{id}}/{{answer}}"), get(get_code))
        .with_state(store)
}

/// Bind the configured address and serve the issuer routes until the
/// process shuts down
pub async fn serve(config: &PollServiceConfig, store: Arc<PollStore>) -> Result<(), IssuerError> {
    let addr = format!("{}:{}", config.bind_host, config.bind_port);
    let app = router(config.normalized_prefix(), store);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| IssuerError::Bind(e.to_string()))?;
    tracing::info!(address = %addr, prefix = %config.normalized_prefix(), "code issuer listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| IssuerError::Serve(e.to_string()))
}

/// `GET {prefix}/{id}` - list a poll's options
async fn get_options(State(store): State<Arc<PollStore>>, Path(id): Path<String>) -> Response {
    match store.options(&id) {
        Ok(options) => Json(OptionsResponse { options }).into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

/// `GET {prefix}/{id}/{answer}` - mint a code bound to `answer`
async fn get_code(
    State(store): State<Arc<PollStore>>,
    Path((id, answer)): Path<(String, String)>,
) -> Response {
    match store.issue_code(&id, &answer) {
        Ok(code) => (
            StatusCode::OK,
            format!(
                "Your answer code is {code}. \
                 Now in order to use it to vote in this poll, send this to the chat:\n\
                 %poll {id} {code}\n"
            ),
        )
            .into_response(),
        Err(PollError::InvalidOption { .. }) => {
            let available = store
                .options(&id)
                .map(|options| options.join(", "))
                .unwrap_or_default();
            (
                StatusCode::BAD_REQUEST,
                format!("Invalid answer. Available options: {available}."),
            )
                .into_response()
        }
        Err(err) => error_response(err).into_response(),
    }
}

/// Map store outcomes to response status and body
fn error_response(err: PollError) -> (StatusCode, String) {
    let status = match &err {
        PollError::NotFound { .. } => StatusCode::NOT_FOUND,
        PollError::TooManyParticipants => StatusCode::FORBIDDEN,
        PollError::RandomSource(_) => {
            tracing::error!(error = %err, "code generation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    };
    (status, format!("{err}."))
}
