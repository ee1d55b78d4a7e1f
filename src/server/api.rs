use std::num::NonZeroU32;
use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{ rejection::BytesRejection, DefaultBodyLimit, State },
    http::{ header::AUTHORIZATION, HeaderMap, StatusCode },
    routing::{ get, post },
    Json,
    Router,
};
use governor::{ DefaultDirectRateLimiter, Quota, RateLimiter };
use tower::ServiceBuilder;
use tower_http::cors::{ Any, CorsLayer };
use log::{ debug, error, warn };
use sha2::{ Digest, Sha256 };

use super::error::RelayError;
use crate::config::{ RelayConfig, CREDENTIAL_NAME };
use crate::llm::chat::{ new_provider, CompletionProvider, CompletionRequest, ProviderError };
use crate::models::{ ChatRequest, ChatResponse, HealthResponse };

/// Shared, read-only per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<RelayConfig>,
    provider: Option<Arc<dyn CompletionProvider>>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl AppState {
    pub fn new(config: RelayConfig, provider: Option<Arc<dyn CompletionProvider>>) -> Self {
        let limiter = NonZeroU32::new(config.rate_limit_per_second).map(|n|
            Arc::new(RateLimiter::direct(Quota::per_second(n)))
        );
        Self {
            config: Arc::new(config),
            provider,
            limiter,
        }
    }

    /// Builds the provider from the config. A missing credential is not an error here.
    pub fn from_config(config: RelayConfig) -> Result<Self, ProviderError> {
        let provider = new_provider(&config.llm)?;
        Ok(Self::new(config, provider))
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(state.config.max_body_bytes);

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(ServiceBuilder::new().layer(cors).layer(body_limit))
        .with_state(state)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

fn caller_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some((scheme, token)) = value.trim().split_once(' ') {
            if scheme.eq_ignore_ascii_case("bearer") {
                return Some(token.trim());
            }
        }
    }
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// Compares digests so the time taken does not depend on where the keys differ.
fn keys_match(presented: &str, required: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(required.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>
) -> Result<Json<ChatResponse>, RelayError> {
    if let Some(required) = state.config.server_api_key.as_deref() {
        if !caller_key(&headers).is_some_and(|k| keys_match(k, required)) {
            return Err(RelayError::Unauthorized);
        }
    }

    let provider = state.provider
        .as_ref()
        .filter(|_| state.config.has_credential())
        .ok_or(RelayError::MissingCredential(CREDENTIAL_NAME))?;

    let body = body.map_err(|rejection| {
        warn!("Rejected /chat body: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            RelayError::PayloadTooLarge
        } else {
            RelayError::InvalidMessages
        }
    })?;

    let request = serde_json
        ::from_slice::<ChatRequest>(&body)
        .ok()
        .filter(ChatRequest::is_valid)
        .ok_or(RelayError::InvalidMessages)?;

    // only requests that would reach the provider spend quota
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            return Err(RelayError::RateLimited);
        }
    }

    debug!("Relaying {} message(s) to {}", request.messages.len(), provider.name());

    let completion = CompletionRequest {
        model: state.config.llm.model.clone(),
        messages: state.config.system_prompt.apply(request.messages),
        effort: state.config.llm.effort,
    };

    match provider.complete(completion).await {
        Ok(text) => Ok(Json(ChatResponse::text(text))),
        Err(e) => {
            error!("Provider call failed: {}", e);
            Err(RelayError::from(e))
        }
    }
}
