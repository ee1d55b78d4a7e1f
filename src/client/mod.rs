pub mod transcript;

use std::future::Future;
use std::time::Duration;
use log::debug;
use reqwest::{ header::AUTHORIZATION, Client as HttpClient };
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::models::{ ChatMessage, ChatRequest, HealthResponse, Role };
pub use self::transcript::Transcript;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(
        "No response from the relay within {}s. Check your network connection and the server address.",
        .after.as_secs_f32()
    )]
    Timeout {
        after: Duration,
    },
    #[error("Request cancelled")]
    Cancelled,
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Relay responded with HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("Unexpected response from the relay: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Role '{0}' cannot be sent by the client")]
    InvalidRole(Role),
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }
}

#[derive(Deserialize)]
struct SuccessBody {
    #[serde(default)]
    text: Option<String>,
}

/// Runs `fut` until it finishes, `cancel` fires, or `timeout` elapses.
/// The future is dropped on the losing branches, which aborts any request it owns.
pub async fn run_bounded<F, T>(
    fut: F,
    timeout: Duration,
    cancel: &CancellationToken
) -> Result<T, ClientError>
    where F: Future<Output = Result<T, ClientError>>
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        _ = tokio::time::sleep(timeout) => Err(ClientError::Timeout { after: timeout }),
        res = fut => res,
    }
}

#[derive(Debug, Clone)]
pub struct RelayClientBuilder {
    base_url: String,
    timeout: Duration,
    api_key: Option<String>,
}

impl RelayClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn build(self) -> Result<RelayClient, ClientError> {
        let mut base = Url::parse(self.base_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(RelayClient {
            http: HttpClient::builder().build()?,
            chat_url: base.join("chat")?,
            health_url: base.join("health")?,
            timeout: self.timeout,
            api_key: self.api_key,
        })
    }
}

/// Talks to the relay. Holds no conversation state; see [`Transcript`].
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: HttpClient,
    chat_url: Url,
    health_url: Url,
    timeout: Duration,
    api_key: Option<String>,
}

impl RelayClient {
    pub fn builder(base_url: impl Into<String>) -> RelayClientBuilder {
        RelayClientBuilder {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            api_key: None,
        }
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder(base_url).build()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn send(&self, messages: &[ChatMessage]) -> Result<String, ClientError> {
        self.send_with_cancel(messages, CancellationToken::new()).await
    }

    pub async fn send_with_cancel(
        &self,
        messages: &[ChatMessage],
        cancel: CancellationToken
    ) -> Result<String, ClientError> {
        if let Some(m) = messages.iter().find(|m| m.role == Role::Developer) {
            return Err(ClientError::InvalidRole(m.role));
        }
        let body = ChatRequest::new(messages.to_vec());
        debug!("Sending {} message(s) to {}", body.messages.len(), self.chat_url);

        run_bounded(self.post_chat(&body), self.timeout, &cancel).await
    }

    /// Appends `text` as a user turn, sends the transcript and records the reply.
    /// On failure the user turn is removed again so it can be resent as-is.
    pub async fn send_turn(
        &self,
        transcript: &mut Transcript,
        text: &str
    ) -> Result<String, ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        transcript.push_user(text);
        match self.send(transcript.messages()).await {
            Ok(reply) => {
                // a blank assistant turn would make the next request invalid
                if !reply.is_empty() {
                    transcript.push_assistant(reply.clone());
                }
                Ok(reply)
            }
            Err(e) => {
                transcript.rollback_user();
                Err(e)
            }
        }
    }

    pub async fn health(&self) -> Result<bool, ClientError> {
        let fut = async {
            let resp = self.http.get(self.health_url.clone()).send().await?;
            let status = resp.status();
            let text = resp.text().await?;
            if !status.is_success() {
                return Err(ClientError::Status { status: status.as_u16(), body: text });
            }
            Ok::<bool, ClientError>(serde_json::from_str::<HealthResponse>(&text)?.ok)
        };
        run_bounded(fut, self.timeout, &CancellationToken::new()).await
    }

    async fn post_chat(&self, body: &ChatRequest) -> Result<String, ClientError> {
        let mut req = self.http.post(self.chat_url.clone()).json(body);
        if let Some(key) = &self.api_key {
            req = req.header(AUTHORIZATION, format!("Bearer {}", key));
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status: status.as_u16(), body: text });
        }

        let parsed: SuccessBody = serde_json::from_str(&text)?;
        Ok(parsed.text.unwrap_or_default().trim().to_string())
    }
}
