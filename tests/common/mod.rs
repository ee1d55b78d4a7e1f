#![allow(dead_code)]

use async_trait::async_trait;
use lex_relay::config::RelayConfig;
use lex_relay::llm::chat::{ CompletionProvider, CompletionRequest, ProviderError };
use lex_relay::llm::{ LlmConfig, ReasoningEffort };
use lex_relay::server::api::{ router, AppState };
use std::net::SocketAddr;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex };
use std::time::Duration;
use tokio::net::TcpListener;

/// In-process stand-in for the completion provider.
pub struct StubProvider {
    reply: Result<String, String>,
    delay: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl StubProvider {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(text: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            delay,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(message) =>
                Err(ProviderError::Api {
                    status: 429,
                    message: message.clone(),
                }),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}

pub fn config_with_key() -> RelayConfig {
    RelayConfig {
        llm: LlmConfig {
            api_key: Some("sk-test".to_string()),
            model: "gpt-test".to_string(),
            effort: ReasoningEffort::High,
            ..LlmConfig::default()
        },
        ..RelayConfig::default()
    }
}

pub fn state_with(config: RelayConfig, stub: &Arc<StubProvider>) -> AppState {
    let provider: Arc<dyn CompletionProvider> = stub.clone();
    AppState::new(config, Some(provider))
}

/// Serves the relay router on an ephemeral local port.
pub async fn spawn_relay(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.expect("relay should serve");
    });
    addr
}
