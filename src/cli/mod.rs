use clap::Parser;

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8787";
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the relay to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = DEFAULT_SERVER_ADDR)]
    pub server_addr: String,

    /// Largest accepted /chat body in bytes. The client resends the whole transcript every turn.
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Optional API key callers must present (Authorization: Bearer or x-api-key). Unset means open access.
    #[arg(long, env = "SERVER_API_KEY")]
    pub server_api_key: Option<String>,

    /// Requests per second admitted to /chat across all callers. 0 disables throttling.
    #[arg(long, env = "RATE_LIMIT_PER_SECOND", default_value = "0")]
    pub rate_limit_per_second: u32,

    // --- Completion Provider Args ---
    /// API key for the completion provider. The relay still starts without it but /chat answers 500.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL for the provider API (the /responses route is appended).
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Model name for chat completion (e.g., gpt-5-mini, gpt-4o)
    #[arg(long, env = "CHAT_MODEL", default_value = "gpt-5-mini")]
    pub chat_model: String,

    /// Reasoning effort tier (minimal, low, medium, high)
    #[arg(long, env = "REASONING_EFFORT", default_value = "low")]
    pub reasoning_effort: String,

    /// Upper bound in seconds on a single provider call.
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value = "60")]
    pub provider_timeout_secs: u64,

    /// Optional path to a text file replacing the built-in system directive.
    #[arg(long, env = "SYSTEM_PROMPT_PATH")]
    pub system_prompt_path: Option<String>,

    // --- TLS Args ---
    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}
