pub mod prompt;

use std::net::{ Ipv4Addr, SocketAddr };
use std::time::Duration;
use thiserror::Error;

use crate::cli::{ Args, DEFAULT_MAX_BODY_BYTES };
use crate::llm::{ LlmConfig, ParseEffortError };
use self::prompt::{ PromptError, SystemPrompt };

/// Name of the provider credential as it appears in error bodies.
pub const CREDENTIAL_NAME: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server address '{addr}': {source}")]
    Addr {
        addr: String,
        source: std::net::AddrParseError,
    },
    #[error(transparent)]
    Effort(#[from] ParseEffortError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("TLS is enabled but {0} is not set")]
    Tls(&'static str),
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

/// Everything the relay reads from the environment, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub addr: SocketAddr,
    pub llm: LlmConfig,
    pub system_prompt: SystemPrompt,
    pub server_api_key: Option<String>,
    pub rate_limit_per_second: u32,
    pub max_body_bytes: usize,
    pub tls: Option<TlsConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8787)),
            llm: LlmConfig::default(),
            system_prompt: SystemPrompt::default(),
            server_api_key: None,
            rate_limit_per_second: 0,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            tls: None,
        }
    }
}

impl RelayConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let addr = args.server_addr
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::Addr { addr: args.server_addr.clone(), source })?;

        let llm = LlmConfig {
            api_key: args.openai_api_key.clone(),
            model: args.chat_model.clone(),
            base_url: args.openai_base_url.clone(),
            effort: args.reasoning_effort.parse()?,
            timeout: Duration::from_secs(args.provider_timeout_secs.max(1)),
        };

        let tls = if args.enable_tls {
            let cert_path = args.tls_cert_path.clone().ok_or(ConfigError::Tls("TLS_CERT_PATH"))?;
            let key_path = args.tls_key_path.clone().ok_or(ConfigError::Tls("TLS_KEY_PATH"))?;
            Some(TlsConfig { cert_path, key_path })
        } else {
            None
        };

        Ok(Self {
            addr,
            llm,
            system_prompt: SystemPrompt::from_optional_path(args.system_prompt_path.as_deref())?,
            server_api_key: args.server_api_key.clone().filter(|k| !k.trim().is_empty()),
            rate_limit_per_second: args.rate_limit_per_second,
            max_body_bytes: args.max_body_bytes,
            tls,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.llm.credential().is_some()
    }
}
