use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };

use super::{ CompletionProvider, CompletionRequest, ProviderError };
use crate::llm::{ LlmConfig, ReasoningEffort };

pub struct OpenAIResponsesClient {
    http: HttpClient,
    base_url: String,
}

#[derive(Serialize)]
struct ResponsesInput<'a> {
    role: String,
    content: &'a str,
}

#[derive(Serialize)]
struct Reasoning {
    effort: ReasoningEffort,
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<ResponsesInput<'a>>,
    reasoning: Reasoning,
}

#[derive(Deserialize, Debug, Default)]
struct ResponsesResponse {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize, Debug)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Deserialize, Debug)]
struct OutputContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

impl<'a> ResponsesRequest<'a> {
    fn from_completion(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            input: request.messages
                .iter()
                .map(|m| ResponsesInput { role: m.role.to_string(), content: &m.content })
                .collect(),
            reasoning: Reasoning { effort: request.effort },
        }
    }
}

impl ResponsesResponse {
    fn into_text(self) -> String {
        if let Some(text) = self.output_text {
            return text;
        }
        self.output
            .into_iter()
            .flat_map(|item| item.content)
            .filter(|c| c.content_type == "output_text")
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().to_string(),
    }
}

impl OpenAIResponsesClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        timeout: std::time::Duration
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
                ProviderError::Config(format!("Invalid API key format: {}", e))
            )?
        );

        let http = HttpClient::builder().default_headers(headers).timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .credential()
            .ok_or_else(|| ProviderError::Config("OpenAI API key is required".to_string()))?;
        Self::new(api_key, &config.base_url, config.timeout)
    }

    fn endpoint(&self) -> String {
        if self.base_url.ends_with("/responses") {
            self.base_url.clone()
        } else {
            format!("{}/responses", self.base_url)
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAIResponsesClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let body = ResponsesRequest::from_completion(&request);

        let resp = self.http.post(self.endpoint()).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!("Provider responded with status {} ({} bytes)", status, text.len());

        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        let parsed: ResponsesResponse = serde_json::from_str(&text)?;
        Ok(parsed.into_text())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
