
use std::time::{Duration, Instant};

use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;

use super::{ChatMessage, ContextItem, GeneratedAnswer, GenerationRequest, Generator, StudentProfile};
use crate::RagError;
use crate::config::{GenerationConfig, Provider};

const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const NOT_SPECIFIED: &str = "Not specified";

/// Blocking client for OpenAI-compatible chat-completions endpoints.
///
/// Requests go through [`ureq`]; the async [`Generator`] implementation moves
/// each call onto the blocking thread pool.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    endpoint: Url,
    provider: Provider,
    model: String,
    api_key: Option<String>,
    institution: String,
    temperature: f32,
    max_tokens: u32,
    agent: ureq::Agent,
    timeout: Duration,
    retry_attempts: u32,
    backoff_base: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

impl ChatCompletionClient {
    /// Build a client from configuration. The API key is read from the
    /// provider's environment variable; a missing key only fails at request time.
    #[inline]
    pub fn new(config: &GenerationConfig) -> Result<Self, RagError> {
        let endpoint = config.endpoint_url()?;

        Ok(Self {
            endpoint,
            provider: config.provider,
            model: config.model().to_string(),
            api_key: config.api_key(),
            institution: config.institution.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            agent: build_agent(config.timeout()),
            timeout: config.timeout(),
            retry_attempts: config.retry_attempts.max(1),
            backoff_base: DEFAULT_BACKOFF_BASE,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self.timeout = timeout;
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    #[inline]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    /// Delay before the first retry; later retries double it
    #[inline]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    #[inline]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat-completion request, blocking the current thread.
    ///
    /// With a deadline on the request, each attempt's timeout is cut to the time
    /// left and no retry starts once the deadline would be crossed.
    #[inline]
    pub fn complete(&self, request: &GenerationRequest) -> Result<GeneratedAnswer, RagError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(RagError::Generation(format!(
                "{} API key not configured (set {})",
                self.provider.as_str().to_uppercase(),
                self.provider.api_key_env()
            )));
        };

        let system_prompt =
            build_system_prompt(&self.institution, &request.context, request.profile.as_ref());

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(request.messages.iter().cloned());

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let body = serde_json::to_string(&body)
            .map_err(|e| RagError::Generation(format!("Failed to serialize request: {e}")))?;

        debug!(
            "Requesting completion from {} ({} messages, {} context documents)",
            self.provider,
            request.messages.len(),
            request.context.len()
        );

        let authorization = format!("Bearer {api_key}");
        let response_text = self.make_request_with_retry(request.deadline, |attempt_timeout| {
            let mut response = self
                .agent
                .post(self.endpoint.as_str())
                .config()
                .timeout_global(Some(attempt_timeout))
                .build()
                .header("Content-Type", "application/json")
                .header("Authorization", &authorization)
                .send(&body)?;
            let status = response.status().as_u16();
            let text = response.body_mut().read_to_string()?;
            Ok((status, text))
        })?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Generation(format!("Failed to parse completion response: {e}")))?;

        let usage = response.usage;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::Generation("Completion response had no content".to_string()))?;

        info!("Received completion from {} model {}", self.provider, self.model);

        Ok(GeneratedAnswer {
            content,
            model: self.model.clone(),
            provider: self.provider.to_string(),
            usage,
        })
    }

    fn make_request_with_retry<F>(
        &self,
        deadline: Option<Instant>,
        mut request_fn: F,
    ) -> Result<String, RagError>
    where
        F: FnMut(Duration) -> Result<(u16, String), ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            let attempt_timeout = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        warn!("Deadline passed before attempt {}", attempt);
                        break;
                    }
                    remaining.min(self.timeout)
                }
                None => self.timeout,
            };

            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            let error = match request_fn(attempt_timeout) {
                Ok((status, body)) if (200..300).contains(&status) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(body);
                }
                Ok((status, body)) => {
                    let message = upstream_error_message(status, &body);
                    if status >= 500 || status == 429 {
                        warn!(
                            "Upstream error (status {}), attempt {}/{}",
                            status, attempt, self.retry_attempts
                        );
                        RagError::Generation(message)
                    } else {
                        warn!("Client error (status {}), not retrying", status);
                        return Err(RagError::Generation(message));
                    }
                }
                Err(
                    error @ (ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_)),
                ) => {
                    warn!(
                        "Transport error: {}, attempt {}/{}",
                        error, attempt, self.retry_attempts
                    );
                    RagError::Generation(format!("Request error: {error}"))
                }
                Err(error) => {
                    warn!("Non-retryable error: {}", error);
                    return Err(RagError::Generation(format!("Non-retryable error: {error}")));
                }
            };

            last_error = Some(error);

            if attempt < self.retry_attempts {
                let delay = self.backoff_base.saturating_mul(2_u32.saturating_pow(attempt - 1));
                if deadline.is_some_and(|deadline| {
                    Instant::now().checked_add(delay).is_none_or(|resume| resume >= deadline)
                }) {
                    warn!("No time left to retry after attempt {}", attempt);
                    break;
                }
                debug!("Waiting {:?} before retry", delay);
                std::thread::sleep(delay);
            }
        }

        error!("All retry attempts failed for request to {}", self.endpoint);

        Err(last_error.unwrap_or_else(|| {
            RagError::Generation("Deadline passed before the request was sent".to_string())
        }))
    }
}

fn upstream_error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body).map_or_else(
        |_| format!("API request failed: {status}"),
        |response| response.error.message,
    )
}

#[async_trait]
impl Generator for ChatCompletionClient {
    #[inline]
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedAnswer, RagError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.complete(&request))
            .await
            .map_err(|e| RagError::Generation(format!("Generation task failed: {e}")))?
    }
}

/// Assemble the system prompt: assistant rules, the student profile when one
/// is given, and the retrieved documents as `[Document i] CATEGORY` blocks.
#[inline]
pub fn build_system_prompt(
    institution: &str,
    context: &[ContextItem],
    profile: Option<&StudentProfile>,
) -> String {
    let mut prompt = format!(
        "You are CampusGuide, the official digital assistant for {institution}.\n\n\
         Answer as the institution's own help desk: professional, friendly, structured and precise.\n\n\
         Response format:\n\
         [Answer] A clear, direct response to the question.\n\
         [Steps] Numbered steps with locations and timings, when an action is required.\n\
         [Important] Deadlines, eligibility criteria or warnings, when applicable.\n\
         [Contact] The relevant office or department, when applicable.\n\n\
         Knowledge priority:\n\
         1. Retrieved documents from the knowledge base come first.\n\
         2. Fall back to general knowledge only when nothing was retrieved.\n\
         3. Never invent facts. Ask for clarification when unsure.\n"
    );

    if let Some(profile) = profile {
        let field = |value: &Option<String>| value.as_deref().unwrap_or(NOT_SPECIFIED).to_string();
        let section = format!(
            "\nStudent profile:\n- Branch: {}\n- Year: {}\n- Accommodation: {}\n",
            field(&profile.branch),
            field(&profile.year),
            field(&profile.accommodation)
        );
        prompt.push_str(&section);
    }

    if !context.is_empty() {
        prompt.push_str("\nRetrieved knowledge (use this as the primary source):\n");
        let documents = context
            .iter()
            .enumerate()
            .map(|(i, item)| {
                format!(
                    "\n[Document {}] {}\n{}\n",
                    i + 1,
                    item.category.to_uppercase(),
                    item.content
                )
            })
            .join("");
        prompt.push_str(&documents);
    }

    prompt.push_str(
        "\nRules:\n\
         - No generic disclaimers and no \"as an AI\" phrases.\n\
         - If the answer is not in the retrieved documents, say so and name the office to contact.\n\
         - Personalize the answer using the student profile when available.\n\
         - Be concise but complete.\n",
    );

    prompt
}
