//! Integration with Large Language Model services.
//!
//! This module provides a thin wrapper around the OpenAI chat completions API
//! that implements the `GenericLlmClient` gateway. It does not retry: the client's
//! built-in backoff is disabled, so a failed call is reported once as
//! `TriageError::GatewayUnavailable` and the caller decides what to do with it.

use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs, CreateChatCompletionResponse, ResponseFormat,
    },
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::base::{
    config::Config,
    types::{Res, TriageError},
};

use super::{ChatTurn, CompletionRequest, GenericLlmClient, LlmClient, Role};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    /// Build the process-wide OpenAI gateway handle.
    ///
    /// Fails with `TriageError::Configuration` when no API key is configured.
    pub fn openai(config: &Config) -> Res<Self> {
        let client = OpenAiLlmClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    timeout: Duration,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Res<Self> {
        let mut cfg = OpenAIConfig::new().with_api_key(config.require_openai_api_key()?);

        if let Some(base_url) = config.openai_base_url.as_deref().filter(|url| !url.trim().is_empty()) {
            debug!("Using alternate OpenAI endpoint `{base_url}`.");
            cfg = cfg.with_api_base(base_url);
        }

        // A zero elapsed-time budget turns the client's retry loop into a single attempt.
        let no_retries = ExponentialBackoffBuilder::new().with_max_elapsed_time(Some(Duration::ZERO)).build();

        Ok(Self {
            client: Client::with_config(cfg).with_backoff(no_retries),
            timeout: Duration::from_secs(config.openai_timeout_secs),
        })
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::complete", skip_all, fields(model = %request.model, json_output = request.json_output))]
    async fn complete(&self, request: &CompletionRequest) -> Res<String> {
        let messages = request.turns.iter().map(to_openai_message).collect::<Vec<_>>();

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&request.model).messages(messages);

        if let Some(temperature) = request.temperature {
            args.temperature(temperature);
        }

        if let Some(max_tokens) = request.max_tokens {
            args.max_completion_tokens(max_tokens);
        }

        if request.json_output {
            args.response_format(ResponseFormat::JsonObject);
        }

        let args = args.build()?;

        let response = match timeout(self.timeout, self.client.chat().create(args)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!("OpenAI API call failed: {err}");
                return Err(TriageError::GatewayUnavailable(format!("OpenAI API call failed: {err}")).into());
            }
            Err(_) => {
                warn!("OpenAI API call timed out after {:?}", self.timeout);
                return Err(TriageError::GatewayUnavailable(format!("OpenAI API call timed out after {:?}", self.timeout)).into());
            }
        };

        parse_openai_response(&response)
    }
}

/// Convert a gateway turn into an OpenAI chat message.
fn to_openai_message(turn: &ChatTurn) -> ChatCompletionRequestMessage {
    match turn.role {
        Role::System => ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
            content: ChatCompletionRequestSystemMessageContent::Text(turn.content.clone()),
            name: None,
        }),
        Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(turn.content.clone()),
            name: None,
        }),
    }
}

/// Pull the text of the first choice out of a completion.
#[instrument(skip_all)]
pub fn parse_openai_response(response: &CreateChatCompletionResponse) -> Res<String> {
    let Some(choice) = response.choices.first() else {
        return Err(TriageError::GatewayUnavailable("OpenAI returned no choices.".to_string()).into());
    };

    if let Some(refusal) = &choice.message.refusal {
        return Err(TriageError::GatewayUnavailable(format!("Request refused: {refusal}")).into());
    }

    match &choice.message.content {
        Some(content) if !content.trim().is_empty() => Ok(content.clone()),
        _ => Err(TriageError::GatewayUnavailable("OpenAI returned an empty completion.".to_string()).into()),
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;
    use crate::base::config::ConfigInner;

    fn create_unreachable_config() -> Config {
        Config::from(ConfigInner {
            openai_api_key: Some("sk-test".to_string()),
            // Nothing listens on the discard port.
            openai_base_url: Some("http://127.0.0.1:9/v1".to_string()),
            openai_timeout_secs: 5,
            ..Default::default()
        })
    }

    fn create_test_request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            temperature: Some(0.0),
            json_output: true,
            max_tokens: Some(64),
            turns: vec![ChatTurn::system("Classify."), ChatTurn::user("Hello")],
        }
    }

    #[test]
    fn test_openai_requires_api_key() {
        let config = Config::from(ConfigInner::default());

        let err = LlmClient::openai(&config).err().unwrap();
        assert!(matches!(err.downcast_ref::<TriageError>(), Some(TriageError::Configuration(_))));
    }

    #[test]
    fn test_to_openai_message_roles() {
        assert!(matches!(to_openai_message(&ChatTurn::system("s")), ChatCompletionRequestMessage::System(_)));
        assert!(matches!(to_openai_message(&ChatTurn::user("u")), ChatCompletionRequestMessage::User(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_gateway_unavailable() {
        let client = LlmClient::openai(&create_unreachable_config()).unwrap();

        let err = client.complete(&create_test_request()).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<TriageError>(), Some(TriageError::GatewayUnavailable(_))));
    }

    /// Serve HTTP 500 to every request on a local port, counting the requests.
    async fn spawn_failing_endpoint() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };

                let counter = counter.clone();
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    let mut chunk = [0u8; 4096];

                    // Read the headers, then as much body as they announce.
                    loop {
                        let Ok(read) = socket.read(&mut chunk).await else { return };
                        if read == 0 {
                            return;
                        }
                        buffer.extend_from_slice(&chunk[..read]);

                        let text = String::from_utf8_lossy(&buffer);
                        if let Some(end) = text.find("\r\n\r\n") {
                            let length = text[..end]
                                .lines()
                                .find_map(|line| line.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0)))
                                .unwrap_or(0);

                            if buffer.len() >= end + 4 + length {
                                break;
                            }
                        }
                    }

                    counter.fetch_add(1, Ordering::SeqCst);

                    let body = r#"{"error":{"message":"upstream exploded","type":"server_error","param":null,"code":null}}"#;
                    let response = format!(
                        "HTTP/1.1 500 Internal Server Error\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{address}/v1"), requests)
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let (base_url, requests) = spawn_failing_endpoint().await;

        let config = Config::from(ConfigInner {
            openai_api_key: Some("sk-test".to_string()),
            openai_base_url: Some(base_url),
            openai_timeout_secs: 10,
            ..Default::default()
        });
        let client = LlmClient::openai(&config).unwrap();

        let started = std::time::Instant::now();
        let err = client.complete(&create_test_request()).await.unwrap_err();

        assert!(matches!(err.downcast_ref::<TriageError>(), Some(TriageError::GatewayUnavailable(_))));
        assert!(!err.to_string().contains("timed out"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(5));

        // Give a stray retry the chance to land before counting.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_openai_response_empty_choices() {
        let response: CreateChatCompletionResponse = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 0,
            "model": "gpt-4o-mini",
            "choices": []
        }))
        .unwrap();

        let err = parse_openai_response(&response).unwrap_err();
        assert!(matches!(err.downcast_ref::<TriageError>(), Some(TriageError::GatewayUnavailable(_))));
    }

    #[test]
    fn test_parse_openai_response_text() {
        let response: CreateChatCompletionResponse = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-2",
            "object": "chat.completion",
            "created": 0,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "{\"label\":\"query\"}" },
                "finish_reason": "stop"
            }]
        }))
        .unwrap();

        assert_eq!(parse_openai_response(&response).unwrap(), "{\"label\":\"query\"}");
    }
}
