//! Message classification with a guaranteed label.
//!
//! The gateway is asked for a deterministic JSON verdict. Whatever happens on the way back
//! (transport failure, non-JSON text, a payload of the wrong shape) the caller still gets a
//! [`ClassificationResult`]: those cases fall back to `Query` with an "unavailable" rationale.
//! The only error returned is `TriageError::InvalidInput` for an empty message.

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    base::types::{ClassificationLabel, ClassificationResult, Err, Res, TriageError},
    service::llm::{ChatTurn, CompletionRequest, LlmClient},
};

/// Rationale used when the classifier could not produce a verdict.
pub const FALLBACK_RATIONALE: &str = "Classifier unavailable; routing to query handler.";

/// Rationale used when the model omits one.
pub const MISSING_RATIONALE: &str = "No rationale provided by model.";

/// What came back from the gateway, before label normalization.
#[derive(Debug)]
enum ClassifierReply {
    /// A JSON object; the label is still raw model text.
    Payload { label: String, rationale: Option<String> },
    /// The gateway call itself failed.
    GatewayFailure(Err),
    /// The gateway answered, but not with a JSON object.
    MalformedPayload(String),
}

/// Classify a customer message into exactly one label.
///
/// `directive` is the system instruction fixing the task; see
/// [`CLASSIFIER_SYSTEM_DIRECTIVE`](crate::base::prompts::CLASSIFIER_SYSTEM_DIRECTIVE).
#[instrument(name = "classifier::classify", skip_all, fields(model = %model, trace_id = trace_id.unwrap_or_default()))]
pub async fn classify(llm: &LlmClient, directive: &str, message: &str, model: &str, trace_id: Option<&str>) -> Res<ClassificationResult> {
    let text = message.trim();

    if text.is_empty() {
        return Err(TriageError::InvalidInput("Message must be a non-empty string.".to_string()).into());
    }

    let request = CompletionRequest {
        model: model.to_string(),
        temperature: Some(0.0),
        json_output: true,
        max_tokens: None,
        turns: vec![ChatTurn::system(directive), ChatTurn::user(text)],
    };

    let (label, rationale) = match request_classification(llm, &request).await {
        ClassifierReply::Payload { label, rationale } => {
            let label = ClassificationLabel::from_model_output(&label);
            let rationale = rationale.filter(|r| !r.trim().is_empty()).unwrap_or_else(|| MISSING_RATIONALE.to_string());

            (label, rationale)
        }
        ClassifierReply::GatewayFailure(err) => {
            warn!("Classifier gateway failure, defaulting to query: {err}");

            (ClassificationLabel::Query, FALLBACK_RATIONALE.to_string())
        }
        ClassifierReply::MalformedPayload(reason) => {
            warn!("Classifier returned a malformed payload, defaulting to query: {reason}");

            (ClassificationLabel::Query, FALLBACK_RATIONALE.to_string())
        }
    };

    let rationale = match trace_id {
        Some(trace_id) => format!("{rationale} trace_id={trace_id}"),
        None => rationale,
    };

    info!("Classified message as `{label}`.");

    Ok(ClassificationResult { label, rationale: Some(rationale) })
}

/// Call the gateway and sort the outcome into a typed reply.
async fn request_classification(llm: &LlmClient, request: &CompletionRequest) -> ClassifierReply {
    match llm.complete(request).await {
        Ok(raw) => parse_classification_payload(&raw),
        Err(err) => ClassifierReply::GatewayFailure(err),
    }
}

/// Parse the model's JSON verdict.
///
/// A non-string label is stringified (and will normalize to `Query`); a missing one is empty.
fn parse_classification_payload(raw: &str) -> ClassifierReply {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => return ClassifierReply::MalformedPayload(format!("not JSON: {err}")),
    };

    let Some(object) = value.as_object() else {
        return ClassifierReply::MalformedPayload("not a JSON object".to_string());
    };

    let label = match object.get("label") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(label)) => label.clone(),
        Some(other) => other.to_string(),
    };

    let rationale = object.get("rationale").and_then(Value::as_str).map(str::to_string);

    ClassifierReply::Payload { label, rationale }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use mockall::mock;

    use super::*;
    use crate::{base::prompts::CLASSIFIER_SYSTEM_DIRECTIVE, service::llm::GenericLlmClient};

    mock! {
        pub Llm {}

        #[async_trait]
        impl GenericLlmClient for Llm {
            async fn complete(&self, request: &CompletionRequest) -> Res<String>;
        }
    }

    fn llm_replying(reply: &'static str) -> LlmClient {
        let mut mock = MockLlm::new();
        mock.expect_complete().returning(move |_| Ok(reply.to_string()));

        LlmClient::new(Arc::new(mock))
    }

    fn llm_failing() -> LlmClient {
        let mut mock = MockLlm::new();
        mock.expect_complete().returning(|_| Err(TriageError::GatewayUnavailable("connection refused".to_string()).into()));

        LlmClient::new(Arc::new(mock))
    }

    async fn classify_with(llm: &LlmClient, message: &str, trace_id: Option<&str>) -> Res<ClassificationResult> {
        classify(llm, CLASSIFIER_SYSTEM_DIRECTIVE, message, "gpt-4o-mini", trace_id).await
    }

    #[tokio::test]
    async fn test_empty_message_is_invalid_input() {
        let mut mock = MockLlm::new();
        mock.expect_complete().never();
        let llm = LlmClient::new(Arc::new(mock));

        for message in ["", "   ", "\n\t"] {
            let err = classify_with(&llm, message, None).await.unwrap_err();
            assert!(matches!(err.downcast_ref::<TriageError>(), Some(TriageError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn test_request_shape() {
        let mut mock = MockLlm::new();
        mock.expect_complete()
            .withf(|request| {
                request.model == "gpt-4o-mini"
                    && request.temperature == Some(0.0)
                    && request.json_output
                    && request.turns.len() == 2
                    && request.turns[0] == ChatTurn::system(CLASSIFIER_SYSTEM_DIRECTIVE)
                    && request.turns[1] == ChatTurn::user("I love the app")
            })
            .times(1)
            .returning(|_| Ok(r#"{"label": "positive_feedback", "rationale": "Praise."}"#.to_string()));
        let llm = LlmClient::new(Arc::new(mock));

        let result = classify_with(&llm, "  I love the app \n", None).await.unwrap();

        assert_eq!(result.label, ClassificationLabel::PositiveFeedback);
        assert_eq!(result.rationale.as_deref(), Some("Praise."));
    }

    #[tokio::test]
    async fn test_labels_are_normalized() {
        let cases = [
            (r#"{"label": "Positive"}"#, ClassificationLabel::PositiveFeedback),
            (r#"{"label": "POS"}"#, ClassificationLabel::PositiveFeedback),
            (r#"{"label": "Negative Feedback"}"#, ClassificationLabel::NegativeFeedback),
            (r#"{"label": "NEG"}"#, ClassificationLabel::NegativeFeedback),
            (r#"{"label": "question"}"#, ClassificationLabel::Query),
            (r#"{"label": ""}"#, ClassificationLabel::Query),
            (r#"{"label": 42}"#, ClassificationLabel::Query),
            (r#"{"rationale": "no label"}"#, ClassificationLabel::Query),
        ];

        for (reply, expected) in cases {
            let result = classify_with(&llm_replying(reply), "hello", None).await.unwrap();
            assert_eq!(result.label, expected, "{reply}");
        }
    }

    #[tokio::test]
    async fn test_missing_rationale_is_filled_in() {
        let result = classify_with(&llm_replying(r#"{"label": "neg"}"#), "card declined again", None).await.unwrap();

        assert_eq!(result.label, ClassificationLabel::NegativeFeedback);
        assert_eq!(result.rationale.as_deref(), Some(MISSING_RATIONALE));
    }

    #[tokio::test]
    async fn test_gateway_failure_falls_back_to_query() {
        let result = classify_with(&llm_failing(), "Where is my card?", Some("abc-123")).await.unwrap();

        let rationale = result.rationale.unwrap();
        assert_eq!(result.label, ClassificationLabel::Query);
        assert!(rationale.contains("unavailable"));
        assert!(rationale.ends_with("abc-123"));
    }

    #[tokio::test]
    async fn test_malformed_payload_falls_back_to_query() {
        for reply in ["not json at all", "[\"positive\"]", "\"positive\"", ""] {
            let result = classify_with(&llm_replying(reply), "Thanks!", None).await.unwrap();

            assert_eq!(result.label, ClassificationLabel::Query, "{reply}");
            assert_eq!(result.rationale.as_deref(), Some(FALLBACK_RATIONALE));
        }
    }

    #[tokio::test]
    async fn test_trace_id_is_appended_without_affecting_label() {
        let reply = r#"{"label": "positive", "rationale": "Happy customer."}"#;

        let result = classify_with(&llm_replying(reply), "Great service", Some("trace-9")).await.unwrap();

        assert_eq!(result.label, ClassificationLabel::PositiveFeedback);
        assert_eq!(result.rationale.as_deref(), Some("Happy customer. trace_id=trace-9"));
    }
}
