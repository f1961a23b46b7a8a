use minijinja::context;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::error::{AppError, Result};
use crate::shared::llm::client::LlmClient;
use crate::shared::llm::parser::parse_llm_json;
use crate::shared::llm::response::LlmOutput;
use crate::shared::templates::render_template;

const FIX_OUTPUT_TEMPLATE: &str = "prompts/fix_output.jinja";

const FIXER_SYSTEM_PROMPT: &str =
    "You repair malformed JSON produced by another model. Reply with the corrected JSON only.";

/// Calls the model and turns its reply into a validated `T`.
///
/// A reply that fails parsing or `validate_output` gets exactly one fixing
/// call; transport errors are returned immediately.
#[derive(Clone)]
pub struct StructuredGenerator {
    client: Arc<dyn LlmClient>,
}

impl StructuredGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub async fn generate<T: LlmOutput>(&self, system: &str, user: &str) -> Result<T> {
        self.generate_checked(system, user, |_: &T| Ok(())).await
    }

    /// Like [`generate`](Self::generate), with an extra request-specific check
    /// (e.g. the number of questions asked for) that also triggers the fixer.
    pub async fn generate_checked<T, F>(&self, system: &str, user: &str, check: F) -> Result<T>
    where
        T: LlmOutput,
        F: Fn(&T) -> std::result::Result<(), String> + Send + Sync,
    {
        let raw = self.client.complete(system, user).await?;

        let error = match decode::<T>(&raw).and_then(|v| check(&v).map(|_| v)) {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        warn!("LLM output rejected, running fixer: {}", error);

        let fix_prompt = render_template(
            FIX_OUTPUT_TEMPLATE,
            context! {
                original_output => raw,
                error => error,
                schema => T::json_schema_string(),
            },
        )?;

        let fixed = self.client.complete(FIXER_SYSTEM_PROMPT, &fix_prompt).await?;

        match decode::<T>(&fixed).and_then(|v| check(&v).map(|_| v)) {
            Ok(value) => {
                info!("LLM output accepted after fixer pass");
                Ok(value)
            }
            Err(second_error) => Err(AppError::ExternalServiceError(format!(
                "AI returned invalid output: {}",
                second_error
            ))),
        }
    }
}

fn decode<T: LlmOutput>(raw: &str) -> std::result::Result<T, String> {
    let value: T = parse_llm_json(raw).map_err(|e| e.message)?;
    value.validate_output()?;
    Ok(value)
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedLlm;
    use super::*;
    use crate::shared::llm::client::LlmError;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Glossary {
        terms: Vec<String>,
    }

    impl LlmOutput for Glossary {
        fn validate_output(&self) -> std::result::Result<(), String> {
            if self.terms.len() != 2 {
                return Err(format!("expected 2 terms, got {}", self.terms.len()));
            }
            Ok(())
        }
    }

    fn generator(llm: &Arc<ScriptedLlm>) -> StructuredGenerator {
        StructuredGenerator::new(llm.clone())
    }

    #[tokio::test]
    async fn test_valid_first_output_skips_fixer() {
        let llm = Arc::new(ScriptedLlm::ok(&[r#"{"terms": ["atom", "ion"]}"#]));
        let result: Glossary = generator(&llm).generate("sys", "user").await.unwrap();
        assert_eq!(result.terms, vec!["atom", "ion"]);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_then_fixed_output_uses_two_calls() {
        let llm = Arc::new(ScriptedLlm::ok(&[
            r#"{"terms": ["atom"]}"#,
            "```json\n{\"terms\": [\"atom\", \"ion\"]}\n```",
        ]));
        let result: Glossary = generator(&llm).generate("sys", "user").await.unwrap();
        assert_eq!(result.terms.len(), 2);
        assert_eq!(llm.calls(), 2);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[1].contains("expected 2 terms, got 1"));
        assert!(prompts[1].contains(r#"{"terms": ["atom"]}"#));
    }

    #[tokio::test]
    async fn test_two_invalid_outputs_fail_after_two_calls() {
        let llm = Arc::new(ScriptedLlm::ok(&["not json at all", "still not json"]));
        let result = generator(&llm).generate::<Glossary>("sys", "user").await;
        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_request_check_failure_goes_through_fixer() {
        let llm = Arc::new(ScriptedLlm::ok(&[
            r#"{"terms": ["atom", "ion"]}"#,
            r#"{"terms": ["atom", "cation"]}"#,
        ]));
        let result: Glossary = generator(&llm)
            .generate_checked("sys", "user", |g: &Glossary| {
                if g.terms.iter().any(|t| t == "cation") {
                    Ok(())
                } else {
                    Err("must mention cation".to_string())
                }
            })
            .await
            .unwrap();
        assert_eq!(result.terms[1], "cation");
        assert_eq!(llm.calls(), 2);
        assert!(llm.prompts.lock().unwrap()[1].contains("must mention cation"));
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(LlmError::Request(
            "connection reset".to_string(),
        ))]));
        let result = generator(&llm).generate::<Glossary>("sys", "user").await;
        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
        assert_eq!(llm.calls(), 1);
    }
}
