use schemars::gen::SchemaGenerator;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// Trait for structured values produced by the LLM.
///
/// Deserialization checks the shape; `validate_output` checks the rules serde
/// cannot express (counts, option lists, answer membership). Either failure
/// sends the raw output through one output-fixing pass.
pub trait LlmOutput: DeserializeOwned + JsonSchema {
    /// Semantic checks applied after successful deserialization
    fn validate_output(&self) -> Result<(), String> {
        Ok(())
    }

    /// Generate JSON schema string for use in LLM prompts
    fn json_schema_string() -> String {
        let mut gen = SchemaGenerator::default();
        let schema = gen.root_schema_for::<Self>();
        serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
    }
}
