use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::fmt;

lazy_static! {
    /// Trailing commas before } or ]
    static ref TRAILING_COMMA_RE: Regex = Regex::new(r",(\s*[}\]])").unwrap();

    /// JavaScript string concatenation ("str1" + "str2")
    static ref JS_STRING_CONCAT_RE: Regex = Regex::new(r#""\s*\+\s*""#).unwrap();
}

/// Why a model response could not be turned into the target type.
///
/// The message is fed back to the model verbatim during the fixing pass, so it
/// carries serde's own diagnostics (field names, line/column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: String,
}

impl ParseFailure {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Pull the JSON object out of a model response.
///
/// Accepts, in order: a ```json fenced block, any fenced block, a bare object,
/// or the outermost `{ ... }` span embedded in prose.
pub fn extract_json_string(text: &str) -> Result<&str, ParseFailure> {
    if let Some(after) = text.split("```json").nth(1) {
        let body = after.split("```").next().unwrap_or(after);
        return Ok(body.trim());
    }

    if let Some(start) = text.find("```") {
        let block_start = start + 3;
        if let Some(newline_offset) = text[block_start..].find('\n') {
            let body_start = block_start + newline_offset + 1;
            if let Some(end_offset) = text[body_start..].find("```") {
                return Ok(text[body_start..body_start + end_offset].trim());
            }
        }
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return Ok(trimmed);
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        (None, _) => Err(ParseFailure::new("No JSON object found in response")),
        _ => Err(ParseFailure::new("Incomplete JSON object in response")),
    }
}

/// Fix trailing commas in JSON (common LLM mistake)
///
/// Example: `{"name": "John",}` -> `{"name": "John"}`
pub fn fix_trailing_commas(json_str: &str) -> String {
    TRAILING_COMMA_RE.replace_all(json_str, "$1").to_string()
}

/// Merge `"a" + "b"` into `"ab"`
pub fn fix_js_string_concatenation(json_str: &str) -> String {
    JS_STRING_CONCAT_RE.replace_all(json_str, "").to_string()
}

fn repair_json(json_str: &str) -> Option<String> {
    let options = llm_json::RepairOptions::default();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        llm_json::repair_json(json_str, &options)
    }));

    match result {
        Ok(Ok(repaired)) => Some(repaired),
        Ok(Err(e)) => {
            tracing::debug!("JSON repair failed: {:?}", e);
            None
        }
        Err(_) => {
            tracing::warn!("JSON repair panicked");
            None
        }
    }
}

/// Parse a model response into `T`.
///
/// Pipeline: extract → direct parse → quick fixes → `llm_json` repair. When
/// every stage fails the serde error from the direct attempt is returned,
/// since it describes the model's actual output rather than a repaired guess.
pub fn parse_llm_json<T: DeserializeOwned>(text: &str) -> Result<T, ParseFailure> {
    let json_str = extract_json_string(text)?;

    let direct_error = match serde_json::from_str::<T>(json_str) {
        Ok(parsed) => return Ok(parsed),
        Err(e) => e,
    };

    let fixed = fix_trailing_commas(&fix_js_string_concatenation(json_str));
    if let Ok(parsed) = serde_json::from_str::<T>(&fixed) {
        tracing::debug!("LLM JSON parsed after quick fixes");
        return Ok(parsed);
    }

    if let Some(repaired) = repair_json(json_str) {
        if let Ok(parsed) = serde_json::from_str::<T>(&repaired) {
            tracing::debug!("LLM JSON parsed after llm_json repair");
            return Ok(parsed);
        }
    }

    Err(ParseFailure::new(format!(
        "Response is not valid JSON for the expected schema: {}",
        direct_error
    )))
}
