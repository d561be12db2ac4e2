//! Extraction and validation of structured data from generator output.
//!
//! Text-generation backends are asked for JSON but routinely wrap it in
//! markdown fences or surround it with prose. Everything a synthesizer
//! returns passes through here first: the output either becomes a valid,
//! schema-conformant value or the stage fails with `MalformedOutput`.
//!
//! The candidate object is the span from the first `{` to the last `}`.
//! This is a substring heuristic rather than a JSON-aware scanner, so output
//! containing several top-level objects, or a fence marker inside a string
//! literal, can be mis-extracted.

use serde::de::DeserializeOwned;

use crate::error::PipelineError;

/// Shape checks applied after a typed decode succeeds.
pub trait Validate {
    /// Return a description of the first violated constraint, if any.
    fn validate(&self) -> Result<(), String>;
}

/// Extract the JSON object embedded in raw generator output.
///
/// Fails on absent or blank input, when no `{...}` span exists, and when the
/// span does not parse. Never returns an empty placeholder value.
pub fn extract_json<'a>(raw: impl Into<Option<&'a str>>) -> Result<serde_json::Value, PipelineError> {
    let raw = match raw.into() {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(PipelineError::malformed("generator returned empty output")),
    };

    let cleaned = strip_code_fences(raw);
    let candidate = object_span(&cleaned)
        .ok_or_else(|| PipelineError::malformed("no JSON object found in generator output"))?;

    serde_json::from_str(candidate)
        .map_err(|e| PipelineError::malformed(format!("JSON parse error: {}", e)))
}

/// Extract, decode into `T` and validate generator output.
///
/// Missing fields, wrong types and enum values outside the allowed set are
/// all reported as `MalformedOutput`, the same as unparseable text.
pub fn parse_structured<T>(raw: &str) -> Result<T, PipelineError>
where
    T: DeserializeOwned + Validate,
{
    let value = extract_json(raw)?;
    let parsed: T = serde_json::from_value(value)
        .map_err(|e| PipelineError::malformed(format!("schema mismatch: {}", e)))?;
    parsed
        .validate()
        .map_err(|reason| PipelineError::malformed(format!("schema violation: {}", reason)))?;
    Ok(parsed)
}

/// Remove markdown code-fence markers (```` ```json ```` and ```` ``` ````).
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Inclusive span from the first `{` to the last `}`.
fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
