//! Resilient parsing of model replies into summary and tags.
//!
//! Models asked for JSON still sometimes wrap it in prose or code fences. The
//! reply is parsed strictly first; failing that, the span from the first `{`
//! to the last `}` is parsed once more.

use serde_json::Value as JsonValue;

use clipper_core::{Error, RemoteAnnotation, Result};

/// Parse a JSON object out of `content`, recovering from surrounding text.
pub fn extract_json_object(content: &str) -> Result<JsonValue> {
    let content = content.trim();
    if let Ok(value @ JsonValue::Object(_)) = serde_json::from_str::<JsonValue>(content) {
        return Ok(value);
    }

    let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) else {
        return Err(Error::AnnotationParse(
            "No JSON object in model reply".to_string(),
        ));
    };
    if end <= start {
        return Err(Error::AnnotationParse(
            "No JSON object in model reply".to_string(),
        ));
    }

    match serde_json::from_str::<JsonValue>(&content[start..=end]) {
        Ok(value @ JsonValue::Object(_)) => Ok(value),
        Ok(_) => Err(Error::AnnotationParse(
            "Model reply is not a JSON object".to_string(),
        )),
        Err(e) => Err(Error::AnnotationParse(format!(
            "Invalid JSON in model reply: {}",
            e
        ))),
    }
}

/// Parse a model reply into a [`RemoteAnnotation`].
///
/// `summary` must be a string; `tags` may be a list of strings or a single
/// comma-separated string, and is optional. Tags are returned raw; the
/// resolver normalizes them.
pub fn parse_annotation(content: &str) -> Result<RemoteAnnotation> {
    let value = extract_json_object(content)?;

    let summary = match value.get("summary") {
        Some(JsonValue::String(s)) => s.trim().to_string(),
        _ => {
            return Err(Error::AnnotationParse(
                "Model reply has no summary string".to_string(),
            ))
        }
    };

    let tags = match value.get("tags") {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|t| t.as_str().map(str::to_string))
            .collect(),
        Some(JsonValue::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };

    Ok(RemoteAnnotation { summary, tags })
}
