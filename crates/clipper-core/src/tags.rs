//! Tag normalization.
//!
//! Every tag stored on a clip is lowercase, trimmed and unique. These helpers
//! are the only way tags enter a [`Clip`](crate::Clip), including on
//! deserialization of persisted data.

use serde::{Deserialize, Deserializer};

use crate::defaults;

/// Normalize a single tag. Returns `None` for blank input.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().to_lowercase();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

/// Normalize a tag list, keeping first-appearance order and dropping blanks
/// and duplicates.
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: Vec<String> = Vec::new();
    for item in raw {
        if let Some(tag) = normalize_tag(item.as_ref()) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

/// Pad `tags` with filler tags until `min` exist.
///
/// Fillers already present are skipped so the list stays unique.
pub fn pad_with_fillers(tags: &mut Vec<String>, min: usize) {
    for filler in defaults::FILLER_TAGS {
        if tags.len() >= min {
            break;
        }
        if !tags.iter().any(|t| t == filler) {
            tags.push(filler.to_string());
        }
    }
}

/// Serde helper: deserialize a tag list through [`normalize_tags`].
///
/// Accepts `null` as an empty list.
pub fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTags {
        List(Vec<String>),
        Joined(String),
    }

    let tags = match Option::<RawTags>::deserialize(deserializer)? {
        Some(RawTags::List(tags)) => normalize_tags(tags),
        Some(RawTags::Joined(joined)) => normalize_tags(joined.split(',')),
        None => Vec::new(),
    };
    Ok(tags)
}
