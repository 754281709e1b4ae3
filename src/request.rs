//! Prompt input and per-prompt outcome types.
//!
//! This module defines the record returned for every prompt of a batch and
//! the accepted shapes of prompt input files.

use crate::client::{MAX_ERROR_CHARS, truncate_chars};
use crate::error::{ProviderError, Result, ShopfrontError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Result of generating one image.
///
/// `url` is always serialized (as `null` on failure); `error` is omitted
/// entirely on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// Hosted image URL, or an inline `data:` URL.
    pub url: Option<String>,

    /// The prompt this outcome belongs to.
    pub prompt: String,

    /// Failure description, at most 200 characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationOutcome {
    /// A completed call; `url` is `None` when the provider returned no image.
    pub fn completed(prompt: impl Into<String>, url: Option<String>) -> Self {
        Self {
            url,
            prompt: prompt.into(),
            error: None,
        }
    }

    /// A failed call.
    pub fn failed(prompt: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            url: None,
            prompt: prompt.into(),
            error: Some(truncate_chars(&error.to_string(), MAX_ERROR_CHARS)),
        }
    }

    /// Convert the result of a provider call.
    pub fn from_result(
        prompt: impl Into<String>,
        result: std::result::Result<Option<String>, ProviderError>,
    ) -> Self {
        match result {
            Ok(url) => Self::completed(prompt, url),
            Err(error) => Self::failed(prompt, error),
        }
    }

    /// Whether an image was produced.
    pub fn is_success(&self) -> bool {
        self.url.is_some() && self.error.is_none()
    }
}

/// The four marketing image kinds a product listing uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    /// Pure white background product shot.
    PureProduct,
    /// Hero image for the listing.
    MainImage,
    /// Selling points layout.
    Infographic,
    /// Product in a real-life scene.
    Lifestyle,
}

impl ImageKind {
    /// All kinds in listing order.
    pub const ALL: [Self; 4] = [
        Self::PureProduct,
        Self::MainImage,
        Self::Infographic,
        Self::Lifestyle,
    ];

    /// Machine-readable key.
    pub fn key(self) -> &'static str {
        match self {
            Self::PureProduct => "pure_product",
            Self::MainImage => "main_image",
            Self::Infographic => "infographic",
            Self::Lifestyle => "lifestyle",
        }
    }

    /// Label shown to operators.
    pub fn label(self) -> &'static str {
        match self {
            Self::PureProduct => "白底图",
            Self::MainImage => "主图",
            Self::Infographic => "卖点图",
            Self::Lifestyle => "场景图",
        }
    }

    /// Look up a kind by key or label.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == label || kind.label() == label)
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse prompt input text.
///
/// Accepted shapes:
/// - a JSON array of strings, or of objects carrying `prompt` or `en`;
/// - `{"prompts": [...]}`;
/// - an object keyed by [`ImageKind`] key or label, with `{zh, en}` objects
///   or plain strings as values (English prompt used, listing order, blanks skipped);
/// - plain text, one prompt per non-empty line.
///
/// Array entries are kept positionally, trimmed but not dropped.
pub fn parse_prompts(text: &str) -> Result<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text).trim();
    if text.is_empty() {
        return Err(ShopfrontError::InvalidPromptInput(
            "input contains no prompts".to_string(),
        ));
    }

    let prompts = if text.starts_with('[') || text.starts_with('{') {
        let value: Value = serde_json::from_str(text).map_err(|e| ShopfrontError::JsonParse {
            line: e.line(),
            source: e,
        })?;
        prompts_from_json(&value)?
    } else {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    };

    if prompts.is_empty() {
        return Err(ShopfrontError::InvalidPromptInput(
            "input contains no prompts".to_string(),
        ));
    }
    Ok(prompts)
}

fn prompts_from_json(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                prompt_text(item).ok_or_else(|| {
                    ShopfrontError::InvalidPromptInput(format!(
                        "unsupported prompt entry at index {index}"
                    ))
                })
            })
            .collect(),
        Value::Object(map) => {
            if let Some(prompts) = map.get("prompts") {
                return match prompts {
                    Value::Array(_) => prompts_from_json(prompts),
                    _ => Err(ShopfrontError::InvalidPromptInput(
                        "\"prompts\" must be an array".to_string(),
                    )),
                };
            }

            let mut by_kind: Vec<(ImageKind, String)> = map
                .iter()
                .filter_map(|(key, entry)| Some((ImageKind::from_label(key)?, prompt_text(entry)?)))
                .filter(|(_, prompt)| !prompt.is_empty())
                .collect();

            if by_kind.is_empty() && !map.keys().any(|key| ImageKind::from_label(key).is_some()) {
                return Err(ShopfrontError::InvalidPromptInput(
                    "expected \"prompts\" or image kind keys".to_string(),
                ));
            }

            by_kind.sort_by_key(|(kind, _)| ImageKind::ALL.iter().position(|k| k == kind));
            Ok(by_kind.into_iter().map(|(_, prompt)| prompt).collect())
        }
        _ => Err(ShopfrontError::InvalidPromptInput(
            "expected a JSON array or object".to_string(),
        )),
    }
}

fn prompt_text(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(map) => ["prompt", "en"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(|s| s.trim().to_string()),
        _ => None,
    }
}
