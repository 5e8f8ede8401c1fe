//! Structured-field scraping from free-text model responses.
//!
//! The reasoning model is asked to embed a structured payload in its
//! response: either a flat JSON object or the tag format
//! `<key>value</key>`. [`parse_fields`] extracts whichever it finds into
//! a flat string map, trying multiple recovery strategies before giving
//! up. Unparseable output yields an **empty map, never an error** --
//! parse failure is a first-class recoverable outcome and the caller
//! falls back to its prior state.

use std::collections::BTreeMap;

use tracing::warn;

/// Parse a model response into a flat field map.
///
/// Recovery strategies, in order:
/// 1. Direct JSON object deserialization
/// 2. JSON extracted from a markdown code block
/// 3. JSON with trailing commas stripped
/// 4. `<key>value</key>` tag scraping
///
/// JSON arrays become newline-joined strings; scalars are stringified.
/// If every strategy fails the map is empty (with a warning log).
pub fn parse_fields(raw: &str) -> BTreeMap<String, String> {
    let trimmed = raw.trim();

    // Strategy 1: direct parse
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed)
        && let Some(fields) = json_object_fields(&value)
    {
        return fields;
    }

    // Strategy 2: extract from markdown code block
    if let Some(json_str) = extract_json_from_codeblock(trimmed)
        && let Ok(value) = serde_json::from_str::<serde_json::Value>(json_str)
        && let Some(fields) = json_object_fields(&value)
    {
        return fields;
    }

    // Strategy 3: strip trailing commas and retry
    let cleaned = strip_trailing_commas(trimmed);
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&cleaned)
        && let Some(fields) = json_object_fields(&value)
    {
        return fields;
    }

    // Strategy 4: tag scraping
    let tagged = extract_tagged_fields(trimmed);
    if !tagged.is_empty() {
        return tagged;
    }

    if !trimmed.is_empty() {
        warn!(raw_response = trimmed, "no parse strategy matched, empty field map");
    }
    BTreeMap::new()
}

/// Interpret a truthy/falsy field value.
///
/// Accepts yes/no, true/false, and 1/0 (case-insensitive). Anything else
/// is `None` so the caller can apply its own default.
pub fn parse_yes_no(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Flatten a JSON object into a string map.
fn json_object_fields(value: &serde_json::Value) -> Option<BTreeMap<String, String>> {
    let object = value.as_object()?;
    let mut fields = BTreeMap::new();
    for (key, value) in object {
        fields.insert(key.clone(), json_value_to_string(value));
    }
    Some(fields)
}

/// Stringify a JSON value for the flat field map.
///
/// Arrays join their stringified elements with newlines (one item per
/// line, matching the tag format's list convention).
fn json_value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(json_value_to_string)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

/// Extract JSON from a markdown code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    // Look for ```json ... ``` or ``` ... ```
    let start = text
        .find("```json")
        .map(|i| after_fence(text, i, 7))
        .or_else(|| text.find("```").map(|i| after_fence(text, i, 3)));

    let start = start?;
    let remaining = text.get(start..)?;
    let end = remaining.find("```")?;
    remaining.get(..end).map(str::trim)
}

/// Index of the content following a code fence's opening line.
fn after_fence(text: &str, fence_start: usize, fence_len: usize) -> usize {
    let after_tag = fence_start.saturating_add(fence_len);
    text.get(after_tag..)
        .and_then(|s| s.find('\n'))
        .and_then(|nl| after_tag.checked_add(nl))
        .and_then(|pos| pos.checked_add(1))
        .unwrap_or(after_tag)
}

/// Strip trailing commas before closing braces and brackets (common
/// model error).
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut result = String::with_capacity(text.len());

    let mut i = 0;
    while i < len {
        let c = chars.get(i).copied().unwrap_or(' ');
        if c == ',' {
            // Look ahead past whitespace for } or ]
            let mut j = i.saturating_add(1);
            while j < len && chars.get(j).copied().unwrap_or(' ').is_whitespace() {
                j = j.saturating_add(1);
            }
            let next = chars.get(j).copied().unwrap_or(' ');
            if next == '}' || next == ']' {
                // Skip this comma
                i = i.saturating_add(1);
                continue;
            }
        }
        result.push(c);
        i = i.saturating_add(1);
    }

    result
}

/// Scrape `<key>value</key>` pairs from free text.
///
/// Keys must be identifier-shaped (alphanumerics and underscores); other
/// angle-bracket content is skipped, so surrounding prose is harmless.
fn extract_tagged_fields(text: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let mut cursor = 0;

    while let Some(open_rel) = text.get(cursor..).and_then(|s| s.find('<')) {
        let open = cursor.saturating_add(open_rel);
        let Some(close_rel) = text.get(open..).and_then(|s| s.find('>')) else {
            break;
        };
        let key_start = open.saturating_add(1);
        let key_end = open.saturating_add(close_rel);
        let Some(key) = text.get(key_start..key_end) else {
            break;
        };

        cursor = key_end.saturating_add(1);
        if key.is_empty()
            || !key.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            continue;
        }

        let closing = format!("</{key}>");
        let Some(value_end_rel) = text.get(cursor..).and_then(|s| s.find(&closing))
        else {
            continue;
        };
        let value_end = cursor.saturating_add(value_end_rel);
        if let Some(value) = text.get(cursor..value_end) {
            fields.insert(String::from(key), String::from(value.trim()));
        }
        cursor = value_end.saturating_add(closing.len());
    }

    fields
}

// ===========================================================================
// Tests
// ===========================================================================
