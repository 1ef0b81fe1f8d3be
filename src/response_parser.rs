use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
}

impl JsonShape {
    fn delimiters(self) -> (char, char) {
        match self {
            JsonShape::Object => ('{', '}'),
            JsonShape::Array => ('[', ']'),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("reply is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pulls a JSON value out of a free-form model reply.
///
/// Fenced blocks win: a block labelled `json` first, otherwise the first
/// fenced block of any kind. If the remaining text does not start with the
/// expected delimiter, the slice between the first opening and the last
/// closing delimiter is decoded instead. The first/last slice is
/// deliberately naive: a literal `{`/`}`/`[`/`]` inside a string value can
/// mis-bound the slice. Decoding errors surface as a parse failure so the
/// caller can retry; they are never conflated with remote-call failures.
pub fn extract_json(raw: &str, shape: JsonShape) -> Result<Value, ParseError> {
    let fenced = strip_fences(raw);
    let (open, close) = shape.delimiters();

    let candidate = if fenced.starts_with(open) {
        fenced
    } else {
        match (fenced.find(open), fenced.rfind(close)) {
            (Some(start), Some(end)) if end > start => &fenced[start..=end],
            // No usable delimiters: decode the text as-is and let serde fail.
            _ => fenced,
        }
    };

    Ok(serde_json::from_str(candidate)?)
}

// Mirrors split-on-fence extraction: everything after the first opening
// fence up to the next fence. Only the first block is considered.
fn strip_fences(raw: &str) -> &str {
    if let Some((_, after)) = raw.split_once("```json") {
        match after.split_once("```") {
            Some((inner, _)) => inner.trim(),
            None => after.trim(),
        }
    } else if let Some((_, after)) = raw.split_once("```") {
        match after.split_once("```") {
            Some((inner, _)) => inner.trim(),
            None => after.trim(),
        }
    } else {
        raw.trim()
    }
}
