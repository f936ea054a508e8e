//! Parsing helpers for loosely formatted JSON returned by language models.

use serde_json::Value;

/// Parse model output that may be wrapped in markdown code fences or
/// surrounded by prose.
pub fn parse_relaxed(input: &str) -> Result<Value, String> {
    let cleaned = strip_fences(input);
    if let Ok(v) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(v);
    }
    match first_balanced_object(&cleaned) {
        Some(obj) => {
            serde_json::from_str::<Value>(&obj).map_err(|e| format!("invalid JSON object: {e}"))
        }
        None => Err("no JSON object found".into()),
    }
}

/// Remove every markdown fence marker, not just a leading/trailing pair;
/// models occasionally emit fenced blocks mid-answer.
fn strip_fences(s: &str) -> String {
    s.replace("```json", "").replace("```", "").trim().to_string()
}

/// Extract the first balanced `{..}` block, skipping over string literals.
fn first_balanced_object(s: &str) -> Option<String> {
    let mut in_str = false;
    let mut esc = false;
    let mut depth = 0usize;
    let mut start: Option<usize> = None;

    for (i, ch) in s.char_indices() {
        if in_str {
            if esc {
                esc = false;
            } else if ch == '\\' {
                esc = true;
            } else if ch == '"' {
                in_str = false;
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_str = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|st| s[st..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
