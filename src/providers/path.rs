//! Declarative field extraction from JSON responses, e.g.
//! `choices[0].message.content` or `[0].translations[0].text`.

use serde_json::Value;

use crate::errors::ProviderError;

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Key(String),
    Index(usize),
}

fn parse_path(path: &str) -> Option<Vec<Step>> {
    let mut steps = Vec::new();
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let (name, mut rest) = match segment.find('[') {
            Some(i) => (&segment[..i], &segment[i..]),
            None => (segment, ""),
        };
        if !name.is_empty() {
            steps.push(Step::Key(name.to_string()));
        }
        while let Some(stripped) = rest.strip_prefix('[') {
            let close = stripped.find(']')?;
            steps.push(Step::Index(stripped[..close].trim().parse().ok()?));
            rest = &stripped[close + 1..];
        }
        if !rest.is_empty() {
            return None;
        }
    }
    Some(steps)
}

/// Value at `path`, if every step resolves
pub fn extract<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    parse_path(path)?.iter().try_fold(value, |current, step| match step {
        Step::Key(key) => current.get(key.as_str()),
        Step::Index(index) => current.get(*index),
    })
}

/// String at `path`, or an invalid-shape error naming the path
pub fn extract_text(value: &Value, path: &str) -> Result<String, ProviderError> {
    match extract(value, path) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(ProviderError::InvalidResponseShape(format!(
            "'{}' is not a string: {}",
            path, other
        ))),
        None => Err(ProviderError::InvalidResponseShape(format!("'{}' missing from response", path))),
    }
}
