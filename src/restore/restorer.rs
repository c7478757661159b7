use log::warn;
use regex::Captures;

use crate::protect::{PlaceholderMap, TOKEN_REGEX};

/// Replace every issued token with its rendered final value.
///
/// Tokens the map does not know are left in place; they were already
/// present in the source text.
pub fn restore_placeholders(text: &str, map: &PlaceholderMap) -> String {
    TOKEN_REGEX
        .replace_all(text, |caps: &Captures<'_>| {
            let token = &caps[0];
            match map.get(token) {
                Some(placeholder) => placeholder.render(),
                None => {
                    if !map.is_reserved(token) {
                        warn!("No value recorded for {}", token);
                    }
                    token.to_string()
                }
            }
        })
        .into_owned()
}

/// Issued tokens still present in restored text
pub fn residual_tokens<'a>(text: &'a str, map: &PlaceholderMap) -> Vec<&'a str> {
    TOKEN_REGEX
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|token| map.contains(token))
        .collect()
}
