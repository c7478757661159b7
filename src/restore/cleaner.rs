/*!
 * Removal of translator artifacts from a response segment.
 *
 * LLM providers sometimes echo parts of their instructions, prepend a
 * polite preamble, keep the list numbering, or escape the very tags they
 * were asked to preserve. The cleaner strips these and, for Chinese and
 * Japanese targets, normalizes spacing between CJK and Latin text.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::document::InlineTags;
use crate::language_utils::{Script, char_script};

/// Lines echoing the prompt's vocabulary, e.g. `译文：` or `Stage 2`
static META_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:[0-9]+\s*[.．、)）]\s*)?(?:\*\*|#+\s*)?(?:原文|输出|译文|翻译|说明|遵守|润色|语境|保留|符合|指令|translation|original text|output|note|stage|strategy|polish|retain|glossary|adherence)(?:\*\*)?(?:\s*[:：]|\s+[0-9])",
    )
    .expect("Invalid meta line regex")
});

/// Short list numbering left at the start of a segment
static NUMBERING_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[0-9]{1,3}\s*(?:[．。、)）]|\.(?:\s|$))\s*").expect("Invalid numbering regex"));

static FILLER_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\s*(?:好的|当然|没问题)[，,。.！!\s]*",
        r"^\s*以下是[^：:\n]{0,40}[：:]\s*",
        r"(?i)^\s*(?:sure|okay|certainly|of course)\b[^:\n]{0,80}:\s*",
        r"(?i)^\s*here(?:'s| is| are)\b[^:\n]{0,80}:\s*",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid filler regex"))
    .collect()
});

static ESCAPED_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&lt;(/?)([a-zA-Z][a-zA-Z0-9]*)((?:\s[^&<>]*)?)&gt;").expect("Invalid escaped tag regex")
});

static DOUBLE_ESCAPED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&amp;([a-zA-Z]+|#[0-9]+);").expect("Invalid double escape regex"));

static TAG_SPLIT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

const CJK_PUNCTUATION: &[char] = &[
    '，', '。', '！', '？', '；', '：', '、', '「', '」', '『', '』', '（', '）', '《', '》', '“', '”', '‘', '’', '…',
    '～', '【', '】', '〔', '〕',
];

fn is_cjk_punctuation(c: char) -> bool {
    CJK_PUNCTUATION.contains(&c)
}

/// Han or kana: scripts written without inter-word spaces
fn is_dense(c: char) -> bool {
    matches!(char_script(c), Script::Han | Script::Kana)
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Char(char),
    Tag(String),
}

impl Item {
    fn dense_or_punct(&self) -> bool {
        matches!(self, Item::Char(c) if is_dense(*c) || is_cjk_punctuation(*c))
    }

    fn is_punct(&self) -> bool {
        matches!(self, Item::Char(c) if is_cjk_punctuation(*c))
    }

    fn is_tag(&self) -> bool {
        matches!(self, Item::Tag(_))
    }
}

#[derive(Debug, Clone)]
pub struct TranslationCleaner {
    inline_tags: InlineTags,
    dense_target: bool,
}

impl TranslationCleaner {
    pub fn new(target_language: &str, inline_tags: InlineTags) -> Self {
        let lang = target_language.to_ascii_lowercase();
        Self {
            inline_tags,
            dense_target: lang.starts_with("zh") || lang.starts_with("ja"),
        }
    }

    /// Strip artifacts; an empty result falls back to the input
    pub fn clean(&self, segment: &str) -> String {
        let mut text = remove_meta_lines(segment);

        for regex in FILLER_REGEXES.iter() {
            text = regex.replace(&text, "").into_owned();
        }
        text = NUMBERING_REGEX.replace(&text, "").into_owned();
        text = self.unescape(&text);

        let text = text.trim();
        if text.is_empty() {
            segment.trim().to_string()
        } else {
            text.to_string()
        }
    }

    /// Undo escaping the provider applied to preserved markup
    pub fn unescape(&self, text: &str) -> String {
        let tags = ESCAPED_TAG_REGEX.replace_all(text, |caps: &Captures<'_>| {
            let name = caps[2].to_ascii_lowercase();
            if self.inline_tags.contains(&name) || name == "br" {
                format!("<{}{}{}>", &caps[1], &caps[2], &caps[3])
            } else {
                caps[0].to_string()
            }
        });
        let entities = DOUBLE_ESCAPED_REGEX.replace_all(&tags, "&$1;");
        map_outside_tags(&entities, |segment| segment.replace("&quot;", "\"").replace("&#39;", "'"))
    }

    /// CJK/Latin spacing for Chinese and Japanese targets; other targets unchanged
    pub fn normalize_spacing(&self, html: &str) -> String {
        if !self.dense_target {
            return html.to_string();
        }

        let mut items = Vec::new();
        let mut last = 0;
        for tag in TAG_SPLIT_REGEX.find_iter(html) {
            items.extend(html[last..tag.start()].chars().map(Item::Char));
            items.push(Item::Tag(tag.as_str().to_string()));
            last = tag.end();
        }
        items.extend(html[last..].chars().map(Item::Char));

        let mut out: Vec<Item> = Vec::with_capacity(items.len());
        let mut i = 0;
        while i < items.len() {
            if matches!(items[i], Item::Char(c) if c.is_whitespace()) {
                let run_start = i;
                while i < items.len() && matches!(items[i], Item::Char(c) if c.is_whitespace()) {
                    i += 1;
                }
                let prev = out.last();
                let next = items.get(i);
                let drop = match (prev, next) {
                    (Some(p), Some(n)) => {
                        (p.dense_or_punct() && n.dense_or_punct())
                            || p.is_punct()
                            || n.is_punct()
                            || (p.is_tag() && n.dense_or_punct())
                            || (p.dense_or_punct() && n.is_tag())
                    }
                    _ => false,
                };
                if !drop {
                    out.extend(items[run_start..i].iter().cloned());
                }
                continue;
            }

            if let (Some(Item::Char(p)), Item::Char(c)) = (out.last(), &items[i]) {
                let boundary = (is_dense(*p) && c.is_ascii_alphanumeric()) || (p.is_ascii_alphanumeric() && is_dense(*c));
                if boundary {
                    out.push(Item::Char(' '));
                }
            }
            out.push(items[i].clone());
            i += 1;
        }

        out.into_iter()
            .map(|item| match item {
                Item::Char(c) => c.to_string(),
                Item::Tag(t) => t,
            })
            .collect()
    }
}

/// Drop lines that echo the prompt; never drops every line
pub fn remove_meta_lines(text: &str) -> String {
    let kept: Vec<&str> = text.lines().filter(|line| !META_LINE_REGEX.is_match(line)).collect();
    if kept.iter().all(|line| line.trim().is_empty()) {
        return text.to_string();
    }
    kept.join("\n")
}

/// Drop prompt echoes ahead of the first content line of a batch response.
/// Numbered lines are content even when they open with a meta keyword.
pub fn remove_meta_preamble(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|line| {
        let trimmed = line.trim_start();
        !trimmed.is_empty() && (trimmed.starts_with(|c: char| c.is_ascii_digit()) || !META_LINE_REGEX.is_match(line))
    });
    match start {
        Some(start) => lines[start..].join("\n"),
        None => text.to_string(),
    }
}

fn map_outside_tags<F>(html: &str, f: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for tag in TAG_SPLIT_REGEX.find_iter(html) {
        out.push_str(&f(&html[last..tag.start()]));
        out.push_str(tag.as_str());
        last = tag.end();
    }
    out.push_str(&f(&html[last..]));
    out
}
