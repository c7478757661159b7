/*!
 * Tests for placeholder protection of glossary terms
 */

use std::sync::Arc;

use regex::Regex;

use fictrans::document::{InlineTags, TranslationUnit};
use fictrans::glossary::{GlossaryScope, GlossarySource, RuleKind, RuleSet, compile_rules};
use fictrans::protect::{PlaceholderMap, TOKEN_REGEX, TermProtector};

fn protector(sources: &[GlossarySource]) -> TermProtector {
    TermProtector::new(Arc::new(RuleSet::new(compile_rules(sources))), InlineTags::default())
}

fn local() -> GlossarySource {
    GlossarySource::new("local", GlossaryScope::Local, "Mine")
}

#[test]
fn test_protect_multiPartTerm_shouldLeaveOnlyToken() {
    let protector = protector(&[local().with_term("Tsukinomori Girls' Academy", "月之森女子学园")]);
    let unit = TranslationUnit::from_html(0, "I study at Tsukinomori Girls' Academy.");
    let mut map = PlaceholderMap::new();

    let protected = protector.protect(&unit, &mut map);

    let shape = Regex::new(r"^I study at ph_\d{6}\.$").unwrap();
    assert!(shape.is_match(&protected.html), "unexpected: {}", protected.html);
    assert_eq!(protected.tokens.len(), 1);
    assert_eq!(map.get(&protected.tokens[0]).unwrap().final_value, "月之森女子学园");
}

#[test]
fn test_protect_termAcrossFormatting_shouldMatch() {
    let protector = protector(&[local().with_term("Jane Doe", "简·多伊")]);
    let unit = TranslationUnit::from_html(0, "Then <em>Jane</em> Doe arrived.");
    let mut map = PlaceholderMap::new();

    let protected = protector.protect(&unit, &mut map);

    assert!(!protected.html.contains("Jane"));
    assert!(!protected.html.contains("Doe"));
    assert_eq!(protected.tokens.len(), 1);
    assert!(protected.html.starts_with("Then "));
    assert!(protected.html.ends_with(" arrived."));
}

#[test]
fn test_protect_localTermOverRemoteGeneral_shouldWin() {
    let sources = [
        local().with_term("Jane Doe", "简·多伊"),
        GlossarySource::new("shared", GlossaryScope::Remote, "Shared").with_general_term("Doe", "多伊"),
    ];
    let unit = TranslationUnit::from_html(0, "Jane Doe smiled.");
    let mut map = PlaceholderMap::new();

    let protected = protector(&sources).protect(&unit, &mut map);

    assert_eq!(protected.tokens.len(), 1);
    let placeholder = map.get(&protected.tokens[0]).unwrap();
    assert_eq!(placeholder.final_value, "简·多伊");
    assert_eq!(placeholder.rule_term, "Jane Doe");
}

#[test]
fn test_protect_repeatedTerm_shouldReuseToken() {
    let protector = protector(&[local().with_term("Saki", "祥子")]);
    let unit = TranslationUnit::from_html(0, "Saki looked at Saki's reflection. Saki sighed.");
    let mut map = PlaceholderMap::new();

    let protected = protector.protect(&unit, &mut map);

    assert_eq!(protected.tokens.len(), 3);
    assert!(protected.tokens.iter().all(|t| t == &protected.tokens[0]));
    assert_eq!(map.len(), 1);
}

#[test]
fn test_protect_forbiddenTerm_shouldKeepOriginalValue() {
    let protector = protector(&[local().with_forbidden("Ave Mujica")]);
    let unit = TranslationUnit::from_html(0, "Ave Mujica played tonight.");
    let mut map = PlaceholderMap::new();

    let protected = protector.protect(&unit, &mut map);

    let placeholder = map.get(&protected.tokens[0]).unwrap();
    assert_eq!(placeholder.rule_kind, RuleKind::Forbidden);
    assert_eq!(placeholder.final_value, "Ave Mujica");
}

#[test]
fn test_protect_wordInsideLongerWord_shouldNotMatch() {
    let protector = protector(&[local().with_term("Ann", "安")]);
    let unit = TranslationUnit::from_html(0, "Anne and Annabel laughed.");
    let mut map = PlaceholderMap::new();

    let protected = protector.protect(&unit, &mut map);

    assert!(protected.tokens.is_empty());
    assert_eq!(protected.html, "Anne and Annabel laughed.");
}

#[test]
fn test_protect_existingTokenShapedText_shouldNotBeReissued() {
    let protector = protector(&[local().with_term("Saki", "祥子")]);
    let unit = TranslationUnit::from_html(0, "Saki wrote ph_000001 on the board.");
    let mut map = PlaceholderMap::new();

    let protected = protector.protect(&unit, &mut map);

    assert!(map.is_reserved("ph_000001"));
    assert_ne!(protected.tokens[0], "ph_000001");
    assert_eq!(TOKEN_REGEX.find_iter(&protected.html).count(), 2);
}

#[test]
fn test_countOccurrences_shouldCountAcrossUnits() {
    let protector = protector(&[local().with_term("Saki", "祥子")]);
    let mut map = PlaceholderMap::new();
    let first = protector.protect(&TranslationUnit::from_html(0, "Saki ran."), &mut map);
    let second = protector.protect(&TranslationUnit::from_html(1, "Saki and Saki."), &mut map);

    let counts = map.count_occurrences(&[first.html, second.html]);
    assert_eq!(counts.get(&first.tokens[0]), Some(&3));
}
