/*!
 * Tests for glossary parsing, rule compilation and the rule cache
 */

use std::sync::Arc;

use fictrans::errors::GlossaryError;
use fictrans::glossary::{
    GlossaryLibrary, GlossaryScope, GlossarySource, MatchStrategy, RuleCompiler, RuleKind, compile_rules, state_hash,
};
use fictrans::store::MemoryStore;

use crate::common;

fn sources() -> Vec<GlossarySource> {
    vec![
        GlossarySource::new("local", GlossaryScope::Local, "Mine")
            .with_term("Jane Doe", "简·多伊")
            .with_forbidden("Ochako")
            .with_recency(2),
        GlossarySource::new("shared", GlossaryScope::Remote, "Shared")
            .with_general_term("Doe", "多伊")
            .with_regex(r"Lv\.(\d+)", "$1级")
            .with_recency(1),
    ]
}

#[test]
fn test_parse_fullFile_shouldFillEverySection() {
    let text = "version: 3\nname: Bandori\n\nTERMS\nSaki: 祥子\nTogawa Sakiko = 丰川祥子\n\nGENERAL TERMS\nlive house: 展演空间\n\nFORBIDDEN TERMS\nAve Mujica\n\nREGEX\nRoom (\\d+): $1号房\n";
    let source = GlossarySource::parse("bandori", GlossaryScope::Local, text).unwrap();

    assert_eq!(source.version.as_deref(), Some("3"));
    assert_eq!(source.name, "Bandori");
    assert_eq!(source.sensitive_terms.get("Saki").map(String::as_str), Some("祥子"));
    assert!(source.unordered_keys.contains("Togawa Sakiko"));
    assert_eq!(source.insensitive_terms.len(), 1);
    assert_eq!(source.forbidden_terms, vec!["Ave Mujica".to_string()]);
    assert_eq!(source.regex_terms[0].pattern, r"Room (\d+)");
    assert_eq!(source.regex_terms[0].replacement, "$1号房");
}

#[test]
fn test_parse_withoutVersion_shouldFail() {
    let result = GlossarySource::parse("x", GlossaryScope::Local, "TERMS\nSaki: 祥子\n");
    assert_eq!(result.unwrap_err(), GlossaryError::MissingVersion);
}

#[test]
fn test_parse_withoutEntries_shouldFail() {
    let result = GlossarySource::parse("x", GlossaryScope::Local, "version: 1\nTERMS\n");
    assert_eq!(result.unwrap_err(), GlossaryError::NoContent);
}

#[test]
fn test_compile_sameState_shouldHitCache() {
    common::init_logging();
    let compiler = RuleCompiler::new(Arc::new(MemoryStore::new()));
    let sources = sources();

    let first = compiler.compile(&sources).unwrap();
    let second = compiler.compile(&sources.clone()).unwrap();

    assert_eq!(first.state_hash, second.state_hash);
    assert_eq!(first.rules, second.rules);
    assert_eq!(compiler.stats(), (1, 1));
}

#[test]
fn test_compile_rebuiltLibraryOnSharedStore_shouldHitCache() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "names.txt", "version: 1\nTERMS\nSaki: 祥子\n").unwrap();
    let store = Arc::new(MemoryStore::new());

    let build = || {
        let mut library = GlossaryLibrary::new(store.clone());
        library.load_file(&path).unwrap();
        library.merge_inline("Mutsumi:睦").unwrap();
        library
    };

    let first = build();
    let first_rules = first.compile().unwrap();
    assert_eq!(first.compiler().stats(), (0, 1));

    std::thread::sleep(std::time::Duration::from_millis(1100));
    let second = build();
    let second_rules = second.compile().unwrap();

    assert_eq!(second.compiler().stats(), (1, 0));
    assert_eq!(first_rules.state_hash, second_rules.state_hash);
    assert_eq!(first_rules.rules, second_rules.rules);
}

#[test]
fn test_stateHash_sameRemoteOrderDifferentImportTimes_shouldMatch() {
    let earlier = sources();
    let later: Vec<GlossarySource> = sources()
        .into_iter()
        .map(|s| {
            let weight = s.recency_weight + 1_700_000_000;
            s.with_recency(weight)
        })
        .collect();

    assert_eq!(state_hash(&earlier).unwrap(), state_hash(&later).unwrap());
}

#[test]
fn test_stateHash_toggleEnabled_shouldChange() {
    let mut sources = sources();
    let before = state_hash(&sources).unwrap();
    sources[1].enabled = false;
    let after = state_hash(&sources).unwrap();
    assert_ne!(before, after);
}

#[test]
fn test_compileRules_disabledSource_shouldContributeNothing() {
    let mut sources = sources();
    sources[1].enabled = false;
    let rules = compile_rules(&sources);
    assert!(rules.iter().all(|r| r.scope == GlossaryScope::Local));
}

#[test]
fn test_compileRules_shouldOrderByBand() {
    let rules = compile_rules(&sources());
    let priorities: Vec<i64> = rules.iter().map(|r| r.priority).collect();
    let mut sorted = priorities.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(priorities, sorted);

    // Local forbidden > local term > remote general term > remote regex
    assert_eq!(rules[0].kind, RuleKind::Forbidden);
    assert_eq!(rules[1].source_term, "Jane Doe");
    assert_eq!(rules[2].source_term, "Doe");
    assert_eq!(rules[3].match_strategy, MatchStrategy::Regex);
}

#[test]
fn test_compileRules_multiPartTerm_shouldKeepParts() {
    let rules = compile_rules(&sources());
    let jane = rules.iter().find(|r| r.source_term == "Jane Doe").unwrap();
    assert_eq!(jane.parts.len(), 2);
    assert!(jane.parts[0].contains(&"Jane".to_string()));
    assert!(jane.parts[1].contains(&"Doe".to_string()));
    assert!(!jane.case_insensitive);

    let doe = rules.iter().find(|r| r.source_term == "Doe").unwrap();
    assert!(doe.case_insensitive);
}

#[test]
fn test_library_mergeInline_shouldAddLocalTerms() {
    let mut library = GlossaryLibrary::new(Arc::new(MemoryStore::new()));
    library.merge_inline("Saki:祥子, Mutsumi：睦").unwrap();

    let compiled = library.compile().unwrap();
    let terms: Vec<&str> = compiled.rules.iter().map(|r| r.source_term.as_str()).collect();
    assert!(terms.contains(&"Saki"));
    assert!(terms.contains(&"Mutsumi"));
}

#[test]
fn test_library_loadFile_shouldRegisterSource() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "names.txt", "version: 1\nTERMS\nSaki: 祥子\n").unwrap();

    let mut library = GlossaryLibrary::new(Arc::new(MemoryStore::new()));
    library.load_file(&path).unwrap();

    assert_eq!(library.sources().len(), 2);
    assert!(library.compile().unwrap().rules.iter().any(|r| r.replacement == "祥子"));
}
