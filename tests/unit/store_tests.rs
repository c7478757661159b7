/*!
 * Tests for the key-value stores and the state persisted in them
 */

use std::sync::Arc;

use fictrans::glossary::{GlossaryScope, GlossarySource, RuleCompiler};
use fictrans::providers::CredentialRotator;
use fictrans::store::{KeyValueStore, SqliteStore, get_json, set_json};

use crate::common;

#[test]
fn test_sqliteStore_reopen_shouldKeepValues() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("nested").join("fictrans.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        set_json(&store, "numbers", &vec![1, 2, 3]).unwrap();
        store.set("plain", "value").unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(store.path(), path.as_path());
    assert_eq!(get_json::<Vec<i32>>(&store, "numbers").unwrap(), Some(vec![1, 2, 3]));
    assert_eq!(store.get("plain").unwrap().as_deref(), Some("value"));
    store.delete("plain").unwrap();
    assert!(store.get("plain").unwrap().is_none());
}

#[test]
fn test_getJson_undecodableEntry_shouldReadAsAbsent() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.set("broken", "{not json").unwrap();
    assert_eq!(get_json::<Vec<String>>(&store, "broken").unwrap(), None);
}

#[test]
fn test_ruleCache_shouldSurviveNewCompiler() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("cache.db");
    let sources = vec![GlossarySource::new("local", GlossaryScope::Local, "Mine").with_term("Saki", "祥子")];

    let first = RuleCompiler::new(Arc::new(SqliteStore::open(&path).unwrap()));
    let compiled = first.compile(&sources).unwrap();
    assert_eq!(first.stats(), (0, 1));

    let second = RuleCompiler::new(Arc::new(SqliteStore::open(&path).unwrap()));
    let cached = second.compile(&sources).unwrap();
    assert_eq!(second.stats(), (1, 0));
    assert_eq!(cached, compiled);
}

#[test]
fn test_credentialIndex_shouldBeSharedThroughStore() {
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    let keys = vec!["one".to_string(), "two".to_string(), "three".to_string()];

    let first = CredentialRotator::new("deepseek", keys.clone(), Arc::clone(&store));
    let second = CredentialRotator::new("deepseek", keys, Arc::clone(&store));

    let used = tokio_test::block_on(async {
        vec![
            first.next_key().await.unwrap(),
            second.next_key().await.unwrap(),
            first.next_key().await.unwrap(),
            second.next_key().await.unwrap(),
        ]
    });
    assert_eq!(used, vec!["one", "two", "three", "one"]);
}
