/*!
 * Full app lifecycle tests: configuration, controller, glossary and output
 */

use std::path::Path;
use std::sync::Arc;

use fictrans::app_config::Config;
use fictrans::app_controller::Controller;
use fictrans::document::DisplayMode;
use fictrans::errors::ErrorKind;
use fictrans::providers::{MockProvider, Translator};
use fictrans::store::MemoryStore;

use crate::common;

fn config() -> Config {
    let mut config = Config::default();
    config.source_language = "en".to_string();
    config.target_language = "fr".to_string();
    config.glossary.inline = "Jane Doe:Jeanne Dupont, Tsukinomori Girls' Academy:Académie Tsukinomori".to_string();
    config.translation.common.retry_backoff_ms = 1;
    config.translation.common.retry_jitter_ms = 0;
    config
}

fn controller(config: Config, mock: &MockProvider) -> Controller {
    let translator: Arc<dyn Translator> = Arc::new(mock.clone());
    Controller::with_parts(config, Arc::new(MemoryStore::new()), Some(translator))
}

#[tokio::test]
async fn test_translateHtml_bilingual_shouldKeepSourceAndAddTranslations() {
    common::init_logging();
    let mock = MockProvider::echo();
    let controller = controller(config(), &mock);

    let summary = controller.translate_html(common::SAMPLE_CHAPTER, |_, _| {}).await.unwrap();

    assert_eq!(summary.translated, 3);
    assert_eq!(summary.failed, 0);
    assert!(summary.html.contains("Jane Doe walked to Tsukinomori Girls' Academy."));
    assert!(summary.html.contains("Jeanne Dupont walked to Académie Tsukinomori."));
    assert!(summary.html.contains("fictrans-translation"));
    // The separator is never sent
    assert!(mock.requests().iter().flat_map(|r| r.units.iter()).all(|u| !u.contains("* * *")));
}

#[tokio::test]
async fn test_translateHtml_translationOnly_shouldReplaceSource() {
    let mock = MockProvider::echo();
    let mut config = config();
    config.display = DisplayMode::TranslationOnly;
    let controller = controller(config, &mock);

    let summary = controller.translate_html(common::SAMPLE_CHAPTER, |_, _| {}).await.unwrap();

    assert!(!summary.html.contains("Jane Doe walked"));
    assert!(summary.html.contains("Jeanne Dupont walked"));
    assert!(summary.html.contains("* * *"));
}

#[tokio::test]
async fn test_translateHtml_contentBlocked_shouldShowMessageInline() {
    let mock = MockProvider::failing(ErrorKind::ContentPolicyBlocked);
    let controller = controller(config(), &mock);

    let summary = controller.translate_html(common::SAMPLE_CHAPTER, |_, _| {}).await.unwrap();

    assert_eq!(summary.failed, 3);
    assert_eq!(summary.translated, 0);
    assert!(summary.html.contains("Translation failed: Simulated provider failure"));
    // One request per batch; the separator splits the chapter in two
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test]
async fn test_translateHtml_cancelledRun_shouldSkipUnits() {
    let mock = MockProvider::slow(200);
    let controller = Arc::new(controller(config(), &mock));

    let task = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.translate_html(common::SAMPLE_CHAPTER, |_, _| {}).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    controller.generation().advance();
    let summary = task.await.unwrap().unwrap();

    assert_eq!(summary.translated, 0);
    assert_eq!(summary.skipped, 3);
    assert!(!summary.html.contains("fictrans-translation"));
}

#[tokio::test]
async fn test_run_shouldWriteOutputAndRefuseOverwrite() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(dir.path(), "chapter.html", common::SAMPLE_CHAPTER).unwrap();
    let mock = MockProvider::echo();
    let controller = controller(config(), &mock);

    let output = controller.run(input.clone(), None, false).await.unwrap();

    assert_eq!(output, dir.path().join("chapter.fr.html"));
    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("Jeanne Dupont"));

    assert!(controller.run(input.clone(), None, false).await.is_err());
    assert!(controller.run(input, None, true).await.is_ok());
}

#[tokio::test]
async fn test_run_missingInput_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let controller = controller(config(), &MockProvider::echo());

    let result = controller.run(dir.path().join("missing.html"), None, false).await;

    assert!(result.is_err());
}

#[test]
fn test_outputFilename_shouldInsertTargetLanguage() {
    assert_eq!(
        Controller::output_filename(Path::new("/works/ch1.html"), "zh-CN"),
        Path::new("/works/ch1.zh-CN.html")
    );
}

#[test]
fn test_describeGlossary_shouldListRulesByPriority() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "names.txt",
        "version: 1\nTERMS\nSaki: 祥子\n\nFORBIDDEN TERMS\nAve Mujica\n",
    )
    .unwrap();
    let controller = controller(Config::default(), &MockProvider::echo());

    let lines = controller.describe_glossary(&path).unwrap();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("Ave Mujica -> Ave Mujica"));
    assert!(lines[1].contains("Saki -> 祥子"));
}

#[tokio::test]
async fn test_buildLibrary_glossaryFilesAndInline_shouldMerge() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "names.txt", "version: 2\nTERMS\nSaki: 祥子\n").unwrap();
    let mut config = config();
    config.glossary.files = vec![path.display().to_string()];
    let controller = controller(config, &MockProvider::echo());

    let library = controller.build_library().await.unwrap();
    let compiled = library.compile().unwrap();

    let terms: Vec<&str> = compiled.rules.iter().map(|r| r.source_term.as_str()).collect();
    assert!(terms.contains(&"Saki"));
    assert!(terms.contains(&"Jane Doe"));
}

#[tokio::test]
async fn test_buildLibrary_unparsableGlossaryFile_shouldSkipItAndKeepOthers() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let broken = common::create_test_file(dir.path(), "broken.txt", "TERMS\nMutsumi: 睦\n").unwrap();
    let good = common::create_test_file(dir.path(), "names.txt", "version: 1\nTERMS\nSaki: 祥子\n").unwrap();
    let mut config = config();
    config.glossary.files = vec![
        broken.display().to_string(),
        dir.path().join("missing.txt").display().to_string(),
        good.display().to_string(),
    ];
    let controller = controller(config, &MockProvider::echo());

    let library = controller.build_library().await.unwrap();
    let compiled = library.compile().unwrap();

    let terms: Vec<&str> = compiled.rules.iter().map(|r| r.source_term.as_str()).collect();
    assert!(terms.contains(&"Saki"));
    assert!(terms.contains(&"Jane Doe"));
    assert!(!terms.contains(&"Mutsumi"));
}
