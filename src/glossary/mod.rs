/*!
 * Glossary handling: sources, word-form expansion and rule compilation.
 */

pub mod compiler;
pub mod forms;
pub mod library;
pub mod rules;
pub mod source;

pub use compiler::{CompiledGlossary, RuleCompiler, compile_rules, state_hash};
pub use forms::{FormFlags, word_forms};
pub use library::GlossaryLibrary;
pub use rules::{CompiledRule, MatchStrategy, RuleKind, RuleSet};
pub use source::{GlossaryScope, GlossarySource, RegexTerm};
