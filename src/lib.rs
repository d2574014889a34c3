//! Treeforge: dependency treebank transformation engine
//!
//! Converts scraped/legacy treebank token streams into
//! standards-compliant dependency-annotated corpora through sequential
//! rule-based rewrite stages: structural graph surgery under strict
//! referential-integrity invariants, followed by a deterministic
//! renumbering pass.

pub mod align; // Two-source alignment and annotation merging
pub mod conllu; // CoNLL-U parsing and serialization
pub mod edit; // Structural edit primitives
pub mod index; // Derived id/head indices per sentence
pub mod pipeline; // Stage driver and stock stages
pub mod proiel; // Legacy attribute-bag token streams
pub mod renumber; // Renumbering and head remapping
pub mod report; // Fault collection and end-of-run reporting
pub mod rules; // Rule dispatch with snapshot semantics
pub mod sentence; // Sentence and corpus containers
pub mod table; // Injectable rule tables
pub mod token; // Token records
pub mod validate; // Structural invariant checks

// Re-exports for convenience
pub use align::{merge_corpora, normalize_text};
pub use conllu::{ConlluError, ParseMode, SentenceReader};
pub use edit::{Attachment, EditError, NewToken, PartChoice, SplitOptions, SplitPart};
pub use index::{Direction, TreeIndex};
pub use pipeline::{Pipeline, Stage};
pub use renumber::{IdMap, renumber};
pub use report::{Fault, FaultLog};
pub use rules::{RulePass, SentenceRule};
pub use sentence::{Corpus, Sentence};
pub use table::{RuleKey, RuleTable, TableAction, parse_table};
pub use token::{Dialect, FeatureSet, Head, MiscSet, Token, TokenId};
