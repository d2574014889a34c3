//! Fault collection and end-of-run reporting
//!
//! Recoverable per-sentence conditions are recorded as [`Fault`] values in
//! a [`FaultLog`] and reported at end of run with counts and offending
//! ids. No single sentence's fault aborts the corpus, and faults are
//! never auto-repaired.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Why a two-source merge could not be carried out for a sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeFailure {
    /// No donor sentence shares this sentence's normalized text.
    NoTextMatch,
    /// Matched by text but the token rows cannot be aligned.
    TokenCountMismatch { ours: usize, theirs: usize },
}

impl fmt::Display for MergeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeFailure::NoTextMatch => write!(f, "no text match"),
            MergeFailure::TokenCountMismatch { ours, theirs } => {
                write!(f, "token count mismatch ({} vs {})", ours, theirs)
            }
        }
    }
}

/// A recoverable data-integrity fault, reported but never repaired.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    #[error("line {line}: malformed token line: {content:?}")]
    MalformedLine { line: usize, content: String },

    #[error("sentence {}: head {head} of token {token} resolves to nothing", sent_label(.sent_id))]
    DanglingHead {
        sent_id: Option<String>,
        token: String,
        head: String,
    },

    #[error("sentence {}: cannot merge: {reason}", sent_label(.sent_id))]
    IrreconcilableMerge {
        sent_id: Option<String>,
        reason: MergeFailure,
    },

    #[error("sentence {}: multiple roots: {}", sent_label(.sent_id), .ids.join(", "))]
    MultipleRoots {
        sent_id: Option<String>,
        ids: Vec<String>,
    },

    #[error("sentence {}: no root token", sent_label(.sent_id))]
    NoRoot { sent_id: Option<String> },

    #[error("sentence {}: head cycle through: {}", sent_label(.sent_id), .ids.join(", "))]
    HeadCycle {
        sent_id: Option<String>,
        ids: Vec<String>,
    },

    #[error("sentence {}: duplicate token id {id}", sent_label(.sent_id))]
    DuplicateId {
        sent_id: Option<String>,
        id: String,
    },

    #[error("sentence {}: ids are not sequential at {id}", sent_label(.sent_id))]
    NonSequentialId {
        sent_id: Option<String>,
        id: String,
    },

    #[error("sentence {}: span {id} does not cover its members: {detail}", sent_label(.sent_id))]
    BrokenSpan {
        sent_id: Option<String>,
        id: String,
        detail: String,
    },

    #[error("sentence {}: unresolved temporary id {id}", sent_label(.sent_id))]
    UnresolvedTemp {
        sent_id: Option<String>,
        id: String,
    },
}

fn sent_label(sent_id: &Option<String>) -> &str {
    sent_id.as_deref().unwrap_or("<unknown>")
}

impl Fault {
    /// Stable short name used for end-of-run counting.
    pub fn kind(&self) -> &'static str {
        match self {
            Fault::MalformedLine { .. } => "malformed-line",
            Fault::DanglingHead { .. } => "dangling-head",
            Fault::IrreconcilableMerge { .. } => "irreconcilable-merge",
            Fault::MultipleRoots { .. } => "multiple-roots",
            Fault::NoRoot { .. } => "no-root",
            Fault::HeadCycle { .. } => "head-cycle",
            Fault::DuplicateId { .. } => "duplicate-id",
            Fault::NonSequentialId { .. } => "non-sequential-id",
            Fault::BrokenSpan { .. } => "broken-span",
            Fault::UnresolvedTemp { .. } => "unresolved-temp",
        }
    }
}

/// Accumulates faults across a whole run.
#[derive(Debug, Clone, Default)]
pub struct FaultLog {
    faults: Vec<Fault>,
}

impl FaultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    pub fn extend(&mut self, faults: impl IntoIterator<Item = Fault>) {
        self.faults.extend(faults);
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fault> {
        self.faults.iter()
    }

    /// Fault counts per kind, in stable order.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for fault in &self.faults {
            *counts.entry(fault.kind()).or_insert(0) += 1;
        }
        counts
    }
}

impl fmt::Display for FaultLog {
    /// End-of-run summary: counts per kind, then every fault with its
    /// offending ids.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.faults.is_empty() {
            return writeln!(f, "no faults");
        }
        writeln!(f, "{} fault(s):", self.faults.len())?;
        for (kind, count) in self.counts() {
            writeln!(f, "  {}: {}", kind, count)?;
        }
        for fault in &self.faults {
            writeln!(f, "  - {}", fault)?;
        }
        Ok(())
    }
}
