//! Derived per-sentence tree indices
//!
//! Maps from token id to row position and from head id to dependent
//! positions, built in O(n) over a sentence. Indices are a snapshot:
//! after any edit that changes ids or heads they must be rebuilt, never
//! patched in place. Stale indices are the dominant corruption source
//! in ad hoc per-rule rewriting.

use crate::sentence::Sentence;
use crate::token::{Head, TokenId};
use rustc_hash::FxHashMap;

/// Which side of the head to search for dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Dependents positioned before the head, leftmost first.
    Before,
    /// Dependents positioned after the head, nearest first.
    After,
    /// All dependents in surface order.
    Any,
}

/// Snapshot index over one sentence.
#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    id_to_pos: FxHashMap<TokenId, usize>,
    dependents: FxHashMap<TokenId, Vec<usize>>,
}

impl TreeIndex {
    /// Build the index in one pass. Multiword placeholder rows are
    /// indexed by id but carry no head edges.
    pub fn build(sent: &Sentence) -> Self {
        let mut index = Self {
            id_to_pos: FxHashMap::default(),
            dependents: FxHashMap::default(),
        };
        for (pos, token) in sent.tokens.iter().enumerate() {
            index.id_to_pos.entry(token.id).or_insert(pos);
            if token.is_multiword() {
                continue;
            }
            if let Head::Id(head_id) = token.head {
                index.dependents.entry(head_id).or_default().push(pos);
            }
        }
        index
    }

    /// Row position of the token with this id.
    pub fn position(&self, id: TokenId) -> Option<usize> {
        self.id_to_pos.get(&id).copied()
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.id_to_pos.contains_key(&id)
    }

    /// Positions of the tokens whose head is `id`, in surface order.
    pub fn dependents(&self, id: TokenId) -> &[usize] {
        self.dependents.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First dependent of `id` whose relation is in `relations`, searched
    /// on the given side of the head.
    pub fn first_dependent_with_relation(
        &self,
        sent: &Sentence,
        id: TokenId,
        relations: &[&str],
        direction: Direction,
    ) -> Option<usize> {
        let head_pos = self.position(id)?;
        let matches = |&&pos: &&usize| relations.contains(&sent.tokens[pos].deprel.as_str());
        let deps = self.dependents(id);
        match direction {
            Direction::Before => deps.iter().filter(|&&p| p < head_pos).find(matches),
            Direction::After => deps.iter().filter(|&&p| p > head_pos).find(matches),
            Direction::Any => deps.iter().find(matches),
        }
        .copied()
    }

    /// True when `id` has a dependent tagged `pos` (UPOS, or XPOS for
    /// streams not yet mapped to universal tags).
    pub fn has_dependent_with_pos(&self, sent: &Sentence, id: TokenId, pos: &str) -> bool {
        self.dependents(id)
            .iter()
            .any(|&p| sent.tokens[p].upos == pos || sent.tokens[p].xpos == pos)
    }
}
