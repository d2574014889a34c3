//! Renumbering and head remapping
//!
//! Takes an edited token list with possibly out-of-order, temporary, or
//! reused ids and makes it sequential again: every atomic token gets a
//! new id `1..N` in relative order, every multiword placeholder gets a
//! contiguous range matching its member count, and every head reference
//! is rewritten through the recorded old→new map. Root and undefined
//! heads pass through unchanged. Heads that resolve to nothing after the
//! second pass are reported as faults, never dropped or repaired.
//!
//! O(n) per sentence; sentences are independent.

use crate::report::Fault;
use crate::sentence::Sentence;
use crate::token::{Head, TokenId};
use rustc_hash::FxHashMap;

/// Ephemeral old→new id mapping, built during pass one of a renumbering
/// run and discarded afterwards.
#[derive(Debug, Default)]
pub struct IdMap {
    map: FxHashMap<TokenId, u32>,
}

impl IdMap {
    /// Record a mapping; the first occurrence of a reused old id wins.
    fn record(&mut self, old: TokenId, new: u32) {
        self.map.entry(old).or_insert(new);
    }

    pub fn get(&self, old: TokenId) -> Option<u32> {
        self.map.get(&old).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Renumber one sentence in place and remap every head through the id
/// map. Returns the data-integrity faults found in pass two.
///
/// Already-sequential sentences come out unchanged (byte-for-byte: ids
/// and heads that do not move keep their raw-line caches).
pub fn renumber(sent: &mut Sentence) -> Vec<Fault> {
    let mut map = IdMap::default();
    let mut next: u32 = 1;

    // Pass one: assign ids, consuming placeholder members right after
    // their placeholder so ranges stay contiguous.
    let len = sent.tokens.len();
    let mut i = 0;
    while i < len {
        let width = if sent.tokens[i].is_multiword() {
            sent.tokens[i].span_width()
        } else {
            None
        };
        match width {
            Some(w) if w > 0 => {
                let start = next;
                let end = next + w as u32 - 1;
                sent.tokens[i].set_id(TokenId::Range(start, end));
                if sent.tokens[i].span.take().is_some() {
                    sent.tokens[i].mark_edited();
                }
                for offset in 0..w as u32 {
                    i += 1;
                    if i >= len {
                        break;
                    }
                    let old = sent.tokens[i].id;
                    map.record(old, start + offset);
                    sent.tokens[i].set_id(TokenId::Word(start + offset));
                }
                next = end + 1;
                i += 1;
            }
            _ => {
                let old = sent.tokens[i].id;
                map.record(old, next);
                sent.tokens[i].set_id(TokenId::Word(next));
                next += 1;
                i += 1;
            }
        }
    }

    // Pass two: rewrite heads through the map.
    let sent_id = sent.sent_id().map(str::to_string);
    let mut faults = Vec::new();
    for tok in &mut sent.tokens {
        if tok.is_multiword() {
            continue;
        }
        let tok_label = tok.id.to_string();

        if let Head::Id(old) = tok.head {
            match map.get(old) {
                Some(new) => tok.set_head(Head::Id(TokenId::Word(new))),
                None => faults.push(Fault::DanglingHead {
                    sent_id: sent_id.clone(),
                    token: tok_label.clone(),
                    head: old.to_string(),
                }),
            }
        }

        let mut remapped = tok.deps.clone();
        let mut changed = false;
        for (head, _) in remapped.iter_mut() {
            if let Head::Id(old) = *head {
                match map.get(old) {
                    Some(new) => {
                        let mapped = Head::Id(TokenId::Word(new));
                        if *head != mapped {
                            *head = mapped;
                            changed = true;
                        }
                    }
                    None => faults.push(Fault::DanglingHead {
                        sent_id: sent_id.clone(),
                        token: tok_label.clone(),
                        head: old.to_string(),
                    }),
                }
            }
        }
        if changed {
            *tok.deps_mut() = remapped;
        }
    }

    sent.reset_temp_counter();
    faults
}
