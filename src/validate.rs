//! Structural invariant checks
//!
//! Every check reports faults and repairs nothing: auto-repair would mask
//! the upstream rule bug that produced the breakage. The cycle check is
//! optional and worth running wherever many local rewrites compose.

use crate::report::Fault;
use crate::sentence::Sentence;
use crate::token::{Head, TokenId};
use rustc_hash::{FxHashMap, FxHashSet};

/// Core referential integrity: unique ids, resolvable heads, no leftover
/// temporary ids, well-shaped multiword spans.
pub fn check_sentence(sent: &Sentence) -> Vec<Fault> {
    let sent_id = sent.sent_id().map(str::to_string);
    let mut faults = Vec::new();

    let mut seen: FxHashSet<TokenId> = FxHashSet::default();
    for tok in &sent.tokens {
        if !seen.insert(tok.id) {
            faults.push(Fault::DuplicateId {
                sent_id: sent_id.clone(),
                id: tok.id.to_string(),
            });
        }
        if tok.id.is_temp() || tok.span.is_some() {
            faults.push(Fault::UnresolvedTemp {
                sent_id: sent_id.clone(),
                id: tok.id.to_string(),
            });
        }
    }

    for tok in &sent.tokens {
        if tok.is_multiword() {
            continue;
        }
        if let Head::Id(head_id) = tok.head {
            let resolvable = match head_id {
                TokenId::Temp(_) => false,
                _ => seen.contains(&head_id) && !head_id.is_range(),
            };
            if !resolvable {
                faults.push(Fault::DanglingHead {
                    sent_id: sent_id.clone(),
                    token: tok.id.to_string(),
                    head: head_id.to_string(),
                });
            }
        }
    }

    faults.extend(check_spans(sent, &sent_id));
    faults
}

/// Multiword ranges must exactly cover their members, in order, with no
/// overlap between spans.
fn check_spans(sent: &Sentence, sent_id: &Option<String>) -> Vec<Fault> {
    let mut faults = Vec::new();
    let mut pos = 0;
    let mut last_end: u32 = 0;
    while pos < sent.tokens.len() {
        let tok = &sent.tokens[pos];
        if let TokenId::Range(start, end) = tok.id {
            let mut broken = None;
            if start <= last_end {
                broken = Some(format!("range {}-{} overlaps a previous span", start, end));
            } else {
                for (offset, expect) in (start..=end).enumerate() {
                    match sent.tokens.get(pos + 1 + offset).map(|t| t.id) {
                        Some(TokenId::Word(n)) if n == expect => {}
                        other => {
                            broken = Some(format!(
                                "member {} is {}",
                                expect,
                                other.map_or("missing".to_string(), |id| id.to_string())
                            ));
                            break;
                        }
                    }
                }
            }
            if let Some(detail) = broken {
                faults.push(Fault::BrokenSpan {
                    sent_id: sent_id.clone(),
                    id: tok.id.to_string(),
                    detail,
                });
            }
            last_end = end;
        }
        pos += 1;
    }
    faults
}

/// Post-renumber property: atomic ids are exactly `1..N` in order.
pub fn check_sequential(sent: &Sentence) -> Vec<Fault> {
    let sent_id = sent.sent_id().map(str::to_string);
    let mut faults = Vec::new();
    let mut expected: u32 = 1;
    for tok in &sent.tokens {
        if tok.is_multiword() {
            continue;
        }
        if tok.id != TokenId::Word(expected) {
            faults.push(Fault::NonSequentialId {
                sent_id: sent_id.clone(),
                id: tok.id.to_string(),
            });
        }
        expected += 1;
    }
    faults
}

/// After full processing a sentence has exactly one root.
pub fn check_single_root(sent: &Sentence) -> Vec<Fault> {
    let sent_id = sent.sent_id().map(str::to_string);
    let roots = sent.root_positions();
    match roots.len() {
        1 => Vec::new(),
        0 => vec![Fault::NoRoot { sent_id }],
        _ => vec![Fault::MultipleRoots {
            sent_id,
            ids: roots
                .iter()
                .map(|&p| sent.tokens[p].id.to_string())
                .collect(),
        }],
    }
}

/// Optional acyclicity check: follows head chains and reports any cycle
/// once, by the ids on it.
pub fn check_cycles(sent: &Sentence) -> Vec<Fault> {
    let sent_id = sent.sent_id().map(str::to_string);
    let mut faults = Vec::new();

    let heads: FxHashMap<TokenId, TokenId> = sent
        .tokens
        .iter()
        .filter(|t| !t.is_multiword())
        .filter_map(|t| t.head.id().map(|h| (t.id, h)))
        .collect();

    // 0 = unvisited, 1 = on the current chain, 2 = cleared
    let mut state: FxHashMap<TokenId, u8> = FxHashMap::default();
    for tok in &sent.tokens {
        if tok.is_multiword() || state.get(&tok.id).copied().unwrap_or(0) != 0 {
            continue;
        }
        let mut chain = Vec::new();
        let mut cur = tok.id;
        loop {
            match state.get(&cur).copied().unwrap_or(0) {
                1 => {
                    // found a cycle; report the part of the chain on it
                    let cycle_start = chain.iter().position(|&id| id == cur).unwrap_or(0);
                    faults.push(Fault::HeadCycle {
                        sent_id: sent_id.clone(),
                        ids: chain[cycle_start..]
                            .iter()
                            .map(|id: &TokenId| id.to_string())
                            .collect(),
                    });
                    break;
                }
                2 => break,
                _ => {}
            }
            state.insert(cur, 1);
            chain.push(cur);
            match heads.get(&cur) {
                Some(&next) => cur = next,
                None => break,
            }
        }
        for id in chain {
            state.insert(id, 2);
        }
    }
    faults
}
