//! Structural edit primitives
//!
//! Split, merge, reattach, promote, insert, delete. Each operates on a
//! `&mut Sentence` plus a [`TreeIndex`] snapshot built before the edit;
//! the index is stale afterwards and the caller rebuilds it. The
//! primitives are rule-agnostic: conditions over lexical identity, POS,
//! relation or feature presence belong to rule tables and dispatch
//! passes, never in here.
//!
//! New tokens receive temporary ids from the sentence's allocator; the
//! renumbering pass turns them into real sequential ids.

use crate::index::TreeIndex;
use crate::sentence::Sentence;
use crate::token::{FeatureSet, Head, MiscSet, Token, TokenId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("no token at position {0}")]
    OutOfBounds(usize),

    #[error("operation does not apply to a multiword placeholder row")]
    PlaceholderTarget,

    #[error("split needs at least two parts")]
    TooFewParts,

    #[error("split parts spell {parts:?}, the original form is {original:?}")]
    SplitFormMismatch { original: String, parts: String },

    #[error("part index {0} out of range")]
    BadPartIndex(usize),

    #[error("merge targets must be two distinct atomic tokens")]
    BadMergeTarget,

    #[error("cannot delete token {id}: dependents remain attached")]
    DeleteWithDependents { id: TokenId },
}

/// Where a split part attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attachment {
    /// Keep the original token's head.
    #[default]
    InheritHead,
    /// Attach to a sibling part by index.
    ToPart(usize),
    /// Attach to an explicit head (possibly `Undefined`).
    Explicit(Head),
}

/// One part of a split. Unset attributes inherit from the original token.
#[derive(Debug, Clone, Default)]
pub struct SplitPart {
    pub form: String,
    pub lemma: Option<String>,
    pub upos: Option<String>,
    pub xpos: Option<String>,
    pub feats: Option<FeatureSet>,
    pub deprel: Option<String>,
    pub misc: Option<MiscSet>,
    pub attach: Attachment,
}

impl SplitPart {
    pub fn new(form: &str) -> Self {
        Self {
            form: form.to_string(),
            ..Default::default()
        }
    }

    /// A punctuation part attached to a sibling part: its own lemma,
    /// `PUNCT`/`punct`, no inherited features.
    pub fn punct(form: &str, of_part: usize) -> Self {
        Self {
            form: form.to_string(),
            lemma: Some(form.to_string()),
            upos: Some("PUNCT".to_string()),
            xpos: Some("_".to_string()),
            feats: Some(FeatureSet::new()),
            deprel: Some("punct".to_string()),
            misc: Some(MiscSet::new()),
            attach: Attachment::ToPart(of_part),
        }
    }
}

/// Which part receives the original token's dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartChoice {
    /// The first part that is not punctuation (falls back to part 0).
    #[default]
    FirstNonPunct,
    Part(usize),
}

#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    /// Emit a synthetic multiword placeholder carrying the original
    /// surface form over the parts.
    pub make_span: bool,
    /// Part receiving the original token's dependents.
    pub receiver: PartChoice,
    /// Dependents with these relations go to a specific part instead of
    /// the receiver; first matching route wins.
    pub routes: Vec<(Vec<String>, usize)>,
}

/// Replace the token at `pos` with ordered parts.
///
/// Without a span, concatenating the parts' forms must reconstruct the
/// original form exactly (parts are adjacent, no implicit spaces). With
/// `make_span`, the placeholder row keeps the original surface and the
/// parts are free syntactic words underneath it.
///
/// Returns the temporary ids of the parts in order.
pub fn split(
    sent: &mut Sentence,
    index: &TreeIndex,
    pos: usize,
    parts: &[SplitPart],
    opts: &SplitOptions,
) -> Result<Vec<TokenId>, EditError> {
    let original = sent
        .tokens
        .get(pos)
        .ok_or(EditError::OutOfBounds(pos))?
        .clone();
    if original.is_multiword() {
        return Err(EditError::PlaceholderTarget);
    }
    if parts.len() < 2 {
        return Err(EditError::TooFewParts);
    }
    if !opts.make_span {
        let concat: String = parts.iter().map(|p| p.form.as_str()).collect();
        if concat != original.form {
            return Err(EditError::SplitFormMismatch {
                original: original.form.clone(),
                parts: concat,
            });
        }
    }

    let receiver = match opts.receiver {
        PartChoice::Part(i) if i < parts.len() => i,
        PartChoice::Part(i) => return Err(EditError::BadPartIndex(i)),
        PartChoice::FirstNonPunct => parts
            .iter()
            .position(|p| {
                let upos = p.upos.as_deref().unwrap_or(&original.upos);
                let rel = p.deprel.as_deref().unwrap_or(&original.deprel);
                upos != "PUNCT" && rel != "punct"
            })
            .unwrap_or(0),
    };
    for (_, part) in &opts.routes {
        if *part >= parts.len() {
            return Err(EditError::BadPartIndex(*part));
        }
    }

    let part_ids: Vec<TokenId> = parts.iter().map(|_| sent.alloc_temp()).collect();

    let mut rows = Vec::with_capacity(parts.len() + 1);
    if opts.make_span {
        let span_id = sent.alloc_temp();
        rows.push(Token::placeholder_span(span_id, &original.form, parts.len()));
    }
    for (i, part) in parts.iter().enumerate() {
        let mut tok = Token::word(part_ids[i], &part.form);
        tok.lemma = part.lemma.clone().unwrap_or_else(|| original.lemma.clone());
        tok.upos = part.upos.clone().unwrap_or_else(|| original.upos.clone());
        tok.xpos = part.xpos.clone().unwrap_or_else(|| original.xpos.clone());
        tok.feats = part.feats.clone().unwrap_or_else(|| original.feats.clone());
        tok.misc = part.misc.clone().unwrap_or_else(|| original.misc.clone());
        tok.deprel = part
            .deprel
            .clone()
            .unwrap_or_else(|| original.deprel.clone());
        tok.head = match part.attach {
            Attachment::InheritHead => original.head,
            Attachment::ToPart(j) => {
                if j >= parts.len() {
                    return Err(EditError::BadPartIndex(j));
                }
                Head::Id(part_ids[j])
            }
            Attachment::Explicit(h) => h,
        };
        rows.push(tok);
    }

    // Repoint dependents from the snapshot before touching row order.
    for &dep_pos in index.dependents(original.id) {
        if dep_pos == pos {
            continue;
        }
        let target = opts
            .routes
            .iter()
            .find(|(rels, _)| rels.iter().any(|r| *r == sent.tokens[dep_pos].deprel))
            .map(|(_, part)| *part)
            .unwrap_or(receiver);
        sent.tokens[dep_pos].set_head(Head::Id(part_ids[target]));
    }
    remap_dep_refs(sent, original.id, Head::Id(part_ids[receiver]));

    // A split inside an existing span widens it.
    if let Some(q) = covering_span(sent, pos) {
        grow_span(sent, q, parts.len() - 1 + usize::from(opts.make_span));
    }

    sent.tokens.splice(pos..=pos, rows);
    Ok(part_ids)
}

/// Merge two atomic tokens: the token at `pos_a` survives and absorbs the
/// other's characters into form and lemma (in surface order); the
/// absorbed token's dependents are reattached to the survivor.
pub fn merge(
    sent: &mut Sentence,
    index: &TreeIndex,
    pos_a: usize,
    pos_b: usize,
) -> Result<(), EditError> {
    if pos_a == pos_b {
        return Err(EditError::BadMergeTarget);
    }
    let len = sent.tokens.len();
    if pos_a >= len {
        return Err(EditError::OutOfBounds(pos_a));
    }
    if pos_b >= len {
        return Err(EditError::OutOfBounds(pos_b));
    }
    if sent.tokens[pos_a].is_multiword() || sent.tokens[pos_b].is_multiword() {
        return Err(EditError::BadMergeTarget);
    }

    let absorbed = sent.tokens[pos_b].clone();
    let survivor_id = sent.tokens[pos_a].id;

    {
        let a = &mut sent.tokens[pos_a];
        let (form, lemma) = if pos_a < pos_b {
            (
                format!("{}{}", a.form, absorbed.form),
                join_lemmas(&a.lemma, &absorbed.lemma),
            )
        } else {
            (
                format!("{}{}", absorbed.form, a.form),
                join_lemmas(&absorbed.lemma, &a.lemma),
            )
        };
        a.set_form(form);
        a.set_lemma(lemma);
        if a.head == Head::Id(absorbed.id) {
            a.set_head(absorbed.head);
        }
    }

    for &dep_pos in index.dependents(absorbed.id) {
        if dep_pos == pos_a {
            continue;
        }
        sent.tokens[dep_pos].set_head(Head::Id(survivor_id));
    }
    remap_dep_refs(sent, absorbed.id, Head::Id(survivor_id));

    let covering = covering_span(sent, pos_b);
    sent.tokens.remove(pos_b);
    if let Some(q) = covering {
        shrink_span(sent, q);
    }
    Ok(())
}

fn join_lemmas(first: &str, second: &str) -> String {
    match (first, second) {
        ("_", "_") => "_".to_string(),
        (l, "_") | ("_", l) => l.to_string(),
        (a, b) => format!("{}{}", a, b),
    }
}

/// Set a token's head (or clear it with `Head::Undefined`, which removes
/// the head attribute entirely) and optionally its relation.
///
/// Does not verify global acyclicity; run `validate::check_cycles` when
/// that matters.
pub fn reattach(
    sent: &mut Sentence,
    pos: usize,
    new_head: Head,
    new_relation: Option<&str>,
) -> Result<(), EditError> {
    let tok = sent.tokens.get_mut(pos).ok_or(EditError::OutOfBounds(pos))?;
    if tok.is_multiword() {
        return Err(EditError::PlaceholderTarget);
    }
    tok.set_head(new_head);
    if let Some(rel) = new_relation {
        tok.set_deprel(rel);
    }
    Ok(())
}

/// Promote the token at `pos` into the place of `ancestor_pos`: the node
/// inherits the ancestor's head and relation, the ancestor's other
/// dependents are reattached to the node (non-punctuation ones relabeled
/// with `demoted_relation` when given), and the ancestor is deleted.
pub fn promote(
    sent: &mut Sentence,
    index: &TreeIndex,
    pos: usize,
    ancestor_pos: usize,
    demoted_relation: Option<&str>,
) -> Result<(), EditError> {
    if pos == ancestor_pos {
        return Err(EditError::BadMergeTarget);
    }
    let len = sent.tokens.len();
    if pos >= len {
        return Err(EditError::OutOfBounds(pos));
    }
    if ancestor_pos >= len {
        return Err(EditError::OutOfBounds(ancestor_pos));
    }
    if sent.tokens[pos].is_multiword() || sent.tokens[ancestor_pos].is_multiword() {
        return Err(EditError::PlaceholderTarget);
    }

    let ancestor = sent.tokens[ancestor_pos].clone();
    let node_id = sent.tokens[pos].id;

    sent.tokens[pos].set_head(ancestor.head);
    sent.tokens[pos].set_deprel(ancestor.deprel.clone());

    for &dep_pos in index.dependents(ancestor.id) {
        if dep_pos == pos {
            continue;
        }
        let dep = &mut sent.tokens[dep_pos];
        let keep_relation = dep.is_punct();
        dep.set_head(Head::Id(node_id));
        if let Some(rel) = demoted_relation
            && !keep_relation
        {
            dep.set_deprel(rel);
        }
    }
    remap_dep_refs(sent, ancestor.id, Head::Id(node_id));

    let covering = covering_span(sent, ancestor_pos);
    sent.tokens.remove(ancestor_pos);
    if let Some(q) = covering {
        shrink_span(sent, q);
    }
    Ok(())
}

/// Fields for a synthetic token. Unset string fields default to `_`.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub form: String,
    pub lemma: String,
    pub upos: String,
    pub xpos: String,
    pub feats: FeatureSet,
    pub head: Head,
    pub deprel: String,
    pub misc: MiscSet,
}

impl Default for NewToken {
    fn default() -> Self {
        Self {
            form: String::new(),
            lemma: "_".to_string(),
            upos: "_".to_string(),
            xpos: "_".to_string(),
            feats: FeatureSet::new(),
            head: Head::Undefined,
            deprel: "_".to_string(),
            misc: MiscSet::new(),
        }
    }
}

/// Create a new token (an inferred punctuation mark, an inferred clitic)
/// at a row position, with explicit head and relation. Returns its
/// temporary id.
pub fn insert_synthetic(
    sent: &mut Sentence,
    pos: usize,
    fields: NewToken,
) -> Result<TokenId, EditError> {
    if pos > sent.tokens.len() {
        return Err(EditError::OutOfBounds(pos));
    }
    if let Some(q) = covering_span(sent, pos) {
        grow_span(sent, q, 1);
    }
    let id = sent.alloc_temp();
    let mut tok = Token::word(id, &fields.form);
    tok.lemma = fields.lemma;
    tok.upos = fields.upos;
    tok.xpos = fields.xpos;
    tok.feats = fields.feats;
    tok.head = fields.head;
    tok.deprel = fields.deprel;
    tok.misc = fields.misc;
    sent.tokens.insert(pos, tok);
    Ok(id)
}

/// Remove the token at `pos`. Deleting an atomic token that still has
/// dependents is an invariant violation; reattach them first. Deleting a
/// placeholder row frees its members.
pub fn delete(sent: &mut Sentence, index: &TreeIndex, pos: usize) -> Result<Token, EditError> {
    let tok = sent.tokens.get(pos).ok_or(EditError::OutOfBounds(pos))?;
    if tok.is_multiword() {
        return Ok(sent.tokens.remove(pos));
    }
    if !index.dependents(tok.id).is_empty() {
        return Err(EditError::DeleteWithDependents { id: tok.id });
    }
    let covering = covering_span(sent, pos);
    let removed = sent.tokens.remove(pos);
    if let Some(q) = covering {
        shrink_span(sent, q);
    }
    Ok(removed)
}

/// Position of the placeholder row covering the member at `pos`, if any.
/// A placeholder at `q` with width `w` covers rows `q+1 ..= q+w`.
fn covering_span(sent: &Sentence, pos: usize) -> Option<usize> {
    for q in (0..pos.min(sent.tokens.len())).rev() {
        if let Some(w) = sent.tokens[q].span_width()
            && sent.tokens[q].is_multiword()
        {
            if pos <= q + w {
                return Some(q);
            }
            // Spans do not overlap; the first placeholder found decides.
            return None;
        }
    }
    None
}

fn grow_span(sent: &mut Sentence, q: usize, by: usize) {
    if let Some(w) = sent.tokens[q].span_width() {
        sent.tokens[q].span = Some(w + by);
        sent.tokens[q].mark_edited();
    }
}

/// Shrink a placeholder by one member; a span left with fewer than two
/// members is dropped entirely.
fn shrink_span(sent: &mut Sentence, q: usize) {
    if let Some(w) = sent.tokens[q].span_width() {
        if w <= 2 {
            sent.tokens.remove(q);
        } else {
            sent.tokens[q].span = Some(w - 1);
            sent.tokens[q].mark_edited();
        }
    }
}

/// Rewrite enhanced-dependency references to `old` across the sentence.
fn remap_dep_refs(sent: &mut Sentence, old: TokenId, new: Head) {
    for tok in &mut sent.tokens {
        if tok.deps.iter().any(|(h, _)| *h == Head::Id(old)) {
            for (h, _) in tok.deps_mut() {
                if *h == Head::Id(old) {
                    *h = new;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renumber::renumber;

    fn token(id: u32, form: &str, upos: &str, head: Head, deprel: &str) -> Token {
        let mut tok = Token::word(TokenId::Word(id), form);
        tok.upos = upos.to_string();
        tok.head = head;
        tok.deprel = deprel.to_string();
        tok.lemma = form.to_string();
        tok
    }

    /// 2: էր (root) ← 1: Աւա՜ղ (discourse), 3: ասէ (ccomp)
    fn exclamation_sentence() -> Sentence {
        let mut sent = Sentence::new();
        sent.tokens.push(token(
            1,
            "Աւա՜ղ",
            "INTJ",
            Head::Id(TokenId::Word(2)),
            "discourse",
        ));
        sent.tokens.push(token(2, "էր", "VERB", Head::Root, "root"));
        sent.tokens
            .push(token(3, "ասէ", "VERB", Head::Id(TokenId::Word(2)), "ccomp"));
        sent
    }

    #[test]
    fn test_split_with_span_matches_exclamation_contract() {
        let mut sent = exclamation_sentence();
        let index = TreeIndex::build(&sent);

        let parts = [SplitPart::new("Աւաղ"), SplitPart::punct("՜", 0)];
        let opts = SplitOptions {
            make_span: true,
            ..Default::default()
        };
        split(&mut sent, &index, 0, &parts, &opts).unwrap();
        renumber(&mut sent);

        assert_eq!(sent.tokens[0].id, TokenId::Range(1, 2));
        assert_eq!(sent.tokens[0].form, "Աւա՜ղ");
        assert_eq!(sent.tokens[1].id, TokenId::Word(1));
        assert_eq!(sent.tokens[1].form, "Աւաղ");
        assert_eq!(sent.tokens[2].id, TokenId::Word(2));
        assert_eq!(sent.tokens[2].form, "՜");
        assert_eq!(sent.tokens[2].head, Head::Id(TokenId::Word(1)));
        assert_eq!(sent.tokens[2].deprel, "punct");
        // the base keeps the original attachment
        assert_eq!(sent.tokens[1].head, Head::Id(TokenId::Word(3)));
        assert_eq!(sent.tokens[1].deprel, "discourse");
    }

    #[test]
    fn test_split_without_span_checks_form() {
        let mut sent = exclamation_sentence();
        let index = TreeIndex::build(&sent);
        let parts = [SplitPart::new("Աւա"), SplitPart::new("ղ")];
        let err = split(&mut sent, &index, 0, &parts, &SplitOptions::default()).unwrap_err();
        assert!(matches!(err, EditError::SplitFormMismatch { .. }));
    }

    #[test]
    fn test_split_repoints_dependents_to_first_non_punct() {
        // 1: ibrewz (root) ← 2: dependent
        let mut sent = Sentence::new();
        sent.tokens.push(token(1, "ibrewz", "ADP", Head::Root, "root"));
        sent.tokens
            .push(token(2, "tun", "NOUN", Head::Id(TokenId::Word(1)), "obl"));
        let index = TreeIndex::build(&sent);

        let mut second = SplitPart::new("z");
        second.lemma = Some("z".to_string());
        second.upos = Some("PART".to_string());
        second.deprel = Some("aux".to_string());
        second.attach = Attachment::ToPart(0);
        let parts = [SplitPart::new("ibrew"), second];

        let ids = split(&mut sent, &index, 0, &parts, &SplitOptions::default()).unwrap();
        assert_eq!(sent.tokens.len(), 3);
        // dependent follows the first part
        assert_eq!(sent.tokens[2].head, Head::Id(ids[0]));
        // intra-split attachment
        assert_eq!(sent.tokens[1].head, Head::Id(ids[0]));

        renumber(&mut sent);
        assert_eq!(sent.tokens[0].form, "ibrew");
        assert_eq!(sent.tokens[1].form, "z");
        assert_eq!(sent.tokens[1].head, Head::Id(TokenId::Word(1)));
        assert_eq!(sent.tokens[2].head, Head::Id(TokenId::Word(1)));
    }

    #[test]
    fn test_split_routes_override_receiver() {
        let mut sent = Sentence::new();
        sent.tokens.push(token(1, "ab", "VERB", Head::Root, "root"));
        sent.tokens
            .push(token(2, ",", "PUNCT", Head::Id(TokenId::Word(1)), "punct"));
        sent.tokens
            .push(token(3, "x", "NOUN", Head::Id(TokenId::Word(1)), "obj"));
        let index = TreeIndex::build(&sent);

        let parts = [SplitPart::new("a"), SplitPart::new("b")];
        let opts = SplitOptions {
            routes: vec![(vec!["punct".to_string()], 1)],
            ..Default::default()
        };
        let ids = split(&mut sent, &index, 0, &parts, &opts).unwrap();
        assert_eq!(sent.tokens[2].head, Head::Id(ids[1])); // punct routed to part 1
        assert_eq!(sent.tokens[3].head, Head::Id(ids[0])); // obj to receiver
    }

    #[test]
    fn test_merge_reconstructs_split_form() {
        let mut sent = Sentence::new();
        sent.tokens.push(token(1, "Աւաղ", "INTJ", Head::Root, "root"));
        let index = TreeIndex::build(&sent);
        let parts = [SplitPart::new("Աւա"), SplitPart::new("ղ")];
        split(&mut sent, &index, 0, &parts, &SplitOptions::default()).unwrap();

        let index = TreeIndex::build(&sent);
        merge(&mut sent, &index, 0, 1).unwrap();
        assert_eq!(sent.tokens.len(), 1);
        assert_eq!(sent.tokens[0].form, "Աւաղ");
    }

    #[test]
    fn test_merge_reattaches_absorbed_dependents() {
        let mut sent = Sentence::new();
        sent.tokens.push(token(1, "Աւա", "X", Head::Root, "root"));
        sent.tokens
            .push(token(2, "՜ղ", "X", Head::Id(TokenId::Word(1)), "dep"));
        sent.tokens
            .push(token(3, "k", "X", Head::Id(TokenId::Word(2)), "dep"));
        let index = TreeIndex::build(&sent);

        merge(&mut sent, &index, 0, 1).unwrap();
        assert_eq!(sent.tokens[0].form, "Աւա՜ղ");
        assert_eq!(sent.tokens[1].head, Head::Id(TokenId::Word(1)));
    }

    #[test]
    fn test_reattach_to_undefined_clears_head() {
        let mut sent = exclamation_sentence();
        reattach(&mut sent, 2, Head::Undefined, None).unwrap();
        assert_eq!(sent.tokens[2].head, Head::Undefined);
        // relation untouched when not given
        assert_eq!(sent.tokens[2].deprel, "ccomp");
    }

    #[test]
    fn test_reattach_sets_relation() {
        let mut sent = exclamation_sentence();
        reattach(&mut sent, 0, Head::Id(TokenId::Word(3)), Some("advmod")).unwrap();
        assert_eq!(sent.tokens[0].head, Head::Id(TokenId::Word(3)));
        assert_eq!(sent.tokens[0].deprel, "advmod");
    }

    #[test]
    fn test_promote_inherits_and_demotes() {
        // 1: empty (root) with dependents 2 (nsubj), 3 (obj), 4 (punct)
        let mut sent = Sentence::new();
        sent.tokens.push(token(1, "E", "VERB", Head::Root, "root"));
        sent.tokens
            .push(token(2, "na", "PRON", Head::Id(TokenId::Word(1)), "nsubj"));
        sent.tokens
            .push(token(3, "tun", "NOUN", Head::Id(TokenId::Word(1)), "obj"));
        sent.tokens
            .push(token(4, ".", "PUNCT", Head::Id(TokenId::Word(1)), "punct"));
        let index = TreeIndex::build(&sent);

        promote(&mut sent, &index, 1, 0, Some("orphan")).unwrap();

        assert_eq!(sent.tokens.len(), 3);
        assert_eq!(sent.tokens[0].form, "na");
        assert_eq!(sent.tokens[0].head, Head::Root);
        assert_eq!(sent.tokens[0].deprel, "root");
        // demoted sibling
        assert_eq!(sent.tokens[1].head, Head::Id(TokenId::Word(2)));
        assert_eq!(sent.tokens[1].deprel, "orphan");
        // punctuation keeps its relation
        assert_eq!(sent.tokens[2].deprel, "punct");
        assert_eq!(sent.tokens[2].head, Head::Id(TokenId::Word(2)));
    }

    #[test]
    fn test_insert_synthetic_gets_temp_id() {
        let mut sent = exclamation_sentence();
        let fields = NewToken {
            form: "։".to_string(),
            lemma: "։".to_string(),
            upos: "PUNCT".to_string(),
            head: Head::Id(TokenId::Word(2)),
            deprel: "punct".to_string(),
            ..Default::default()
        };
        let id = insert_synthetic(&mut sent, 3, fields).unwrap();
        assert!(id.is_temp());
        assert_eq!(sent.tokens[3].form, "։");

        renumber(&mut sent);
        assert_eq!(sent.tokens[3].id, TokenId::Word(4));
        assert_eq!(sent.tokens[3].head, Head::Id(TokenId::Word(2)));
    }

    #[test]
    fn test_delete_with_dependents_is_refused() {
        let mut sent = exclamation_sentence();
        let index = TreeIndex::build(&sent);
        let err = delete(&mut sent, &index, 1).unwrap_err();
        assert_eq!(
            err,
            EditError::DeleteWithDependents {
                id: TokenId::Word(2)
            }
        );
    }

    #[test]
    fn test_delete_leaf() {
        let mut sent = exclamation_sentence();
        let index = TreeIndex::build(&sent);
        let removed = delete(&mut sent, &index, 0).unwrap();
        assert_eq!(removed.form, "Աւա՜ղ");
        assert_eq!(sent.tokens.len(), 2);
    }

    #[test]
    fn test_delete_span_member_shrinks_placeholder() {
        // 1-2 placeholder over tokens 1 and 2, then token 3
        let mut sent = Sentence::new();
        sent.tokens.push(Token::word(TokenId::Range(1, 2), "du"));
        sent.tokens.push(token(1, "de", "ADP", Head::Id(TokenId::Word(3)), "case"));
        sent.tokens.push(token(2, "le", "DET", Head::Id(TokenId::Word(3)), "det"));
        sent.tokens.push(token(3, "chat", "NOUN", Head::Root, "root"));
        let index = TreeIndex::build(&sent);

        delete(&mut sent, &index, 2).unwrap();
        // span of width 2 lost a member and is dropped entirely
        assert_eq!(sent.tokens.len(), 2);
        assert!(!sent.tokens[0].is_multiword());
        assert_eq!(sent.tokens[0].form, "de");
    }
}
