//! Rule dispatch with snapshot-then-apply semantics
//!
//! A pass is an ordered list of (predicate, action) rules evaluated once
//! per token or once per sentence. Predicates only ever see an immutable
//! pre-pass snapshot of the sentence and its index, never intermediate
//! results of the same pass, so a pass means exactly "decide from the
//! snapshot, then apply". Per-token actions run in descending token
//! position, which keeps planned positions valid across structural edits.
//!
//! The first matching rule wins for each token.

use crate::index::TreeIndex;
use crate::sentence::Sentence;

type TokenPredicate = dyn Fn(&Sentence, &TreeIndex, usize) -> bool;
type TokenAction = dyn Fn(&mut Sentence, usize);
type SentencePredicate = dyn Fn(&Sentence, &TreeIndex) -> bool;
type SentenceAction = dyn Fn(&mut Sentence);

/// One (predicate, action) pair evaluated per token.
pub struct TokenRule {
    pub name: String,
    when: Box<TokenPredicate>,
    apply: Box<TokenAction>,
}

impl TokenRule {
    pub fn new(
        name: &str,
        when: impl Fn(&Sentence, &TreeIndex, usize) -> bool + 'static,
        apply: impl Fn(&mut Sentence, usize) + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            when: Box::new(when),
            apply: Box::new(apply),
        }
    }
}

/// An ordered per-token rule pass.
#[derive(Default)]
pub struct RulePass {
    pub name: String,
    rules: Vec<TokenRule>,
}

impl RulePass {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rules: Vec::new(),
        }
    }

    pub fn rule(
        mut self,
        name: &str,
        when: impl Fn(&Sentence, &TreeIndex, usize) -> bool + 'static,
        apply: impl Fn(&mut Sentence, usize) + 'static,
    ) -> Self {
        self.rules.push(TokenRule::new(name, when, apply));
        self
    }

    /// Evaluate every rule against the pre-pass snapshot, then apply the
    /// planned actions. Returns how many tokens were acted on.
    pub fn apply(&self, sent: &mut Sentence) -> usize {
        let snapshot = sent.clone();
        let index = TreeIndex::build(&snapshot);

        let mut planned: Vec<(usize, usize)> = Vec::new();
        for pos in 0..snapshot.tokens.len() {
            for (ri, rule) in self.rules.iter().enumerate() {
                if (rule.when)(&snapshot, &index, pos) {
                    planned.push((pos, ri));
                    break;
                }
            }
        }

        for &(pos, ri) in planned.iter().rev() {
            (self.rules[ri].apply)(sent, pos);
        }
        planned.len()
    }
}

/// One (predicate, action) pair evaluated per sentence, for sentence-wide
/// rewrites.
pub struct SentenceRule {
    pub name: String,
    when: Box<SentencePredicate>,
    apply: Box<SentenceAction>,
}

impl SentenceRule {
    pub fn new(
        name: &str,
        when: impl Fn(&Sentence, &TreeIndex) -> bool + 'static,
        apply: impl Fn(&mut Sentence) + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            when: Box::new(when),
            apply: Box::new(apply),
        }
    }

    /// Decide from a snapshot of the sentence, then apply.
    pub fn apply(&self, sent: &mut Sentence) -> bool {
        let snapshot = sent.clone();
        let index = TreeIndex::build(&snapshot);
        if (self.when)(&snapshot, &index) {
            (self.apply)(sent);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Head, Token, TokenId};

    fn token(id: u32, form: &str, upos: &str, head: Head, deprel: &str) -> Token {
        let mut tok = Token::word(TokenId::Word(id), form);
        tok.upos = upos.to_string();
        tok.head = head;
        tok.deprel = deprel.to_string();
        tok
    }

    /// 1: տամ (VERB root), 2: նմա (obl, Case=Dat), 3: ի (ADP child of 4),
    /// 4: տուն (obl with ADP dependent)
    fn oblique_sentence() -> Sentence {
        let mut sent = Sentence::new();
        sent.tokens.push(token(1, "տամ", "VERB", Head::Root, "root"));
        let mut dat = token(2, "նմա", "PRON", Head::Id(TokenId::Word(1)), "obl");
        dat.feats_mut().set("Case", "Dat");
        sent.tokens.push(dat);
        sent.tokens
            .push(token(3, "ի", "ADP", Head::Id(TokenId::Word(4)), "case"));
        let mut obl = token(4, "տուն", "NOUN", Head::Id(TokenId::Word(1)), "obl");
        obl.feats_mut().set("Case", "Acc");
        sent.tokens.push(obl);
        sent
    }

    #[test]
    fn test_obl_refinement_uses_snapshot_dependent_lookup() {
        // obl becomes iobj when Case=Dat and no ADP dependent exists
        let pass = RulePass::new("refine-obl").rule(
            "obl-to-iobj",
            |sent, index, pos| {
                let tok = &sent.tokens[pos];
                tok.deprel == "obl"
                    && tok.feats.get("Case") == Some("Dat")
                    && !index.has_dependent_with_pos(sent, tok.id, "ADP")
            },
            |sent, pos| sent.tokens[pos].set_deprel("iobj"),
        );

        let mut sent = oblique_sentence();
        let applied = pass.apply(&mut sent);
        assert_eq!(applied, 1);
        assert_eq!(sent.tokens[1].deprel, "iobj");
        // the obl with an ADP dependent is untouched
        assert_eq!(sent.tokens[3].deprel, "obl");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let pass = RulePass::new("order")
            .rule(
                "first",
                |sent, _, pos| sent.tokens[pos].deprel == "obl",
                |sent, pos| sent.tokens[pos].set_deprel("advmod"),
            )
            .rule(
                "second",
                |sent, _, pos| sent.tokens[pos].deprel == "obl",
                |sent, pos| sent.tokens[pos].set_deprel("advcl"),
            );

        let mut sent = oblique_sentence();
        pass.apply(&mut sent);
        assert_eq!(sent.tokens[1].deprel, "advmod");
        assert_eq!(sent.tokens[3].deprel, "advmod");
    }

    #[test]
    fn test_predicates_see_pre_pass_state_only() {
        // A rule relabeling obl tokens must not observe the relabeling
        // done for earlier tokens in the same pass: with snapshot
        // semantics both obl tokens match, even though applying the
        // first one already changes the sentence.
        let pass = RulePass::new("snapshot").rule(
            "only-if-two-obls",
            |sent, _, pos| {
                sent.tokens[pos].deprel == "obl"
                    && sent.tokens.iter().filter(|t| t.deprel == "obl").count() == 2
            },
            |sent, pos| sent.tokens[pos].set_deprel("iobj"),
        );

        let mut sent = oblique_sentence();
        let applied = pass.apply(&mut sent);
        assert_eq!(applied, 2);
        assert_eq!(sent.tokens[1].deprel, "iobj");
        assert_eq!(sent.tokens[3].deprel, "iobj");
    }

    #[test]
    fn test_structural_actions_apply_in_descending_position() {
        // Deleting every PUNCT token plans positions from the snapshot;
        // descending application keeps them valid.
        let mut sent = Sentence::new();
        sent.tokens.push(token(1, "a", "VERB", Head::Root, "root"));
        sent.tokens
            .push(token(2, ",", "PUNCT", Head::Id(TokenId::Word(1)), "punct"));
        sent.tokens
            .push(token(3, "b", "NOUN", Head::Id(TokenId::Word(1)), "obj"));
        sent.tokens
            .push(token(4, ".", "PUNCT", Head::Id(TokenId::Word(1)), "punct"));

        let pass = RulePass::new("drop-punct").rule(
            "drop",
            |sent, _, pos| sent.tokens[pos].upos == "PUNCT",
            |sent, pos| {
                sent.tokens.remove(pos);
            },
        );

        pass.apply(&mut sent);
        let forms: Vec<_> = sent.tokens.iter().map(|t| t.form.as_str()).collect();
        assert_eq!(forms, vec!["a", "b"]);
    }

    #[test]
    fn test_sentence_rule() {
        let rule = SentenceRule::new(
            "flag-rootless",
            |sent, _| sent.root_positions().is_empty(),
            |sent| sent.set_comment("cite", "rootless"),
        );

        let mut with_root = oblique_sentence();
        assert!(!rule.apply(&mut with_root));

        let mut rootless = Sentence::new();
        rootless
            .tokens
            .push(token(1, "x", "X", Head::Undefined, "dep"));
        assert!(rule.apply(&mut rootless));
        assert_eq!(rootless.comment_value("cite"), Some("rootless"));
    }
}
