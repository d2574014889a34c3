//! Two-source sentence alignment and annotation merging
//!
//! Reconciles a scraped/cited corpus with a parsed one: sentences are
//! matched on normalized `# text` (so surface whitespace, guillemet
//! spacing and punctuation differences do not block a match), then
//! merged token by token. Heads and relations come from the donor; donor
//! UPOS is accepted only when the target's slash-separated candidate list
//! allows it, in which case FEATS ambiguities are resolved from the donor
//! too.
//!
//! A sentence that cannot be aligned is reported and left unchanged;
//! the rest of the corpus continues (partial failure, never a fatal
//! abort).

use crate::report::{Fault, FaultLog, MergeFailure};
use crate::sentence::{Corpus, Sentence};
use crate::token::FeatureSet;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]+").expect("static pattern"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static pattern"))
}

/// Canonical matching key for a sentence text: lowercased, punctuation
/// stripped (guillemets and their spacing included), whitespace
/// collapsed.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = non_word_re().replace_all(&lowered, "");
    whitespace_re()
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Merge donor annotations into one sentence. Tokens are matched by id
/// and case-insensitive form; unmatched tokens stay untouched.
pub fn merge_sentence(target: &mut Sentence, donor: &Sentence) {
    let donor_by_id: FxHashMap<_, _> = donor
        .tokens
        .iter()
        .map(|tok| (tok.id, tok))
        .collect();

    for tok in &mut target.tokens {
        let Some(donor_tok) = donor_by_id.get(&tok.id) else {
            continue;
        };
        if !tok.form.eq_ignore_ascii_case(&donor_tok.form)
            && tok.form.to_lowercase() != donor_tok.form.to_lowercase()
        {
            continue;
        }

        tok.set_head(donor_tok.head);
        tok.set_deprel(donor_tok.deprel.clone());

        // UPOS gate: the scraped side may list candidates like "NOUN/ADJ".
        let allowed = tok.upos.split('/').any(|cand| cand == donor_tok.upos);
        if allowed {
            let upos = donor_tok.upos.clone();
            tok.set_upos(upos);
            let merged = disambiguate_feats(&tok.feats, &donor_tok.feats);
            *tok.feats_mut() = merged;
        }
    }
}

/// Resolve target FEATS against the donor: a key ambiguous in the target
/// takes the donor's value when it has one; unambiguous target keys win
/// even when the donor disagrees.
fn disambiguate_feats(target: &FeatureSet, donor: &FeatureSet) -> FeatureSet {
    if target.is_empty() {
        return donor.clone();
    }
    if donor.is_empty() {
        return target.clone();
    }
    let mut merged = FeatureSet::new();
    for (key, value) in target.iter() {
        if target.is_ambiguous(key) {
            match donor.get(key) {
                Some(dv) => merged.set(key, dv),
                None => merged.add(key, value),
            }
        } else {
            merged.add(key, value);
        }
    }
    merged
}

/// Merge a donor corpus into the target corpus by normalized text.
///
/// When several donor sentences share a normalized text, the first in
/// corpus order wins. Returns the number of sentences merged; failures
/// are recorded per sentence id and processing continues.
pub fn merge_corpora(target: &mut Corpus, donor: &Corpus, faults: &mut FaultLog) -> usize {
    let mut donor_by_text: FxHashMap<String, &Sentence> = FxHashMap::default();
    for sent in &donor.sentences {
        if let Some(text) = sent.text() {
            donor_by_text.entry(normalize_text(text)).or_insert(sent);
        }
    }

    let mut merged = 0;
    for sent in &mut target.sentences {
        let sent_id = sent.sent_id().map(str::to_string);
        let Some(text) = sent.text() else {
            faults.push(Fault::IrreconcilableMerge {
                sent_id,
                reason: MergeFailure::NoTextMatch,
            });
            continue;
        };
        let Some(donor_sent) = donor_by_text.get(&normalize_text(text)) else {
            faults.push(Fault::IrreconcilableMerge {
                sent_id,
                reason: MergeFailure::NoTextMatch,
            });
            continue;
        };
        if donor_sent.tokens.len() != sent.tokens.len() {
            faults.push(Fault::IrreconcilableMerge {
                sent_id,
                reason: MergeFailure::TokenCountMismatch {
                    ours: sent.tokens.len(),
                    theirs: donor_sent.tokens.len(),
                },
            });
            continue;
        }
        merge_sentence(sent, donor_sent);
        merged += 1;
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Head, Token, TokenId};

    #[test]
    fn test_normalize_text_strips_punct_and_case() {
        assert_eq!(normalize_text("Եւ ասէ ցնոսա."), "եւ ասէ ցնոսա");
        assert_eq!(normalize_text("The  Dog,  runs!"), "the dog runs");
    }

    #[test]
    fn test_normalize_text_guillemet_spacing() {
        // guillemets and their spacing never block a match
        assert_eq!(
            normalize_text("ասէ « գնա » նա"),
            normalize_text("ասէ «գնա» նա")
        );
    }

    fn token(id: u32, form: &str, upos: &str, head: Head, deprel: &str, feats: &str) -> Token {
        let mut tok = Token::word(TokenId::Word(id), form);
        tok.upos = upos.to_string();
        tok.head = head;
        tok.deprel = deprel.to_string();
        tok.feats = FeatureSet::parse(feats);
        tok
    }

    fn scraped() -> Sentence {
        let mut sent = Sentence::new();
        sent.comments.push("# sent_id = scraped-1".to_string());
        sent.comments.push("# text = Տէր գնա".to_string());
        sent.tokens.push(token(
            1,
            "Տէր",
            "NOUN/ADJ",
            Head::Undefined,
            "_",
            "Case=Acc|Case=Nom",
        ));
        sent.tokens
            .push(token(2, "գնա", "VERB", Head::Undefined, "_", "_"));
        sent
    }

    fn parsed() -> Sentence {
        let mut sent = Sentence::new();
        sent.comments.push("# sent_id = parsed-7".to_string());
        // surface differs in case and punctuation only
        sent.comments.push("# text = տէր գնա։".to_string());
        sent.tokens.push(token(
            1,
            "Տէր",
            "NOUN",
            Head::Id(TokenId::Word(2)),
            "vocative",
            "Case=Nom|Number=Sing",
        ));
        sent.tokens
            .push(token(2, "գնա", "VERB", Head::Root, "root", "_"));
        sent
    }

    #[test]
    fn test_merge_takes_heads_and_gated_upos() {
        let mut target = Corpus::new();
        target.sentences.push(scraped());
        let mut donor = Corpus::new();
        donor.sentences.push(parsed());

        let mut faults = FaultLog::new();
        let merged = merge_corpora(&mut target, &donor, &mut faults);
        assert_eq!(merged, 1);
        assert!(faults.is_empty());

        let sent = &target.sentences[0];
        // heads and relations from the donor
        assert_eq!(sent.tokens[0].head, Head::Id(TokenId::Word(2)));
        assert_eq!(sent.tokens[0].deprel, "vocative");
        assert_eq!(sent.tokens[1].head, Head::Root);
        // UPOS accepted because NOUN is in the scraped candidate list
        assert_eq!(sent.tokens[0].upos, "NOUN");
        // ambiguous Case resolved from the donor; donor-only keys do not leak in
        assert_eq!(sent.tokens[0].feats.to_string(), "Case=Nom");
    }

    #[test]
    fn test_merge_rejects_upos_outside_candidates() {
        let mut target = Corpus::new();
        target.sentences.push(scraped());
        let mut donor_sent = parsed();
        donor_sent.tokens[0].set_upos("PROPN");
        let mut donor = Corpus::new();
        donor.sentences.push(donor_sent);

        let mut faults = FaultLog::new();
        merge_corpora(&mut target, &donor, &mut faults);

        let tok = &target.sentences[0].tokens[0];
        // heads still merged, UPOS and FEATS untouched
        assert_eq!(tok.deprel, "vocative");
        assert_eq!(tok.upos, "NOUN/ADJ");
        assert!(tok.feats.is_ambiguous("Case"));
    }

    #[test]
    fn test_no_text_match_is_reported_and_skipped() {
        let mut target = Corpus::new();
        target.sentences.push(scraped());
        let donor = Corpus::new();

        let mut faults = FaultLog::new();
        let merged = merge_corpora(&mut target, &donor, &mut faults);
        assert_eq!(merged, 0);
        assert_eq!(faults.len(), 1);
        assert_eq!(faults.iter().next().unwrap().kind(), "irreconcilable-merge");
        // target unchanged
        assert_eq!(target.sentences[0].tokens[0].head, Head::Undefined);
    }

    #[test]
    fn test_token_count_mismatch_is_reported() {
        let mut target = Corpus::new();
        target.sentences.push(scraped());
        let mut donor_sent = parsed();
        donor_sent
            .tokens
            .push(token(3, "։", "PUNCT", Head::Id(TokenId::Word(2)), "punct", "_"));
        let mut donor = Corpus::new();
        donor.sentences.push(donor_sent);

        let mut faults = FaultLog::new();
        let merged = merge_corpora(&mut target, &donor, &mut faults);
        assert_eq!(merged, 0);
        assert!(matches!(
            faults.iter().next().unwrap(),
            Fault::IrreconcilableMerge {
                reason: MergeFailure::TokenCountMismatch { ours: 2, theirs: 3 },
                ..
            }
        ));
    }

    #[test]
    fn test_partial_failure_continues_with_rest_of_corpus() {
        let mut target = Corpus::new();
        target.sentences.push(scraped());
        let mut unmatched = Sentence::new();
        unmatched.comments.push("# sent_id = lonely".to_string());
        unmatched.comments.push("# text = ոչինչ".to_string());
        unmatched
            .tokens
            .push(token(1, "ոչինչ", "PRON", Head::Undefined, "_", "_"));
        target.sentences.push(unmatched);

        let mut donor = Corpus::new();
        donor.sentences.push(parsed());

        let mut faults = FaultLog::new();
        let merged = merge_corpora(&mut target, &donor, &mut faults);
        assert_eq!(merged, 1);
        assert_eq!(faults.len(), 1);
    }
}
