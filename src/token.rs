//! Token records for dependency-annotated sentences
//!
//! A token is an attribute bag in the 10-column CoNLL-U shape: id, form,
//! lemma, UPOS, XPOS, FEATS, head, deprel, DEPS, MISC. Multiword-token
//! placeholder rows and tokens freshly created by edits live in the same
//! type, distinguished by their id variant and a transient span marker.

use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a token row within a sentence.
///
/// `Temp` ids are sentinels handed out by [`crate::sentence::Sentence::alloc_temp`]
/// for tokens created mid-pipeline; the renumbering pass maps them to real
/// sequential ids. They never reach serialized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenId {
    /// Ordinary atomic token id.
    Word(u32),
    /// Multiword-token placeholder range `start-end`.
    Range(u32, u32),
    /// Sentinel id for a token created by an edit, resolved at renumbering.
    Temp(u32),
}

impl TokenId {
    /// True for multiword placeholder range ids.
    pub fn is_range(&self) -> bool {
        matches!(self, TokenId::Range(_, _))
    }

    /// True for temporary sentinel ids.
    pub fn is_temp(&self) -> bool {
        matches!(self, TokenId::Temp(_))
    }

    /// The numeric value of an ordinary id, if this is one.
    pub fn as_word(&self) -> Option<u32> {
        match self {
            TokenId::Word(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenId::Word(n) => write!(f, "{}", n),
            TokenId::Range(a, b) => write!(f, "{}-{}", a, b),
            // Diagnostic rendering only; serializers reject temp ids.
            TokenId::Temp(n) => write!(f, "#{}", n),
        }
    }
}

/// Serialization dialect a cached raw line belongs to.
///
/// A raw line only round-trips through the writer of the dialect it was
/// read from; converting between dialects serializes canonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Tab-separated 10-column token lines.
    Conllu,
    /// Legacy `<token .../>` attribute-bag lines.
    Proiel,
}

/// A token's governor reference.
///
/// `Undefined` means the head attribute is absent entirely (serialized as
/// `_`); reattaching a token to `Undefined` clears the attribute, it does
/// not make the token a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Head {
    /// Attached to the sentence root (serialized `0`).
    Root,
    /// Governed by the token with this id.
    Id(TokenId),
    /// No head attribute (serialized `_`).
    Undefined,
}

impl Head {
    /// The referenced token id, if any.
    pub fn id(&self) -> Option<TokenId> {
        match self {
            Head::Id(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Head::Root => write!(f, "0"),
            Head::Id(id) => write!(f, "{}", id),
            Head::Undefined => write!(f, "_"),
        }
    }
}

/// De-duplicated set of `Key=Value` morphological features.
///
/// Scraped sources may carry several values for one key (an unresolved
/// ambiguity such as `Case=Acc|Case=Nom`), so this is a set of pairs, not
/// a map. Serialization is sorted and pipe-joined; `_` when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    pairs: BTreeSet<(String, String)>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a pipe-separated FEATS field; `_` yields the empty set.
    /// Items without `=` are ignored.
    pub fn parse(s: &str) -> Self {
        let mut feats = Self::new();
        if s == "_" || s.is_empty() {
            return feats;
        }
        for item in s.split('|') {
            if let Some((k, v)) = item.split_once('=') {
                feats.pairs.insert((k.to_string(), v.to_string()));
            }
        }
        feats
    }

    /// First value recorded for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values recorded for `key`, in sorted order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// True when `key` carries more than one value.
    pub fn is_ambiguous(&self, key: &str) -> bool {
        self.values(key).nth(1).is_some()
    }

    /// Replace every value of `key` with a single one.
    pub fn set(&mut self, key: &str, value: &str) {
        self.pairs.retain(|(k, _)| k != key);
        self.pairs.insert((key.to_string(), value.to_string()));
    }

    /// Add one `key=value` pair, keeping any existing values of `key`.
    pub fn add(&mut self, key: &str, value: &str) {
        self.pairs.insert((key.to_string(), value.to_string()));
    }

    /// Remove every value of `key`; true when something was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.pairs.len();
        self.pairs.retain(|(k, _)| k != key);
        self.pairs.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pairs.is_empty() {
            return write!(f, "_");
        }
        let mut first = true;
        for (k, v) in &self.pairs {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{}={}", k, v)?;
            first = false;
        }
        Ok(())
    }
}

/// De-duplicated set of MISC annotations: `Key=Value` pairs and bare flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiscSet {
    items: BTreeSet<(String, Option<String>)>,
}

impl MiscSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a pipe-separated MISC field; `_` yields the empty set.
    pub fn parse(s: &str) -> Self {
        let mut misc = Self::new();
        if s == "_" || s.is_empty() {
            return misc;
        }
        for item in s.split('|') {
            match item.split_once('=') {
                Some((k, v)) => {
                    misc.items.insert((k.to_string(), Some(v.to_string())));
                }
                None => {
                    misc.items.insert((item.to_string(), None));
                }
            }
        }
        misc
    }

    /// First value recorded for `key`, if any (bare flags have no value).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(k, v)| k == key && v.is_some())
            .and_then(|(_, v)| v.as_deref())
    }

    /// True when `key` is present, with or without a value.
    pub fn contains(&self, key: &str) -> bool {
        self.items.iter().any(|(k, _)| k == key)
    }

    /// Replace every entry under `key` with `key=value`.
    pub fn set(&mut self, key: &str, value: &str) {
        self.items.retain(|(k, _)| k != key);
        self.items.insert((key.to_string(), Some(value.to_string())));
    }

    /// Insert a bare flag.
    pub fn set_flag(&mut self, key: &str) {
        self.items.retain(|(k, _)| k != key);
        self.items.insert((key.to_string(), None));
    }

    /// Remove every entry under `key`; true when something was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|(k, _)| k != key);
        self.items.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }
}

impl fmt::Display for MiscSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            return write!(f, "_");
        }
        let mut first = true;
        for (k, v) in &self.items {
            if !first {
                write!(f, "|")?;
            }
            match v {
                Some(v) => write!(f, "{}={}", k, v)?,
                None => write!(f, "{}", k)?,
            }
            first = false;
        }
        Ok(())
    }
}

/// One row of a sentence: an atomic token or a multiword placeholder.
///
/// Unset string fields hold the literal `_`. The `span` marker and the
/// raw-line cache are transient working state: `span` flags a synthetic
/// multiword placeholder covering the next `n` atomic tokens (parsed
/// placeholders carry a `Range` id instead), and the raw cache holds the
/// original input line so unedited rows serialize byte-for-byte.
///
/// Mutating a field directly leaves the raw cache stale; go through the
/// `set_*` helpers or call [`Token::mark_edited`] first. Every operation
/// in this crate does.
#[derive(Debug, Clone)]
pub struct Token {
    pub id: TokenId,
    pub form: String,
    pub lemma: String,
    pub upos: String,
    pub xpos: String,
    pub feats: FeatureSet,
    pub head: Head,
    pub deprel: String,
    /// Enhanced dependencies: (head, relation) pairs.
    pub deps: Vec<(Head, String)>,
    pub misc: MiscSet,
    /// Synthetic multiword placeholder covering the next `n` atomic tokens.
    pub span: Option<usize>,
    raw: Option<(Dialect, Box<str>)>,
}

impl Token {
    /// A bare atomic token with every other field unset.
    pub fn word(id: TokenId, form: &str) -> Self {
        Self {
            id,
            form: form.to_string(),
            lemma: "_".to_string(),
            upos: "_".to_string(),
            xpos: "_".to_string(),
            feats: FeatureSet::new(),
            head: Head::Undefined,
            deprel: "_".to_string(),
            deps: Vec::new(),
            misc: MiscSet::new(),
            span: None,
            raw: None,
        }
    }

    /// A synthetic multiword placeholder row covering the next `members`
    /// atomic tokens. Its surface form is the original orthographic unit.
    pub fn placeholder_span(id: TokenId, form: &str, members: usize) -> Self {
        let mut tok = Self::word(id, form);
        tok.span = Some(members);
        tok
    }

    /// True for multiword placeholder rows, parsed or synthetic.
    pub fn is_multiword(&self) -> bool {
        self.id.is_range() || self.span.is_some()
    }

    /// Number of atomic tokens this placeholder covers, if it is one.
    pub fn span_width(&self) -> Option<usize> {
        if let Some(n) = self.span {
            return Some(n);
        }
        match self.id {
            TokenId::Range(a, b) if b >= a => Some((b - a + 1) as usize),
            _ => None,
        }
    }

    /// True when the token is punctuation by tag or relation.
    pub fn is_punct(&self) -> bool {
        self.upos == "PUNCT" || self.deprel == "punct"
    }

    /// The original input line in the given dialect, still valid if the
    /// token is unedited.
    pub fn raw_line(&self, dialect: Dialect) -> Option<&str> {
        match &self.raw {
            Some((d, line)) if *d == dialect => Some(line),
            _ => None,
        }
    }

    pub(crate) fn set_raw(&mut self, dialect: Dialect, line: &str) {
        self.raw = Some((dialect, line.into()));
    }

    /// Drop the raw-line cache; the token now serializes canonically.
    pub fn mark_edited(&mut self) {
        self.raw = None;
    }

    pub fn set_id(&mut self, id: TokenId) {
        if self.id != id {
            self.id = id;
            self.raw = None;
        }
    }

    pub fn set_form(&mut self, form: impl Into<String>) {
        self.form = form.into();
        self.raw = None;
    }

    pub fn set_lemma(&mut self, lemma: impl Into<String>) {
        self.lemma = lemma.into();
        self.raw = None;
    }

    pub fn set_upos(&mut self, upos: impl Into<String>) {
        self.upos = upos.into();
        self.raw = None;
    }

    pub fn set_xpos(&mut self, xpos: impl Into<String>) {
        self.xpos = xpos.into();
        self.raw = None;
    }

    pub fn set_head(&mut self, head: Head) {
        if self.head != head {
            self.head = head;
            self.raw = None;
        }
    }

    pub fn set_deprel(&mut self, deprel: impl Into<String>) {
        self.deprel = deprel.into();
        self.raw = None;
    }

    pub fn feats_mut(&mut self) -> &mut FeatureSet {
        self.raw = None;
        &mut self.feats
    }

    pub fn misc_mut(&mut self) -> &mut MiscSet {
        self.raw = None;
        &mut self.misc
    }

    pub fn deps_mut(&mut self) -> &mut Vec<(Head, String)> {
        self.raw = None;
        &mut self.deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_id_display() {
        assert_eq!(TokenId::Word(5).to_string(), "5");
        assert_eq!(TokenId::Range(3, 4).to_string(), "3-4");
        assert_eq!(TokenId::Temp(2).to_string(), "#2");
    }

    #[test]
    fn test_head_display() {
        assert_eq!(Head::Root.to_string(), "0");
        assert_eq!(Head::Id(TokenId::Word(7)).to_string(), "7");
        assert_eq!(Head::Undefined.to_string(), "_");
    }

    #[test]
    fn test_feature_set_parse_and_serialize_sorted() {
        let feats = FeatureSet::parse("Number=Sing|Case=Nom");
        assert_eq!(feats.get("Case"), Some("Nom"));
        assert_eq!(feats.get("Number"), Some("Sing"));
        // sorted on serialize regardless of input order
        assert_eq!(feats.to_string(), "Case=Nom|Number=Sing");
    }

    #[test]
    fn test_feature_set_empty() {
        let feats = FeatureSet::parse("_");
        assert!(feats.is_empty());
        assert_eq!(feats.to_string(), "_");
    }

    #[test]
    fn test_feature_set_dedup() {
        let feats = FeatureSet::parse("Case=Nom|Case=Nom|Case=Acc");
        assert_eq!(feats.len(), 2);
        assert!(feats.is_ambiguous("Case"));
        assert_eq!(feats.to_string(), "Case=Acc|Case=Nom");
    }

    #[test]
    fn test_feature_set_set_collapses_ambiguity() {
        let mut feats = FeatureSet::parse("Case=Nom|Case=Acc|Number=Sing");
        feats.set("Case", "Dat");
        assert!(!feats.is_ambiguous("Case"));
        assert_eq!(feats.to_string(), "Case=Dat|Number=Sing");
    }

    #[test]
    fn test_misc_set_flags_and_pairs() {
        let misc = MiscSet::parse("SpaceAfter=No|LGloss");
        assert_eq!(misc.get("SpaceAfter"), Some("No"));
        assert!(misc.contains("LGloss"));
        assert_eq!(misc.to_string(), "LGloss|SpaceAfter=No");
    }

    #[test]
    fn test_token_span_width() {
        let tok = Token::placeholder_span(TokenId::Temp(1), "Աւա՜ղ", 2);
        assert_eq!(tok.span_width(), Some(2));
        assert!(tok.is_multiword());

        let mut parsed = Token::word(TokenId::Range(3, 5), "du");
        parsed.span = None;
        assert_eq!(parsed.span_width(), Some(3));
    }

    #[test]
    fn test_setters_drop_raw_cache() {
        let mut tok = Token::word(TokenId::Word(1), "dog");
        tok.set_raw(Dialect::Conllu, "1\tdog\t_\t_\t_\t_\t_\t_\t_\t_");
        assert!(tok.raw_line(Dialect::Conllu).is_some());
        tok.set_deprel("nsubj");
        assert!(tok.raw_line(Dialect::Conllu).is_none());
    }

    #[test]
    fn test_set_id_same_value_keeps_raw() {
        let mut tok = Token::word(TokenId::Word(1), "dog");
        tok.set_raw(Dialect::Conllu, "1\tdog\t_\t_\t_\t_\t_\t_\t_\t_");
        tok.set_id(TokenId::Word(1));
        assert!(tok.raw_line(Dialect::Conllu).is_some());
    }

    #[test]
    fn test_raw_cache_is_dialect_specific() {
        let mut tok = Token::word(TokenId::Word(1), "dog");
        tok.set_raw(Dialect::Proiel, "<token id=\"1\" form=\"dog\" />");
        assert!(tok.raw_line(Dialect::Proiel).is_some());
        // a writer for the other dialect falls back to canonical output
        assert!(tok.raw_line(Dialect::Conllu).is_none());
    }
}
