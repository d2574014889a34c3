//! Injectable rule tables
//!
//! Lexical, POS and feature rewrite rules are external static data
//! consumed by the engine, never embedded in it. A table is an ordered
//! list of (key, value) entries; lookup resolves ambiguity by declared
//! priority: the most specific key wins (lemma+POS+index > lemma+POS >
//! POS-only), ties go to declaration order.
//!
//! The on-disk format is parsed with a pest grammar
//! (`table_grammar.pest`); see the grammar header for examples.

use crate::edit::{Attachment, SplitPart};
use crate::token::{FeatureSet, MiscSet, Token};
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "table_grammar.pest"]
struct TableParser;

/// Error while parsing a rule-table file.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("table syntax: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),

    #[error("unknown key field {0:?} (expected lemma, pos or index)")]
    UnknownKeyField(String),

    #[error("unknown assignment field {0:?}")]
    UnknownField(String),

    #[error("index must be a number, got {0:?}")]
    BadIndex(String),

    #[error("split part without a form")]
    PartWithoutForm,

    #[error("bad attach value {0:?} (expected \"inherit\" or a part number)")]
    BadAttach(String),
}

/// Lookup key of a table entry. Unset components match anything; `index`
/// is the token's 1-based surface position within its sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleKey {
    pub lemma: Option<String>,
    pub pos: Option<String>,
    pub index: Option<u32>,
}

impl RuleKey {
    pub fn for_lemma(lemma: &str) -> Self {
        Self {
            lemma: Some(lemma.to_string()),
            ..Default::default()
        }
    }

    pub fn for_pos(pos: &str) -> Self {
        Self {
            pos: Some(pos.to_string()),
            ..Default::default()
        }
    }

    fn specificity(&self) -> u32 {
        u32::from(self.lemma.is_some())
            + u32::from(self.pos.is_some())
            + u32::from(self.index.is_some())
    }

    pub fn matches(&self, lemma: &str, pos: &str, index: u32) -> bool {
        self.lemma.as_deref().is_none_or(|l| l == lemma)
            && self.pos.as_deref().is_none_or(|p| p == pos)
            && self.index.is_none_or(|i| i == index)
    }
}

/// Ordered table of keyed entries with priority lookup.
#[derive(Debug, Clone, Default)]
pub struct RuleTable<V> {
    entries: Vec<(RuleKey, V)>,
}

impl<V> RuleTable<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, key: RuleKey, value: V) {
        self.entries.push((key, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(RuleKey, V)> {
        self.entries.iter()
    }

    /// Best-matching entry: highest specificity first, earliest
    /// declaration on ties.
    pub fn lookup(&self, lemma: &str, pos: &str, index: u32) -> Option<&V> {
        let mut best: Option<(u32, &V)> = None;
        for (key, value) in &self.entries {
            if key.matches(lemma, pos, index) {
                let s = key.specificity();
                if best.is_none_or(|(b, _)| s > b) {
                    best = Some((s, value));
                }
            }
        }
        best.map(|(_, v)| v)
    }
}

/// A token field an entry may assign to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Form,
    Lemma,
    Upos,
    Xpos,
    Feats,
    Deprel,
    Misc,
    /// Split parts only: `"inherit"` or the index of the part to attach to.
    Attach,
}

impl Field {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "form" => Some(Field::Form),
            "lemma" => Some(Field::Lemma),
            "upos" => Some(Field::Upos),
            "xpos" => Some(Field::Xpos),
            "feats" => Some(Field::Feats),
            "deprel" => Some(Field::Deprel),
            "misc" => Some(Field::Misc),
            "attach" => Some(Field::Attach),
            _ => None,
        }
    }
}

/// One part of a table-driven split.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartSpec {
    pub assigns: Vec<(Field, String)>,
}

impl PartSpec {
    /// Convert to an edit-layer split part. The form is required; feats
    /// and misc values are parsed from their pipe-separated notation.
    pub fn to_split_part(&self) -> Result<SplitPart, TableError> {
        let mut part = SplitPart::default();
        let mut has_form = false;
        for (field, value) in &self.assigns {
            match field {
                Field::Form => {
                    part.form = value.clone();
                    has_form = true;
                }
                Field::Lemma => part.lemma = Some(value.clone()),
                Field::Upos => part.upos = Some(value.clone()),
                Field::Xpos => part.xpos = Some(value.clone()),
                Field::Feats => part.feats = Some(FeatureSet::parse(value)),
                Field::Deprel => part.deprel = Some(value.clone()),
                Field::Misc => part.misc = Some(MiscSet::parse(value)),
                Field::Attach => {
                    part.attach = if value == "inherit" {
                        Attachment::InheritHead
                    } else {
                        let idx: usize = value
                            .parse()
                            .map_err(|_| TableError::BadAttach(value.clone()))?;
                        Attachment::ToPart(idx)
                    };
                }
            }
        }
        if !has_form {
            return Err(TableError::PartWithoutForm);
        }
        Ok(part)
    }
}

/// What a matched entry does to the token.
#[derive(Debug, Clone, PartialEq)]
pub enum TableAction {
    /// Overwrite fields in place.
    Assign(Vec<(Field, String)>),
    /// Replace the token with these parts.
    Split(Vec<PartSpec>),
}

/// Apply plain assignments to a token. Feats and misc values merge key
/// by key rather than replacing the whole set.
pub fn apply_assigns(token: &mut Token, assigns: &[(Field, String)]) {
    for (field, value) in assigns {
        match field {
            Field::Form => token.set_form(value.clone()),
            Field::Lemma => token.set_lemma(value.clone()),
            Field::Upos => token.set_upos(value.clone()),
            Field::Xpos => token.set_xpos(value.clone()),
            Field::Feats => {
                let parsed = FeatureSet::parse(value);
                let feats = token.feats_mut();
                for (k, v) in parsed.iter() {
                    feats.set(k, v);
                }
            }
            Field::Deprel => token.set_deprel(value.clone()),
            Field::Misc => {
                let parsed = MiscSet::parse(value);
                let misc = token.misc_mut();
                for (k, v) in parsed.iter() {
                    match v {
                        Some(v) => misc.set(k, v),
                        None => misc.set_flag(k),
                    }
                }
            }
            Field::Attach => {} // meaningful for split parts only
        }
    }
}

/// Parse a rule-table file.
pub fn parse_table(src: &str) -> Result<RuleTable<TableAction>, TableError> {
    let mut pairs = TableParser::parse(Rule::table, src).map_err(Box::new)?;
    let mut table = RuleTable::new();

    let table_pair = pairs.next().expect("grammar yields one table");
    for entry in table_pair.into_inner() {
        if entry.as_rule() != Rule::entry {
            continue; // EOI
        }
        let mut inner = entry.into_inner();
        let key_pair = inner.next().expect("entry has a key");
        let action_pair = inner.next().expect("entry has an action");
        table.push(parse_key(key_pair)?, parse_action(action_pair)?);
    }
    Ok(table)
}

fn parse_key(pair: pest::iterators::Pair<Rule>) -> Result<RuleKey, TableError> {
    let mut key = RuleKey::default();
    for field in pair.into_inner() {
        let mut inner = field.into_inner();
        let name = inner.next().expect("key field has a name").as_str();
        let value_pair = inner.next().expect("key field has a value");
        let value = unquote(value_pair);
        match name {
            "lemma" => key.lemma = Some(value),
            "pos" => key.pos = Some(value),
            "index" => {
                key.index = Some(value.parse().map_err(|_| TableError::BadIndex(value))?);
            }
            other => return Err(TableError::UnknownKeyField(other.to_string())),
        }
    }
    Ok(key)
}

fn parse_action(pair: pest::iterators::Pair<Rule>) -> Result<TableAction, TableError> {
    let inner = pair.into_inner().next().expect("action has a body");
    match inner.as_rule() {
        Rule::assign_list => Ok(TableAction::Assign(parse_assign_list(inner)?)),
        Rule::split_action => {
            let mut parts = Vec::new();
            for part in inner.into_inner() {
                let list = part.into_inner().next().expect("part has assignments");
                parts.push(PartSpec {
                    assigns: parse_assign_list(list)?,
                });
            }
            Ok(TableAction::Split(parts))
        }
        other => unreachable!("unexpected action rule: {:?}", other),
    }
}

fn parse_assign_list(
    pair: pest::iterators::Pair<Rule>,
) -> Result<Vec<(Field, String)>, TableError> {
    let mut assigns = Vec::new();
    for assign in pair.into_inner() {
        let mut inner = assign.into_inner();
        let name = inner.next().expect("assignment has a name").as_str();
        let value = unquote(inner.next().expect("assignment has a value"));
        let field =
            Field::parse(name).ok_or_else(|| TableError::UnknownField(name.to_string()))?;
        assigns.push((field, value));
    }
    Ok(assigns)
}

/// The text inside a string literal, or the raw text of a number.
fn unquote(pair: pest::iterators::Pair<Rule>) -> String {
    match pair.as_rule() {
        Rule::string => pair
            .into_inner()
            .next()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default(),
        Rule::key_value => {
            let inner = pair.into_inner().next().expect("key value has content");
            unquote(inner)
        }
        _ => pair.as_str().to_string(),
    }
}
