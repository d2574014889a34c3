//! Legacy attribute-bag token streams
//!
//! The upstream source format carries one `<token .../>` line per token
//! with named attributes (id, head-id, relation, lemma, form,
//! part-of-speech, FEAT, morphology, citation-part, empty-token-sort)
//! and delimits sentences with an explicit `</sentence>` marker. The
//! boundary is modeled here in the parser; consumers never scan the file
//! themselves.
//!
//! Attribute mapping into the common token model: `relation` is the
//! deprel, `part-of-speech` the XPOS (universal tags come later, from a
//! mapping table), `FEAT` the feature set, and `morphology`,
//! `presentation-after`, `citation-part`, `empty-token-sort` ride along
//! in MISC under the `Morphology`, `PresentationAfter`, `CitationPart`
//! and `EmptyTokenSort` keys. Unedited lines round-trip byte-for-byte,
//! indentation and attribute order included; edited tokens serialize in
//! canonical attribute order.

use crate::conllu::ParseMode;
use crate::report::{Fault, FaultLog};
use crate::sentence::{Corpus, Sentence};
use crate::token::{Dialect, FeatureSet, Head, Token, TokenId};
use memchr::memmem;
use regex::Regex;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

const SENTENCE_END: &str = "</sentence>";

/// MISC keys carrying legacy attributes through the common model.
pub const MISC_MORPHOLOGY: &str = "Morphology";
pub const MISC_PRESENTATION_AFTER: &str = "PresentationAfter";
pub const MISC_CITATION_PART: &str = "CitationPart";
pub const MISC_EMPTY_TOKEN_SORT: &str = "EmptyTokenSort";

#[derive(Debug, Error)]
pub enum ProielError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error(
        "sentence {}: token {id} still has a temporary id or head at serialization",
        .sent_id.as_deref().unwrap_or("<unknown>")
    )]
    UnresolvedTemp {
        sent_id: Option<String>,
        id: String,
    },
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([-\w]+)="([^"]*)""#).expect("static pattern"))
}

/// The value of a named attribute on a tag line.
fn get_attr<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    attr_re()
        .captures_iter(line)
        .find(|c| &c[1] == name)
        .map(|c| c.get(2).expect("capture 2 always present").as_str())
}

/// The `id` of the enclosing `<sentence ...>` tag, when the block carried
/// one (kept verbatim among the comments).
pub fn sentence_tag_id(sent: &Sentence) -> Option<&str> {
    sent.comments
        .iter()
        .find(|line| line.trim_start().starts_with("<sentence"))
        .and_then(|line| get_attr(line, "id"))
}

/// The legacy empty-node marker, if this token carries one.
pub fn empty_token_sort(token: &Token) -> Option<&str> {
    token.misc.get(MISC_EMPTY_TOKEN_SORT)
}

/// Read a whole legacy corpus from a string. Sentences end at the
/// explicit `</sentence>` marker (with or without a preceding newline);
/// trailing content after the last marker forms a final sentence.
pub fn read_str(text: &str, mode: ParseMode, faults: &mut FaultLog) -> Corpus {
    let mut corpus = Corpus::new();
    let finder = memmem::Finder::new(SENTENCE_END.as_bytes());

    let mut start = 0;
    let mut line_base = 0;
    let mut push_block = |block: &str, line_base: usize| {
        if block.trim().is_empty() {
            return;
        }
        corpus
            .sentences
            .push(parse_block(block, mode, line_base, faults));
    };
    for pos in finder.find_iter(text.as_bytes()) {
        let block = &text[start..pos];
        push_block(block, line_base);
        line_base += block.lines().count() + 1;
        start = pos + SENTENCE_END.len();
    }
    push_block(&text[start..], line_base);
    corpus
}

/// Read a whole legacy corpus from a file.
pub fn read_file(path: &Path, mode: ParseMode, faults: &mut FaultLog) -> Result<Corpus, ProielError> {
    let text = std::fs::read_to_string(path)?;
    Ok(read_str(&text, mode, faults))
}

fn parse_block(block: &str, mode: ParseMode, line_base: usize, faults: &mut FaultLog) -> Sentence {
    let mut sent = Sentence::new();
    for (offset, line) in block.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if line.trim_start().starts_with("<token") {
            match parse_token_tag(line) {
                Some(token) => sent.tokens.push(token),
                None => match mode {
                    ParseMode::Lenient => sent.opaque.push((sent.tokens.len(), line.to_string())),
                    ParseMode::Strict => faults.push(Fault::MalformedLine {
                        line: line_base + offset + 1,
                        content: line.to_string(),
                    }),
                },
            }
        } else {
            // Non-token lines (the <sentence ...> tag included) pass
            // through verbatim and in order.
            sent.comments.push(line.to_string());
        }
    }
    sent
}

fn parse_token_tag(line: &str) -> Option<Token> {
    let id = parse_legacy_id(get_attr(line, "id")?)?;
    let head = match get_attr(line, "head-id") {
        None | Some("_") | Some("") => Head::Undefined,
        Some("0") => Head::Root,
        Some(h) => Head::Id(TokenId::Word(h.parse().ok()?)),
    };

    let mut token = Token::word(id, get_attr(line, "form").unwrap_or("_"));
    token.head = head;
    token.lemma = get_attr(line, "lemma").unwrap_or("_").to_string();
    token.xpos = get_attr(line, "part-of-speech").unwrap_or("_").to_string();
    token.deprel = get_attr(line, "relation").unwrap_or("_").to_string();
    token.feats = FeatureSet::parse(get_attr(line, "FEAT").unwrap_or("_"));
    if let Some(v) = get_attr(line, "morphology") {
        token.misc.set(MISC_MORPHOLOGY, v);
    }
    if let Some(v) = get_attr(line, "presentation-after") {
        token.misc.set(MISC_PRESENTATION_AFTER, v);
    }
    if let Some(v) = get_attr(line, "citation-part") {
        token.misc.set(MISC_CITATION_PART, v);
    }
    if let Some(v) = get_attr(line, "empty-token-sort") {
        token.misc.set(MISC_EMPTY_TOKEN_SORT, v);
    }
    token.set_raw(Dialect::Proiel, line);
    Some(token)
}

fn parse_legacy_id(s: &str) -> Option<TokenId> {
    if let Some((a, b)) = s.split_once('-') {
        let start: u32 = a.parse().ok()?;
        let end: u32 = b.parse().ok()?;
        if end < start {
            return None;
        }
        return Some(TokenId::Range(start, end));
    }
    s.parse().ok().map(TokenId::Word)
}

/// Canonical `<token .../>` rendering of a token. Unset attributes are
/// omitted; fails on unresolved temporary ids like the CoNLL-U writer.
pub fn token_tag(token: &Token, sent_id: Option<&str>) -> Result<String, ProielError> {
    let unresolved = || ProielError::UnresolvedTemp {
        sent_id: sent_id.map(str::to_string),
        id: token.id.to_string(),
    };
    if token.id.is_temp() || token.span.is_some() {
        return Err(unresolved());
    }
    if let Head::Id(h) = token.head
        && h.is_temp()
    {
        return Err(unresolved());
    }

    let mut out = String::from("<token");
    let mut attr = |name: &str, value: &str| {
        write!(out, " {}=\"{}\"", name, value).expect("write to String");
    };
    attr("id", &token.id.to_string());
    match token.head {
        Head::Root => attr("head-id", "0"),
        Head::Id(h) => attr("head-id", &h.to_string()),
        Head::Undefined => {}
    }
    if token.deprel != "_" {
        attr("relation", &token.deprel);
    }
    if token.lemma != "_" {
        attr("lemma", &token.lemma);
    }
    if token.form != "_" && !token.form.is_empty() {
        attr("form", &token.form);
    }
    if token.xpos != "_" {
        attr("part-of-speech", &token.xpos);
    }
    if !token.feats.is_empty() {
        attr("FEAT", &token.feats.to_string());
    }
    if let Some(v) = token.misc.get(MISC_MORPHOLOGY) {
        attr("morphology", v);
    }
    if let Some(v) = token.misc.get(MISC_PRESENTATION_AFTER) {
        attr("presentation-after", v);
    }
    if let Some(v) = token.misc.get(MISC_CITATION_PART) {
        attr("citation-part", v);
    }
    if let Some(v) = token.misc.get(MISC_EMPTY_TOKEN_SORT) {
        attr("empty-token-sort", v);
    }
    out.push_str(" />");
    Ok(out)
}

/// Write one sentence block followed by its end marker.
pub fn write_sentence<W: Write>(w: &mut W, sent: &Sentence) -> Result<(), ProielError> {
    for comment in &sent.comments {
        writeln!(w, "{}", comment)?;
    }
    let sent_id = sentence_tag_id(sent).map(str::to_string);
    let mut opaque = sent.opaque.iter().peekable();
    for (i, token) in sent.tokens.iter().enumerate() {
        while let Some((anchor, line)) = opaque.peek() {
            if *anchor <= i {
                writeln!(w, "{}", line)?;
                opaque.next();
            } else {
                break;
            }
        }
        match token.raw_line(Dialect::Proiel) {
            Some(raw) => writeln!(w, "{}", raw)?,
            None => writeln!(w, "{}", token_tag(token, sent_id.as_deref())?)?,
        }
    }
    for (_, line) in opaque {
        writeln!(w, "{}", line)?;
    }
    writeln!(w, "{}", SENTENCE_END)?;
    Ok(())
}

pub fn write_corpus<W: Write>(w: &mut W, corpus: &Corpus) -> Result<(), ProielError> {
    for sent in &corpus.sentences {
        write_sentence(w, sent)?;
    }
    Ok(())
}
