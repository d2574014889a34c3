//! CoNLL-U parsing and serialization
//!
//! Reads line-oriented CoNLL-U blocks into [`Sentence`]s on blank-line
//! boundaries and writes them back out. Unedited token lines round-trip
//! byte-for-byte via the raw-line cache; edited or new tokens serialize
//! canonically (tab-separated 10 columns, FEATS/MISC sorted, `_` for
//! empty). Gzipped corpora are decompressed transparently.
//!
//! CoNLL-U format: https://universaldependencies.org/format.html

use crate::report::{Fault, FaultLog};
use crate::sentence::{Corpus, Sentence};
use crate::token::{Dialect, FeatureSet, Head, MiscSet, Token, TokenId};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines, Read, Write};
use std::path::Path;
use thiserror::Error;

/// How malformed token lines are handled.
///
/// Lenient mode carries them through unchanged; strict mode records a
/// [`Fault::MalformedLine`] and skips the line. Neither mode touches
/// neighboring lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Lenient,
    Strict,
}

/// Error during CoNLL-U reading or writing.
#[derive(Debug, Error)]
pub enum ConlluError {
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

/// Iterator over the sentences of a CoNLL-U stream.
///
/// Malformed lines are handled per [`ParseMode`]; the faults recorded in
/// strict mode are available from [`SentenceReader::faults`] after
/// iteration.
pub struct SentenceReader<R: BufRead> {
    lines: Lines<R>,
    line_num: usize,
    mode: ParseMode,
    faults: Vec<Fault>,
}

impl<R: BufRead> SentenceReader<R> {
    pub fn new(reader: R, mode: ParseMode) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
            mode,
            faults: Vec::new(),
        }
    }

    /// Faults recorded so far (strict mode only).
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    pub fn take_faults(&mut self) -> Vec<Fault> {
        std::mem::take(&mut self.faults)
    }
}

impl SentenceReader<BufReader<Box<dyn Read>>> {
    /// Open a file, decompressing `.gz` transparently.
    pub fn from_file(path: &Path, mode: ParseMode) -> io::Result<Self> {
        let file = File::open(path)?;
        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(Self::new(BufReader::new(reader), mode))
    }
}

impl SentenceReader<BufReader<io::Cursor<String>>> {
    pub fn from_str(text: &str, mode: ParseMode) -> Self {
        let cursor = io::Cursor::new(text.to_string());
        Self::new(BufReader::new(cursor), mode)
    }
}

impl<R: BufRead> Iterator for SentenceReader<R> {
    type Item = Result<Sentence, ConlluError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut sent = Sentence::new();
        let mut saw_content = false;

        loop {
            self.line_num += 1;
            match self.lines.next() {
                None => {
                    if saw_content {
                        return Some(Ok(sent));
                    }
                    return None;
                }
                Some(Err(e)) => return Some(Err(e.into())),
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        // Blank line = sentence boundary; collapse runs.
                        if saw_content {
                            return Some(Ok(sent));
                        }
                        continue;
                    }

                    saw_content = true;

                    if line.starts_with('#') {
                        if sent.tokens.is_empty() {
                            sent.comments.push(line);
                        } else {
                            // A comment after token rows keeps its position.
                            sent.opaque.push((sent.tokens.len(), line));
                        }
                        continue;
                    }

                    match parse_token_line(&line) {
                        Some(token) => sent.tokens.push(token),
                        None => match self.mode {
                            ParseMode::Lenient => {
                                sent.opaque.push((sent.tokens.len(), line));
                            }
                            ParseMode::Strict => {
                                self.faults.push(Fault::MalformedLine {
                                    line: self.line_num,
                                    content: line,
                                });
                            }
                        },
                    }
                }
            }
        }
    }
}

/// Parse one token line, or `None` if it cannot be a token.
///
/// Lines with fewer or more than 10 columns are padded/truncated to the
/// schema as long as the ID field parses; the raw cache keeps the
/// original bytes either way.
fn parse_token_line(line: &str) -> Option<Token> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 2 {
        return None;
    }

    let id = parse_id(fields[0])?;
    let field = |i: usize| -> &str { fields.get(i).copied().unwrap_or("_") };

    let head = parse_head(field(6))?;

    let mut token = Token::word(id, field(1));
    token.lemma = field(2).to_string();
    token.upos = field(3).to_string();
    token.xpos = field(4).to_string();
    token.feats = FeatureSet::parse(field(5));
    token.head = head;
    token.deprel = field(7).to_string();
    token.deps = parse_deps(field(8));
    token.misc = MiscSet::parse(field(9));
    token.set_raw(Dialect::Conllu, line);
    Some(token)
}

/// Parse an ID field: decimal integer or hyphenated range.
fn parse_id(s: &str) -> Option<TokenId> {
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

/// Parse a HEAD field: `0` for root, `_`/empty for no head, else an id.
fn parse_head(s: &str) -> Option<Head> {
    match s {
        "_" | "" => Some(Head::Undefined),
        "0" => Some(Head::Root),
        _ => s.parse().ok().map(|n| Head::Id(TokenId::Word(n))),
    }
}

/// Parse a DEPS field (`head:rel|head:rel`). Unparseable items are
/// dropped; the raw cache still preserves them for unedited lines.
fn parse_deps(s: &str) -> Vec<(Head, String)> {
    let mut deps = Vec::new();
    if s == "_" || s.is_empty() {
        return deps;
    }
    for item in s.split('|') {
        if let Some((h, rel)) = item.split_once(':') {
            let head = match h {
                "0" => Head::Root,
                _ => match h.parse() {
                    Ok(n) => Head::Id(TokenId::Word(n)),
                    Err(_) => continue,
                },
            };
            deps.push((head, rel.to_string()));
        }
    }
    deps
}

fn or_underscore(s: &str) -> &str {
    if s.is_empty() { "_" } else { s }
}

/// Canonical 10-column rendering of a token.
///
/// Fails on temporary ids, temporary heads, and unconsumed span markers:
/// those mean the sentence has not been renumbered since its last edit.
pub fn token_line(token: &Token, sent_id: Option<&str>) -> Result<String, ConlluError> {
    let unresolved = || ConlluError::UnresolvedTemp {
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

    let deps = if token.deps.is_empty() {
        "_".to_string()
    } else {
        let mut parts = Vec::with_capacity(token.deps.len());
        for (head, rel) in &token.deps {
            if let Head::Id(h) = head
                && h.is_temp()
            {
                return Err(unresolved());
            }
            parts.push(format!("{}:{}", head, rel));
        }
        parts.join("|")
    };

    Ok(format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        token.id,
        or_underscore(&token.form),
        or_underscore(&token.lemma),
        or_underscore(&token.upos),
        or_underscore(&token.xpos),
        token.feats,
        token.head,
        or_underscore(&token.deprel),
        deps,
        token.misc,
    ))
}

/// Write one sentence: comments, then token rows (raw bytes for unedited
/// lines), with any lenient-mode opaque lines re-emitted at their anchors.
pub fn write_sentence<W: Write>(w: &mut W, sent: &Sentence) -> Result<(), ConlluError> {
    for comment in &sent.comments {
        writeln!(w, "{}", comment)?;
    }
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
        match token.raw_line(Dialect::Conllu) {
            Some(raw) => writeln!(w, "{}", raw)?,
            None => writeln!(w, "{}", token_line(token, sent.sent_id())?)?,
        }
    }
    for (_, line) in opaque {
        writeln!(w, "{}", line)?;
    }
    Ok(())
}

/// Write a whole corpus, one blank line after every sentence.
pub fn write_corpus<W: Write>(w: &mut W, corpus: &Corpus) -> Result<(), ConlluError> {
    for sent in &corpus.sentences {
        write_sentence(w, sent)?;
        writeln!(w)?;
    }
    Ok(())
}

/// Serialize one sentence to a string (without the trailing blank line).
pub fn sentence_to_string(sent: &Sentence) -> Result<String, ConlluError> {
    let mut out = Vec::new();
    write_sentence(&mut out, sent)?;
    Ok(String::from_utf8(out).expect("serialized CoNLL-U is UTF-8"))
}

/// Read a whole corpus from a string.
pub fn read_str(text: &str, mode: ParseMode, faults: &mut FaultLog) -> Result<Corpus, ConlluError> {
    let mut reader = SentenceReader::from_str(text, mode);
    collect(&mut reader, faults)
}

/// Read a whole corpus from a file (`.gz` decompressed transparently).
pub fn read_file(
    path: &Path,
    mode: ParseMode,
    faults: &mut FaultLog,
) -> Result<Corpus, ConlluError> {
    let mut reader = SentenceReader::from_file(path, mode)?;
    collect(&mut reader, faults)
}

fn collect<R: BufRead>(
    reader: &mut SentenceReader<R>,
    faults: &mut FaultLog,
) -> Result<Corpus, ConlluError> {
    let mut corpus = Corpus::new();
    for result in reader.by_ref() {
        corpus.sentences.push(result?);
    }
    faults.extend(reader.take_faults());
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "# sent_id = s1\n\
# text = The dog runs.\n\
1\tThe\tthe\tDET\tDT\t_\t2\tdet\t_\t_\n\
2\tdog\tdog\tNOUN\tNN\t_\t3\tnsubj\t_\t_\n\
3\truns\trun\tVERB\tVBZ\t_\t0\troot\t_\tSpaceAfter=No\n\
4\t.\t.\tPUNCT\t.\t_\t3\tpunct\t_\t_\n\
\n";

    #[test]
    fn test_parse_simple_sentence() {
        let mut faults = FaultLog::new();
        let corpus = read_str(SIMPLE, ParseMode::Strict, &mut faults).unwrap();
        assert!(faults.is_empty());
        assert_eq!(corpus.len(), 1);

        let sent = &corpus.sentences[0];
        assert_eq!(sent.sent_id(), Some("s1"));
        assert_eq!(sent.text(), Some("The dog runs."));
        assert_eq!(sent.tokens.len(), 4);
        assert_eq!(sent.tokens[0].form, "The");
        assert_eq!(sent.tokens[2].head, Head::Root);
        assert_eq!(sent.tokens[3].head, Head::Id(TokenId::Word(3)));
        assert_eq!(sent.tokens[2].misc.get("SpaceAfter"), Some("No"));
    }

    #[test]
    fn test_round_trip_unedited_is_exact() {
        let mut faults = FaultLog::new();
        let corpus = read_str(SIMPLE, ParseMode::Strict, &mut faults).unwrap();
        let mut out = Vec::new();
        write_corpus(&mut out, &corpus).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), SIMPLE);
    }

    #[test]
    fn test_round_trip_preserves_unsorted_feats_on_unedited_lines() {
        // Feats out of canonical order on the input line must survive
        // serialization as long as the token is untouched.
        let text = "1\tdogs\tdog\tNOUN\t_\tNumber=Plur|Case=Nom\t0\troot\t_\t_\n\n";
        let mut faults = FaultLog::new();
        let corpus = read_str(text, ParseMode::Strict, &mut faults).unwrap();
        let mut out = Vec::new();
        write_corpus(&mut out, &corpus).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }

    #[test]
    fn test_edited_line_serializes_canonically() {
        let text = "1\tdogs\tdog\tNOUN\t_\tNumber=Plur|Case=Nom\t0\troot\t_\t_\n\n";
        let mut faults = FaultLog::new();
        let mut corpus = read_str(text, ParseMode::Strict, &mut faults).unwrap();
        corpus.sentences[0].tokens[0].set_deprel("root");
        let line = sentence_to_string(&corpus.sentences[0]).unwrap();
        assert_eq!(
            line,
            "1\tdogs\tdog\tNOUN\t_\tCase=Nom|Number=Plur\t0\troot\t_\t_\n"
        );
    }

    #[test]
    fn test_multiword_range_row() {
        let text = "1-2\tdu\t_\t_\t_\t_\t_\t_\t_\t_\n\
1\tde\tde\tADP\t_\t_\t3\tcase\t_\t_\n\
2\tle\tle\tDET\t_\t_\t3\tdet\t_\t_\n\
3\tchat\tchat\tNOUN\t_\t_\t0\troot\t_\t_\n\n";
        let mut faults = FaultLog::new();
        let corpus = read_str(text, ParseMode::Strict, &mut faults).unwrap();
        let sent = &corpus.sentences[0];
        assert_eq!(sent.tokens[0].id, TokenId::Range(1, 2));
        assert!(sent.tokens[0].is_multiword());
        assert_eq!(sent.tokens[0].head, Head::Undefined);
        assert_eq!(sent.word_count(), 3);
    }

    #[test]
    fn test_malformed_line_lenient_passes_through() {
        let text = "1\tok\tok\tX\t_\t_\t0\troot\t_\t_\nnot a token line\n\n";
        let mut faults = FaultLog::new();
        let corpus = read_str(text, ParseMode::Lenient, &mut faults).unwrap();
        assert!(faults.is_empty());
        let sent = &corpus.sentences[0];
        assert_eq!(sent.tokens.len(), 1);
        assert_eq!(sent.opaque.len(), 1);
        let out = sentence_to_string(sent).unwrap();
        assert_eq!(out, "1\tok\tok\tX\t_\t_\t0\troot\t_\t_\nnot a token line\n");
    }

    #[test]
    fn test_malformed_line_strict_is_reported_and_skipped() {
        let text = "1\tok\tok\tX\t_\t_\t0\troot\t_\t_\nnot a token line\n\n";
        let mut faults = FaultLog::new();
        let corpus = read_str(text, ParseMode::Strict, &mut faults).unwrap();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults.iter().next().unwrap().kind(), "malformed-line");
        assert_eq!(corpus.sentences[0].tokens.len(), 1);
        assert!(corpus.sentences[0].opaque.is_empty());
    }

    #[test]
    fn test_short_line_padded_to_schema() {
        // Variable column counts are tolerated when the ID parses.
        let text = "1\tword\tword\tNOUN\n\n";
        let mut faults = FaultLog::new();
        let corpus = read_str(text, ParseMode::Strict, &mut faults).unwrap();
        let tok = &corpus.sentences[0].tokens[0];
        assert_eq!(tok.upos, "NOUN");
        assert_eq!(tok.xpos, "_");
        assert_eq!(tok.head, Head::Undefined);
    }

    #[test]
    fn test_serialize_temp_id_is_an_error() {
        let mut sent = Sentence::new();
        let id = sent.alloc_temp();
        sent.tokens.push(Token::word(id, "new"));
        let err = sentence_to_string(&sent).unwrap_err();
        assert!(matches!(err, ConlluError::UnresolvedTemp { .. }));
    }

    #[test]
    fn test_deps_field_round_trip() {
        let text = "1\tword\tword\tNOUN\t_\t_\t0\troot\t0:root|2:nsubj\t_\n\
2\tother\tother\tVERB\t_\t_\t1\tdep\t_\t_\n\n";
        let mut faults = FaultLog::new();
        let corpus = read_str(text, ParseMode::Strict, &mut faults).unwrap();
        let tok = &corpus.sentences[0].tokens[0];
        assert_eq!(tok.deps.len(), 2);
        assert_eq!(tok.deps[0], (Head::Root, "root".to_string()));
        assert_eq!(tok.deps[1], (Head::Id(TokenId::Word(2)), "nsubj".to_string()));
    }

    #[test]
    fn test_multiple_sentences() {
        let text = "1\ta\ta\tX\t_\t_\t0\troot\t_\t_\n\n\n\n1\tb\tb\tX\t_\t_\t0\troot\t_\t_\n\n";
        let mut faults = FaultLog::new();
        let corpus = read_str(text, ParseMode::Strict, &mut faults).unwrap();
        assert_eq!(corpus.len(), 2);
    }

    mod files {
        use super::*;
        use std::io::Write as _;

        #[test]
        fn test_read_file_plain() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tiny.conllu");
            std::fs::write(&path, SIMPLE).unwrap();

            let mut faults = FaultLog::new();
            let corpus = read_file(&path, ParseMode::Strict, &mut faults).unwrap();
            assert_eq!(corpus.len(), 1);
        }

        #[test]
        fn test_read_file_gzip() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tiny.conllu.gz");
            let file = std::fs::File::create(&path).unwrap();
            let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            enc.write_all(SIMPLE.as_bytes()).unwrap();
            enc.finish().unwrap();

            let mut faults = FaultLog::new();
            let corpus = read_file(&path, ParseMode::Strict, &mut faults).unwrap();
            assert_eq!(corpus.len(), 1);
            assert_eq!(corpus.sentences[0].tokens.len(), 4);
        }
    }
}
