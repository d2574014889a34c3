//! Sentence containers
//!
//! A sentence is an ordered list of token rows plus its comment lines,
//! preserved verbatim and in order. Sentences are rebuilt fresh by each
//! pipeline stage; nothing persists across stages except the rows
//! themselves.

use crate::token::{Token, TokenId};

/// Comment keys with recognized meaning. Everything else is carried
/// through untouched.
pub const KNOWN_COMMENT_KEYS: &[&str] = &[
    "sent_id",
    "text",
    "translated_text",
    "transliterated_text",
    "cite",
];

/// One sentence: ordered tokens/placeholders plus verbatim comment lines.
#[derive(Debug, Clone, Default)]
pub struct Sentence {
    /// Comment lines exactly as read, including the leading `#`.
    pub comments: Vec<String>,
    /// Token rows in surface/citation order; multiword placeholders sit
    /// directly before their members.
    pub tokens: Vec<Token>,
    /// Lines that did not parse, carried through in lenient mode. Each is
    /// anchored to the number of token rows preceding it.
    pub opaque: Vec<(usize, String)>,
    next_temp: u32,
}

impl Sentence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh temporary id, unique within this sentence until
    /// the next renumbering pass consumes it.
    pub fn alloc_temp(&mut self) -> TokenId {
        self.next_temp += 1;
        TokenId::Temp(self.next_temp)
    }

    pub(crate) fn reset_temp_counter(&mut self) {
        self.next_temp = 0;
    }

    /// The value of a `# key = value` comment, if present.
    pub fn comment_value(&self, key: &str) -> Option<&str> {
        for line in &self.comments {
            let Some(body) = line.strip_prefix('#') else {
                continue;
            };
            if let Some((k, v)) = body.trim_start().split_once('=')
                && k.trim() == key
            {
                return Some(v.trim());
            }
        }
        None
    }

    pub fn sent_id(&self) -> Option<&str> {
        self.comment_value("sent_id")
    }

    pub fn text(&self) -> Option<&str> {
        self.comment_value("text")
    }

    pub fn translated_text(&self) -> Option<&str> {
        self.comment_value("translated_text")
    }

    pub fn transliterated_text(&self) -> Option<&str> {
        self.comment_value("transliterated_text")
    }

    /// Set or replace a `# key = value` comment, keeping comment order.
    pub fn set_comment(&mut self, key: &str, value: &str) {
        for line in &mut self.comments {
            let body = line.strip_prefix('#').unwrap_or(line).trim_start();
            if let Some((k, _)) = body.split_once('=')
                && k.trim() == key
            {
                *line = format!("# {} = {}", key, value);
                return;
            }
        }
        self.comments.push(format!("# {} = {}", key, value));
    }

    /// Position of the row with the given id, scanning in order.
    pub fn position_of(&self, id: TokenId) -> Option<usize> {
        self.tokens.iter().position(|t| t.id == id)
    }

    /// Number of atomic (non-placeholder) tokens.
    pub fn word_count(&self) -> usize {
        self.tokens.iter().filter(|t| !t.is_multiword()).count()
    }

    /// Positions of all tokens attached to the root.
    pub fn root_positions(&self) -> Vec<usize> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_multiword() && t.head == crate::token::Head::Root)
            .map(|(i, _)| i)
            .collect()
    }
}

/// A whole corpus, read and written as one unit.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub sentences: Vec<Sentence>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sentence> {
        self.sentences.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Sentence> {
        self.sentences.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Head, Token, TokenId};

    fn sentence_with_comments() -> Sentence {
        let mut sent = Sentence::new();
        sent.comments.push("# sent_id = MATT_1.1".to_string());
        sent.comments.push("# text = Ի սկզբանէ էր բանն".to_string());
        sent
    }

    #[test]
    fn test_comment_lookup() {
        let sent = sentence_with_comments();
        assert_eq!(sent.sent_id(), Some("MATT_1.1"));
        assert_eq!(sent.text(), Some("Ի սկզբանէ էր բանն"));
        assert_eq!(sent.comment_value("cite"), None);
    }

    #[test]
    fn test_set_comment_replaces_in_place() {
        let mut sent = sentence_with_comments();
        sent.set_comment("text", "changed");
        assert_eq!(sent.text(), Some("changed"));
        assert_eq!(sent.comments.len(), 2);
        // order preserved
        assert!(sent.comments[0].contains("sent_id"));
    }

    #[test]
    fn test_set_comment_appends_new_key() {
        let mut sent = sentence_with_comments();
        sent.set_comment("translated_text", "In the beginning");
        assert_eq!(sent.comments.len(), 3);
        assert_eq!(sent.comment_value("translated_text"), Some("In the beginning"));
    }

    #[test]
    fn test_alloc_temp_is_unique() {
        let mut sent = Sentence::new();
        let a = sent.alloc_temp();
        let b = sent.alloc_temp();
        assert_ne!(a, b);
        assert!(a.is_temp() && b.is_temp());
    }

    #[test]
    fn test_word_count_skips_placeholders() {
        let mut sent = Sentence::new();
        sent.tokens.push(Token::word(TokenId::Range(1, 2), "du"));
        sent.tokens.push(Token::word(TokenId::Word(1), "de"));
        sent.tokens.push(Token::word(TokenId::Word(2), "le"));
        assert_eq!(sent.word_count(), 2);
        assert_eq!(sent.position_of(TokenId::Word(2)), Some(2));
    }

    #[test]
    fn test_root_positions() {
        let mut sent = Sentence::new();
        let mut a = Token::word(TokenId::Word(1), "a");
        a.head = Head::Root;
        let mut b = Token::word(TokenId::Word(2), "b");
        b.head = Head::Id(TokenId::Word(1));
        sent.tokens.push(a);
        sent.tokens.push(b);
        assert_eq!(sent.root_positions(), vec![0]);
    }
}
