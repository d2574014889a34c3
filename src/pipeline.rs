//! Stage driver and stock stages
//!
//! A pipeline runs stages over a corpus one sentence at a time; a
//! sentence's faults are logged and never abort the rest of the corpus.
//! The stock stages are composed entirely from the edit primitives, rule
//! passes and injectable tables; none of them embeds lexical data.

use crate::edit::{self, NewToken, SplitOptions, SplitPart};
use crate::index::TreeIndex;
use crate::proiel;
use crate::renumber::renumber;
use crate::report::FaultLog;
use crate::rules::RulePass;
use crate::sentence::{Corpus, Sentence};
use crate::table::{RuleTable, TableAction, apply_assigns};
use crate::token::{Head, TokenId};
use crate::validate;

/// One rewrite stage over a single sentence.
pub trait Stage {
    fn name(&self) -> &str;
    fn run(&self, sent: &mut Sentence, faults: &mut FaultLog);
}

/// A rule pass is directly usable as a stage.
impl Stage for RulePass {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, sent: &mut Sentence, _faults: &mut FaultLog) {
        self.apply(sent);
    }
}

/// Ordered sequence of stages applied per sentence.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Run every stage over every sentence. Faults accumulate across the
    /// run and are returned for end-of-run reporting.
    pub fn run(&self, corpus: &mut Corpus) -> FaultLog {
        let mut faults = FaultLog::new();
        for sent in corpus.iter_mut() {
            for stage in &self.stages {
                stage.run(sent, &mut faults);
            }
        }
        faults
    }
}

/// Splits configured inline punctuation marks (for instance the Armenian
/// emphasis marks `՛ ՜ ՞`) out of word forms: the word becomes a
/// multiword span whose surface keeps the original orthography, covering
/// a base token with the marks removed plus one `punct` token per mark,
/// attached to the base. A following token that *starts* with a mark is
/// first folded into the preceding word so the span covers the whole
/// orthographic unit. Forms consisting only of marks are relabeled as
/// punctuation in place.
pub struct SplitInlinePunct {
    pub marks: Vec<char>,
}

impl SplitInlinePunct {
    pub fn new(marks: &[char]) -> Self {
        Self {
            marks: marks.to_vec(),
        }
    }

    fn is_mark(&self, c: char) -> bool {
        self.marks.contains(&c)
    }
}

impl Stage for SplitInlinePunct {
    fn name(&self) -> &str {
        "split-inline-punct"
    }

    fn run(&self, sent: &mut Sentence, _faults: &mut FaultLog) {
        // Fold mark-initial tokens into their predecessor.
        let mut i = 0;
        while i + 1 < sent.tokens.len() {
            let foldable = {
                let cur = &sent.tokens[i];
                let next = &sent.tokens[i + 1];
                !cur.is_multiword()
                    && !cur.is_punct()
                    && !next.is_multiword()
                    && next.form.starts_with(|c| self.is_mark(c))
                    && !next.form.chars().all(|c| self.is_mark(c))
            };
            if foldable {
                let index = TreeIndex::build(sent);
                if edit::merge(sent, &index, i, i + 1).is_err() {
                    i += 1;
                }
            } else {
                i += 1;
            }
        }

        // Split marks out of forms, back to front so pending positions
        // stay valid.
        for pos in (0..sent.tokens.len()).rev() {
            let tok = &sent.tokens[pos];
            if tok.is_multiword() || !tok.form.chars().any(|c| self.is_mark(c)) {
                continue;
            }
            if tok.form.chars().all(|c| self.is_mark(c)) {
                let tok = &mut sent.tokens[pos];
                if tok.lemma == "_" {
                    let form = tok.form.clone();
                    tok.set_lemma(form);
                }
                tok.set_upos("PUNCT");
                tok.set_deprel("punct");
                continue;
            }

            let base: String = tok.form.chars().filter(|&c| !self.is_mark(c)).collect();
            let mut parts = vec![SplitPart::new(&base)];
            for mark in tok.form.chars().filter(|&c| self.is_mark(c)) {
                parts.push(SplitPart::punct(&mark.to_string(), 0));
            }
            let index = TreeIndex::build(sent);
            let opts = SplitOptions {
                make_span: true,
                ..Default::default()
            };
            if let Err(e) = edit::split(sent, &index, pos, &parts, &opts) {
                eprintln!("warning: split-inline-punct skipped a token: {}", e);
            }
        }
    }
}

/// Rule-table-driven rewrites: matched tokens get field assignments
/// applied in place, or are split into the parts the table specifies
/// (multiword lemmas, clitic sequences). The key's `pos` component is
/// matched against UPOS, falling back to XPOS while the stream has no
/// universal tags yet.
pub struct ApplyTable {
    pub table: RuleTable<TableAction>,
    /// Cover table-driven splits with a multiword span. The upstream
    /// clitic splits emit plain adjacent tokens, so this defaults off.
    pub make_span: bool,
}

impl ApplyTable {
    pub fn new(table: RuleTable<TableAction>) -> Self {
        Self {
            table,
            make_span: false,
        }
    }
}

impl Stage for ApplyTable {
    fn name(&self) -> &str {
        "apply-table"
    }

    fn run(&self, sent: &mut Sentence, _faults: &mut FaultLog) {
        for pos in (0..sent.tokens.len()).rev() {
            let (lemma, pos_tag, surface_index) = {
                let tok = &sent.tokens[pos];
                if tok.is_multiword() {
                    continue;
                }
                let tag = if tok.upos != "_" {
                    tok.upos.clone()
                } else {
                    tok.xpos.clone()
                };
                let idx = sent.tokens[..=pos]
                    .iter()
                    .filter(|t| !t.is_multiword())
                    .count() as u32;
                (tok.lemma.clone(), tag, idx)
            };

            match self.table.lookup(&lemma, &pos_tag, surface_index) {
                None => {}
                Some(TableAction::Assign(assigns)) => {
                    apply_assigns(&mut sent.tokens[pos], assigns);
                }
                Some(TableAction::Split(specs)) => {
                    let parts: Result<Vec<SplitPart>, _> =
                        specs.iter().map(|s| s.to_split_part()).collect();
                    let parts = match parts {
                        Ok(parts) => parts,
                        Err(e) => {
                            eprintln!("warning: apply-table has a bad part spec: {}", e);
                            continue;
                        }
                    };
                    let index = TreeIndex::build(sent);
                    let opts = SplitOptions {
                        make_span: self.make_span,
                        ..Default::default()
                    };
                    if let Err(e) = edit::split(sent, &index, pos, &parts, &opts) {
                        eprintln!("warning: apply-table skipped a token: {}", e);
                    }
                }
            }
        }
    }
}

/// Inserts punctuation tokens inferred from the legacy
/// `presentation-after` attribute: a token whose presentation text is a
/// single mark outside the excluded set gets a `punct` token right
/// after it, attached to the nearest token in the sentence that has no
/// head yet (the previous one when both sides are equally close).
/// Question marks are excluded by default; a later stage places them
/// inside the following word. Inserted tokens receive temporary ids
/// resolved at renumbering.
pub struct InferPunct {
    pub exclude: Vec<char>,
}

impl InferPunct {
    pub fn new() -> Self {
        Self { exclude: vec!['?'] }
    }
}

impl Default for InferPunct {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest atomic token around `pos` with no head, preferring the
/// previous one on ties.
fn nearest_headless(sent: &Sentence, pos: usize) -> Option<TokenId> {
    let headless = |p: usize| {
        let tok = &sent.tokens[p];
        !tok.is_multiword() && tok.head == Head::Undefined
    };
    let prev = (0..pos).rev().find(|&p| headless(p));
    let next = (pos + 1..sent.tokens.len()).find(|&p| headless(p));
    let chosen = match (prev, next) {
        (Some(p), Some(n)) => {
            if pos - p <= n - pos {
                p
            } else {
                n
            }
        }
        (Some(p), None) => p,
        (None, Some(n)) => n,
        (None, None) => return None,
    };
    Some(sent.tokens[chosen].id)
}

impl Stage for InferPunct {
    fn name(&self) -> &str {
        "infer-punct"
    }

    fn run(&self, sent: &mut Sentence, _faults: &mut FaultLog) {
        // Plan from a snapshot, then insert back to front so planned
        // positions stay valid.
        let mut planned: Vec<(usize, char, TokenId)> = Vec::new();
        for (pos, tok) in sent.tokens.iter().enumerate() {
            if tok.is_multiword() {
                continue;
            }
            let Some(text) = tok.misc.get(proiel::MISC_PRESENTATION_AFTER) else {
                continue;
            };
            let mut chars = text.chars();
            let (Some(mark), None) = (chars.next(), chars.next()) else {
                continue;
            };
            if self.exclude.contains(&mark) {
                continue;
            }
            let Some(head) = nearest_headless(sent, pos) else {
                continue;
            };
            planned.push((pos, mark, head));
        }

        for &(pos, mark, head) in planned.iter().rev() {
            let fields = NewToken {
                form: mark.to_string(),
                lemma: mark.to_string(),
                xpos: "PUNCT".to_string(),
                head: Head::Id(head),
                deprel: "punct".to_string(),
                ..Default::default()
            };
            if let Err(e) = edit::insert_synthetic(sent, pos + 1, fields) {
                eprintln!("warning: infer-punct skipped a token: {}", e);
            }
        }
    }
}

/// Resolves empty nodes of one legacy sort by promoting a dependent into
/// their place. With a relation hierarchy the highest-ranking dependent
/// is chosen (no match: the node is left for a later stage); without
/// one, the first dependent in surface order. The other dependents are
/// demoted to `demoted` (punctuation keeps its relation), and
/// dependent-less empty nodes are simply deleted.
pub struct ResolveEmptyNodes {
    pub sort: String,
    pub hierarchy: Vec<String>,
    pub demoted: String,
    /// Also relabel the promoted token's own pre-existing dependents, as
    /// ellipsis resolution does.
    pub relabel_promoted_dependents: bool,
}

impl ResolveEmptyNodes {
    /// Ellipsis configuration: promote by hierarchy, demote to `orphan`.
    pub fn ellipsis(sort: &str, hierarchy: &[&str]) -> Self {
        Self {
            sort: sort.to_string(),
            hierarchy: hierarchy.iter().map(|s| s.to_string()).collect(),
            demoted: "orphan".to_string(),
            relabel_promoted_dependents: true,
        }
    }

    /// Coordination-node configuration: promote the first dependent,
    /// demote the rest to `parataxis`.
    pub fn first_dependent(sort: &str) -> Self {
        Self {
            sort: sort.to_string(),
            hierarchy: Vec::new(),
            demoted: "parataxis".to_string(),
            relabel_promoted_dependents: false,
        }
    }

    fn choose(&self, sent: &Sentence, deps: &[usize]) -> Option<usize> {
        if self.hierarchy.is_empty() {
            return deps.first().copied();
        }
        deps.iter()
            .copied()
            .filter_map(|p| {
                self.hierarchy
                    .iter()
                    .position(|r| *r == sent.tokens[p].deprel)
                    .map(|rank| (rank, p))
            })
            .min_by_key(|&(rank, _)| rank)
            .map(|(_, p)| p)
    }
}

impl Stage for ResolveEmptyNodes {
    fn name(&self) -> &str {
        "resolve-empty-nodes"
    }

    fn run(&self, sent: &mut Sentence, _faults: &mut FaultLog) {
        let targets: Vec<TokenId> = sent
            .tokens
            .iter()
            .filter(|t| !t.is_multiword() && proiel::empty_token_sort(t) == Some(self.sort.as_str()))
            .map(|t| t.id)
            .collect();

        for id in targets {
            let index = TreeIndex::build(sent);
            let Some(pos) = index.position(id) else {
                continue; // already removed while handling another node
            };
            let deps = index.dependents(id).to_vec();
            if deps.is_empty() {
                if let Err(e) = edit::delete(sent, &index, pos) {
                    eprintln!("warning: resolve-empty-nodes could not delete {}: {}", id, e);
                }
                continue;
            }
            let Some(chosen_pos) = self.choose(sent, &deps) else {
                continue; // nothing promotable; left for a later stage
            };
            if self.relabel_promoted_dependents {
                let chosen_id = sent.tokens[chosen_pos].id;
                for &d in index.dependents(chosen_id) {
                    if !sent.tokens[d].is_punct() {
                        sent.tokens[d].set_deprel(self.demoted.clone());
                    }
                }
            }
            if let Err(e) = edit::promote(sent, &index, chosen_pos, pos, Some(&self.demoted)) {
                eprintln!("warning: resolve-empty-nodes could not promote under {}: {}", id, e);
            }
        }
    }
}

/// Builds `# sent_id` and `# cite` comments from the citation span of a
/// sentence's tokens and drops any legacy non-comment metadata lines
/// (the `<sentence ...>` tag of the upstream format). Citations within
/// one chapter fold into `BOOK_C.V` or `BOOK_C.V1-V2`; anything wider
/// keeps both citations verbatim.
pub struct SentIdsFromCitations;

/// `first`/`last` are citation parts like "JOHN 1.1".
fn build_sent_id(first: &str, last: &str) -> Option<String> {
    if first.is_empty() {
        return None;
    }
    fn parse(s: &str) -> Option<(&str, &str, &str)> {
        let (book, cv) = s.rsplit_once(' ')?;
        let (chapter, verse) = cv.split_once('.')?;
        Some((book, chapter, verse))
    }
    let (Some((fb, fc, fv)), Some((lb, lc, lv))) = (parse(first), parse(last)) else {
        return Some(first.replace(' ', "_"));
    };
    if fb == lb && fc == lc {
        if fv == lv {
            Some(format!("{}_{}.{}", fb, fc, fv))
        } else {
            Some(format!("{}_{}.{}-{}", fb, fc, fv, lv))
        }
    } else {
        Some(format!("{} - {}", first, last))
    }
}

impl Stage for SentIdsFromCitations {
    fn name(&self) -> &str {
        "sent-ids-from-citations"
    }

    fn run(&self, sent: &mut Sentence, _faults: &mut FaultLog) {
        let mut cits = sent
            .tokens
            .iter()
            .filter(|t| !t.is_multiword() && proiel::empty_token_sort(t).is_none())
            .filter_map(|t| t.misc.get(proiel::MISC_CITATION_PART));
        let first = cits.next().map(str::to_string);
        let last = cits.last().map(str::to_string);

        sent.comments.retain(|line| line.starts_with('#'));
        let Some(first) = first else {
            return;
        };
        let last = last.unwrap_or_else(|| first.clone());

        if first == last {
            sent.comments.insert(0, format!("# cite = {}", first));
        } else {
            sent.comments.insert(0, format!("# cite = {} – {}", first, last));
        }
        if let Some(id) = build_sent_id(&first, &last) {
            sent.comments.insert(0, format!("# sent_id = {}", id));
        }
    }
}

/// Derives `SpaceAfter=No` from the sentence's `# text` comment: token
/// forms are aligned left to right against the text, and a token whose
/// successor starts immediately after it gets the flag while one
/// followed by a space loses it. Multiword placeholder rows, tokens
/// whose form cannot be located in the text, and sentences without a
/// text comment are left alone.
pub struct SpaceAfterFromText;

impl Stage for SpaceAfterFromText {
    fn name(&self) -> &str {
        "spaceafter-from-text"
    }

    fn run(&self, sent: &mut Sentence, _faults: &mut FaultLog) {
        let Some(text) = sent.text().map(str::to_string) else {
            return;
        };
        let positions: Vec<usize> = (0..sent.tokens.len())
            .filter(|&p| !sent.tokens[p].is_multiword())
            .collect();

        // Greedy left-to-right alignment of forms against the text.
        let mut spans: Vec<Option<(usize, usize)>> = Vec::with_capacity(positions.len());
        let mut cursor = 0;
        for &p in &positions {
            let form = &sent.tokens[p].form;
            match text.get(cursor..).and_then(|rest| rest.find(form.as_str())) {
                Some(off) => {
                    let start = cursor + off;
                    cursor = start + form.len();
                    spans.push(Some((start, cursor)));
                }
                None => spans.push(None),
            }
        }

        for i in 0..positions.len().saturating_sub(1) {
            let adjacent = match (spans[i], spans[i + 1]) {
                (Some((_, end)), Some((start, _))) => end == start,
                _ => continue,
            };
            let tok = &mut sent.tokens[positions[i]];
            if adjacent {
                if tok.misc.get("SpaceAfter") != Some("No") {
                    tok.misc_mut().set("SpaceAfter", "No");
                }
            } else if tok.misc.get("SpaceAfter") == Some("No") {
                tok.misc_mut().remove("SpaceAfter");
            }
        }
    }
}

/// Keeps the first root of a sentence; every later root is reattached to
/// the root preceding it in surface order, under the configured relation.
pub struct CollapseRoots {
    pub relation: String,
}

impl CollapseRoots {
    pub fn new(relation: &str) -> Self {
        Self {
            relation: relation.to_string(),
        }
    }
}

impl Stage for CollapseRoots {
    fn name(&self) -> &str {
        "collapse-roots"
    }

    fn run(&self, sent: &mut Sentence, _faults: &mut FaultLog) {
        let roots = sent.root_positions();
        for pair in roots.windows(2) {
            let prev_id = sent.tokens[pair[0]].id;
            if let Err(e) = edit::reattach(sent, pair[1], Head::Id(prev_id), Some(&self.relation)) {
                eprintln!("warning: collapse-roots skipped a token: {}", e);
            }
        }
    }
}

/// The renumbering pass as a stage.
pub struct Renumber;

impl Stage for Renumber {
    fn name(&self) -> &str {
        "renumber"
    }

    fn run(&self, sent: &mut Sentence, faults: &mut FaultLog) {
        faults.extend(renumber(sent));
    }
}

/// Final integrity checks as a stage.
pub struct Validate {
    pub sequential: bool,
    pub single_root: bool,
    pub cycles: bool,
}

impl Default for Validate {
    fn default() -> Self {
        Self {
            sequential: true,
            single_root: true,
            cycles: true,
        }
    }
}

impl Stage for Validate {
    fn name(&self) -> &str {
        "validate"
    }

    fn run(&self, sent: &mut Sentence, faults: &mut FaultLog) {
        faults.extend(validate::check_sentence(sent));
        if self.sequential {
            faults.extend(validate::check_sequential(sent));
        }
        if self.single_root {
            faults.extend(validate::check_single_root(sent));
        }
        if self.cycles {
            faults.extend(validate::check_cycles(sent));
        }
    }
}
