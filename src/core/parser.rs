//! Splits a raw generator response into title, body, and moral lesson.
//!
//! The response is a sequence of blocks separated by blank lines. Labels are
//! matched case-sensitively at the start of a (trimmed) block:
//!
//! - `Title:` sets the title. The last one wins. Inside the body its text
//!   is also kept as a body block.
//! - `Story:` opens body capture; the label itself is dropped.
//! - `Moral Lesson:` sets the moral and closes body capture.
//! - `Word Count:` records the count the generator reports. Inside the body
//!   it is ordinary story text.
//!
//! Outside the body, a `Title:` or `Moral Lesson:` label with nothing after
//! it takes the next unlabelled block as its value. Blocks outside capture
//! that carry no label are ignored.

use tracing::debug;

use crate::schema::story::StoryDraft;

const TITLE_LABEL: &str = "Title:";
const STORY_LABEL: &str = "Story:";
const MORAL_LABEL: &str = "Moral Lesson:";
const WORD_COUNT_LABEL: &str = "Word Count:";

/// Where the scanner is relative to the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyState {
    AwaitingBody,
    Capturing,
    Closed,
}

/// A label seen with an empty remainder, waiting for its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Title,
    Moral,
}

/// Stateless parser for generator responses.
pub struct ContentParser;

impl ContentParser {
    /// Parse `raw` into a draft. Never fails: text without labels yields a
    /// draft with every field empty, which the store will refuse to save.
    pub fn parse(raw: &str) -> StoryDraft {
        let mut draft = StoryDraft::default();
        let mut state = BodyState::AwaitingBody;
        let mut pending: Option<Pending> = None;
        let mut body: Vec<String> = Vec::new();

        for block in blocks(raw) {
            let capturing = state == BodyState::Capturing;
            if let Some(rest) = block.strip_prefix(TITLE_LABEL) {
                let rest = rest.trim();
                if capturing {
                    // An empty label here has no value to give and must not
                    // claim the next body block.
                    if !rest.is_empty() {
                        draft.title = rest.to_string();
                        body.push(rest.to_string());
                    }
                } else {
                    draft.title = rest.to_string();
                    pending = rest.is_empty().then_some(Pending::Title);
                }
            } else if let Some(rest) = block.strip_prefix(STORY_LABEL) {
                state = BodyState::Capturing;
                pending = None;
                push_nonempty(&mut body, rest);
            } else if let Some(rest) = block.strip_prefix(MORAL_LABEL) {
                state = BodyState::Closed;
                draft.moral = rest.trim().to_string();
                pending = draft.moral.is_empty().then_some(Pending::Moral);
            } else if let Some(rest) = block
                .strip_prefix(WORD_COUNT_LABEL)
                .filter(|_| !capturing)
            {
                draft.reported_word_count = leading_number(rest);
                pending = None;
            } else {
                match pending.take() {
                    Some(Pending::Title) => draft.title = block,
                    Some(Pending::Moral) => draft.moral = block,
                    None if state == BodyState::Capturing => body.push(block),
                    None => debug!(block = %block, "ignoring unlabelled block"),
                }
            }
        }

        draft.body = body.join("\n\n");
        debug!(
            title = %draft.title,
            body_words = draft.body_word_count(),
            has_moral = !draft.moral.is_empty(),
            "parsed generator response"
        );
        draft
    }
}

/// Trimmed, non-empty blocks. A line holding only whitespace counts as blank.
fn blocks(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in raw.lines() {
        if line.trim().is_empty() {
            flush(&mut current, &mut out);
        } else {
            current.push(line);
        }
    }
    flush(&mut current, &mut out);
    out
}

fn flush(lines: &mut Vec<&str>, out: &mut Vec<String>) {
    if lines.is_empty() {
        return;
    }
    let block = lines.join("\n").trim().to_string();
    if !block.is_empty() {
        out.push(block);
    }
    lines.clear();
}

fn push_nonempty(body: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        body.push(text.to_string());
    }
}

/// The first run of digits in `text`, if any.
fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text
        .trim_start()
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
