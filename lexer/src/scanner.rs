//! Tag boundary pre-scanner.
//!
//! Classifies a chunk of template source by tag *shape* and name membership
//! in a single left-to-right pass, without building a parse tree. A source
//! loader uses the result to decide whether to keep buffering a truncated
//! chunk, fast-path plain prose, or hand the text to the full parser.
//!
//! The scanner does not look at parameter lists, nesting, or pairing. A
//! `WellFormedSoFar` chunk can still fail full parsing later.

use quill_types::TagRegistry;

const ESCAPE: char = '\\';
const CALL_OPEN: char = '(';

/// Classification of one chunk of source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// No unescaped tag indicator anywhere in the chunk.
    NoTagMarks,
    /// Every unescaped indicator starts an anonymous call or a known name.
    WellFormedSoFar,
    /// An indicator starts an unknown name (`fragment` is empty), or the chunk
    /// ends mid-tag (`fragment` runs from the last indicator to the end).
    Malformed { fragment: String },
}

impl ScanResult {
    #[must_use]
    pub fn has_tag_marks(&self) -> bool {
        !matches!(self, Self::NoTagMarks)
    }

    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// The chunk ended mid-tag; more input may complete it.
    #[must_use]
    pub fn needs_more_input(&self) -> bool {
        matches!(self, Self::Malformed { fragment } if !fragment.is_empty())
    }

    /// Diagnostic fragment for malformed results.
    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        match self {
            Self::Malformed { fragment } => Some(fragment),
            Self::NoTagMarks | Self::WellFormedSoFar => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    SeenIndicator,
    /// Inside a directive name that began at byte offset `start`.
    Identifier { start: usize },
}

enum Step {
    /// Consume the character and continue in the given state.
    Advance(State),
    /// Feed the same character again in `Text`.
    Reprocess,
    Reject(ScanResult),
}

/// Stateless scanner bound to a tag registry. Safe to share across threads.
#[derive(Debug, Clone, Copy)]
pub struct TagBoundaryScanner<'r> {
    registry: &'r TagRegistry,
}

impl<'r> TagBoundaryScanner<'r> {
    #[must_use]
    pub fn new(registry: &'r TagRegistry) -> Self {
        Self { registry }
    }

    /// Classify `source`.
    #[must_use]
    pub fn scan(&self, source: &str) -> ScanResult {
        let mut state = State::Text;
        let mut last_indicator: Option<usize> = None;

        for (pos, ch) in source.char_indices() {
            let mut step = self.step(state, source, pos, ch);
            if matches!(step, Step::Reprocess) {
                step = self.step(State::Text, source, pos, ch);
            }
            match step {
                Step::Advance(next) => {
                    if next == State::SeenIndicator {
                        last_indicator = Some(pos);
                    }
                    state = next;
                }
                Step::Reject(result) => return result,
                // Text never asks for reprocessing.
                Step::Reprocess => state = State::Text,
            }
        }

        match (state, last_indicator) {
            (State::Text, None) => ScanResult::NoTagMarks,
            (State::Text, Some(_)) => ScanResult::WellFormedSoFar,
            (State::SeenIndicator | State::Identifier { .. }, last) => ScanResult::Malformed {
                fragment: source[last.unwrap_or(0)..].to_string(),
            },
        }
    }

    fn step(&self, state: State, source: &str, pos: usize, ch: char) -> Step {
        match state {
            State::Text => {
                if ch == self.registry.indicator() && !is_escaped(source, pos) {
                    Step::Advance(State::SeenIndicator)
                } else {
                    Step::Advance(State::Text)
                }
            }
            State::SeenIndicator => {
                if ch == CALL_OPEN {
                    Step::Advance(State::Text)
                } else if is_identifier_char(ch) {
                    Step::Advance(State::Identifier { start: pos })
                } else {
                    // A bare indicator followed by anything else is literal text.
                    Step::Reprocess
                }
            }
            State::Identifier { start } => {
                if is_identifier_char(ch) {
                    return Step::Advance(state);
                }
                if self.registry.is_known(&source[start..pos]) {
                    Step::Reprocess
                } else {
                    Step::Reject(ScanResult::Malformed {
                        fragment: String::new(),
                    })
                }
            }
        }
    }
}

/// Classify `source` against `registry`.
#[must_use]
pub fn scan(source: &str, registry: &TagRegistry) -> ScanResult {
    TagBoundaryScanner::new(registry).scan(source)
}

/// Directive names are ASCII alphanumerics and underscores.
#[must_use]
pub fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// An indicator directly after a backslash is escaped. Position 0 never is.
fn is_escaped(source: &str, pos: usize) -> bool {
    pos > 0 && source[..pos].ends_with(ESCAPE)
}
