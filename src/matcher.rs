//! Anchored pattern matching
//!
//! "Does this pattern match right here?" for scanners that walk a string
//! with a byte cursor. The pattern must match starting exactly at the given
//! offset, and every group comes back as a slice of the original subject.

use regex_automata::meta::{BuildError, Regex};
use regex_automata::util::captures::Captures;
use regex_automata::{Anchored, Input};
use std::ops::Range;

use crate::error::MatchError;

/// A compiled pattern searched only from the start of its window.
///
/// The pattern text is compiled as given; anchoring is a property of the
/// search, not of the pattern.
#[derive(Debug, Clone)]
pub struct AnchoredRegex {
    source: String,
    compiled: Regex,
}

impl AnchoredRegex {
    pub fn new(pattern: &str) -> Result<Self, MatchError> {
        let compiled = Regex::new(pattern).map_err(|source: BuildError| {
            MatchError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;

        Ok(Self {
            source: pattern.to_string(),
            compiled,
        })
    }

    /// The pattern as given, without the anchor
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of groups including group 0
    pub fn captures_len(&self) -> usize {
        self.compiled.captures_len()
    }

    /// Match at `offset`, returning group 0 followed by each capture group.
    ///
    /// A group that did not participate yields `""`.
    pub fn match_at<'h>(
        &self,
        subject: &'h str,
        offset: usize,
    ) -> Result<Option<Vec<&'h str>>, MatchError> {
        let window = window(subject, offset)?;
        let Some(caps) = self.captures(window) else {
            tracing::trace!(pattern = %self.source, offset, "no anchored match");
            return Ok(None);
        };
        Ok(Some(
            caps.iter()
                .map(|group| group.map_or("", |span| &window[span.range()]))
                .collect(),
        ))
    }

    /// Like [`match_at`](Self::match_at), but as absolute byte ranges into
    /// `subject`. Non-participating groups are `None`.
    pub fn span_at(
        &self,
        subject: &str,
        offset: usize,
    ) -> Result<Option<Vec<Option<Range<usize>>>>, MatchError> {
        let window = window(subject, offset)?;
        Ok(self.captures(window).map(|caps| {
            caps.iter()
                .map(|group| group.map(|span| offset + span.start..offset + span.end))
                .collect()
        }))
    }

    fn captures(&self, window: &str) -> Option<Captures> {
        let input = Input::new(window).anchored(Anchored::Yes);
        let mut caps = self.compiled.create_captures();
        self.compiled.search_captures(&input, &mut caps);
        caps.is_match().then_some(caps)
    }
}

fn window(subject: &str, offset: usize) -> Result<&str, MatchError> {
    if offset > subject.len() {
        return Err(MatchError::OffsetOutOfBounds {
            offset,
            len: subject.len(),
        });
    }
    subject
        .get(offset..)
        .ok_or(MatchError::NotCharBoundary { offset })
}

/// Match `pattern` starting exactly at byte `offset` of `subject`.
///
/// `Ok(None)` means no match at that position. `Err` is reserved for an
/// invalid pattern or an offset that does not point into `subject`.
pub fn match_from_offset<'h>(
    pattern: &str,
    subject: &'h str,
    offset: usize,
) -> Result<Option<Vec<&'h str>>, MatchError> {
    AnchoredRegex::new(pattern)?.match_at(subject, offset)
}
