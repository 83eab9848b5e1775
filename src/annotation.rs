//! The span annotation store.
//!
//! An [`AnnotationSet`] holds user-confirmed `(label, start, end)` triples
//! over one [`TextBuffer`]. It is the only place annotations are mutated and
//! it keeps one invariant: no two stored annotations overlap.
//!
//! # Example
//!
//! ```
//! use intent_annotator::{Annotation, AnnotationSet, TextBuffer};
//!
//! let text = TextBuffer::new("hola buenas tardes");
//! let mut set = AnnotationSet::new();
//!
//! set.try_add(&text, Annotation::new("greeting", 0, 4)).unwrap();
//! let rejected = set.try_add(&text, Annotation::new("time", 2, 8)).unwrap_err();
//! assert_eq!(rejected.conflicting.label, "greeting");
//!
//! set.try_add(&text, Annotation::new("time", 5, 12)).unwrap();
//! let labels: Vec<_> = set.iter().map(|a| a.label.as_str()).collect();
//! assert_eq!(labels, ["greeting", "time"]);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::OverlapRejected;
use crate::record::TrainingRecord;
use crate::text::{Span, TextBuffer, TextEdit};

/// A label bound to a half-open UTF-16 span.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl Annotation {
    pub fn new(label: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    pub fn from_span(label: impl Into<String>, span: Span) -> Self {
        Self::new(label, span.start, span.end)
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    pub fn overlaps(&self, other: &Annotation) -> bool {
        self.span().overlaps(&other.span())
    }

    fn shifted(&self, delta: isize) -> Self {
        Self {
            label: self.label.clone(),
            start: (self.start as isize + delta) as usize,
            end: (self.end as isize + delta) as usize,
        }
    }
}

/// An annotation projected onto its source text, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedAnnotation {
    pub label: String,
    pub start: usize,
    pub end: usize,
    pub substring: String,
}

/// Insertion-ordered, non-overlapping annotations over one text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AnnotationSet {
    annotations: Vec<Annotation>,
}

impl<'de> Deserialize<'de> for AnnotationSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let annotations = Vec::<Annotation>::deserialize(deserializer)?;

        for (i, a) in annotations.iter().enumerate() {
            if a.start >= a.end {
                return Err(serde::de::Error::custom(format!(
                    "annotation '{}' {}..{} is empty or reversed",
                    a.label, a.start, a.end
                )));
            }
            if let Some(b) = annotations[..i].iter().find(|b| b.overlaps(a)) {
                return Err(serde::de::Error::custom(format!(
                    "annotation '{}' {}..{} overlaps '{}' {}..{}",
                    a.label, a.start, a.end, b.label, b.start, b.end
                )));
            }
        }

        Ok(Self { annotations })
    }
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `candidate` unless it overlaps an existing annotation, returning
    /// the stored copy.
    ///
    /// On rejection the set is left untouched.
    ///
    /// # Panics
    ///
    /// Panics if `candidate` is empty, reversed, or extends past the end of
    /// `text`. Ranges derived from user selections should go through
    /// [`Span::checked`] first.
    pub fn try_add(
        &mut self,
        text: &TextBuffer,
        candidate: Annotation,
    ) -> Result<&Annotation, OverlapRejected> {
        assert!(
            candidate.span().fits(text.len_utf16()),
            "annotation '{}' {}..{} is not a valid range for text of length {}",
            candidate.label,
            candidate.start,
            candidate.end,
            text.len_utf16()
        );

        if let Some(conflicting) = self.conflict_with(candidate.span()) {
            debug!(
                label = %candidate.label,
                start = candidate.start,
                end = candidate.end,
                conflicting = %conflicting.label,
                "rejected overlapping annotation"
            );
            return Err(OverlapRejected {
                conflicting: conflicting.clone(),
                candidate,
            });
        }

        debug!(
            label = %candidate.label,
            start = candidate.start,
            end = candidate.end,
            "committed annotation"
        );
        self.annotations.push(candidate);
        Ok(&self.annotations[self.annotations.len() - 1])
    }

    /// First stored annotation overlapping `span`, in insertion order.
    pub fn conflict_with(&self, span: Span) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.span().overlaps(&span))
    }

    /// Remove every annotation.
    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    /// Project every annotation onto `text`.
    ///
    /// Annotations that no longer fit `text` render with an empty substring.
    pub fn render_against(&self, text: &TextBuffer) -> Vec<RenderedAnnotation> {
        self.annotations
            .iter()
            .map(|a| RenderedAnnotation {
                label: a.label.clone(),
                start: a.start,
                end: a.end,
                substring: text.slice(a.span()).unwrap_or_default(),
            })
            .collect()
    }

    /// Serialize together with the text and action into a training record.
    pub fn to_training_record(&self, text: &TextBuffer, action_id: &str) -> TrainingRecord {
        TrainingRecord {
            text: text.as_str().to_string(),
            action: action_id.to_string(),
            entities: self.annotations.clone(),
        }
    }

    /// Rebase annotations after `edit` was applied to the text.
    ///
    /// Annotations before the edit stay put, annotations after it shift by
    /// the length delta, and annotations touched by it are evicted. An
    /// insertion at an annotation's start shifts it; at its end, leaves it.
    /// Returns the evicted annotations in their original order.
    pub fn apply_edit(&mut self, edit: TextEdit) -> Vec<Annotation> {
        let delta = edit.delta();
        let mut kept = Vec::with_capacity(self.annotations.len());
        let mut evicted = Vec::new();

        for annotation in self.annotations.drain(..) {
            let touched = if edit.is_insertion() {
                annotation.start < edit.start && edit.start < annotation.end
            } else {
                annotation.span().overlaps(&edit.replaced())
            };

            if touched {
                evicted.push(annotation);
            } else if annotation.start >= edit.end {
                kept.push(annotation.shifted(delta));
            } else {
                kept.push(annotation);
            }
        }

        self.annotations = kept;
        if !evicted.is_empty() {
            warn!(
                evicted = evicted.len(),
                start = edit.start,
                end = edit.end,
                "text edit evicted annotations"
            );
        }
        evicted
    }

    /// Rebase onto `new` after the text changed from `old`.
    ///
    /// Derives the edit with [`TextEdit::between`], applies it, then drops
    /// anything left outside `new`. Returns every evicted annotation.
    pub fn rebase(&mut self, old: &TextBuffer, new: &TextBuffer) -> Vec<Annotation> {
        let mut evicted = match TextEdit::between(old, new) {
            Some(edit) => self.apply_edit(edit),
            None => Vec::new(),
        };
        evicted.extend(self.retain_within(new));
        evicted
    }

    /// Drop annotations that no longer fit inside `text`.
    pub fn retain_within(&mut self, text: &TextBuffer) -> Vec<Annotation> {
        let len = text.len_utf16();
        let (kept, dropped): (Vec<_>, Vec<_>) = self
            .annotations
            .drain(..)
            .partition(|a| a.span().fits(len));
        self.annotations = kept;
        dropped
    }

    /// Keep only annotations for which `keep` returns true.
    ///
    /// Returns the removed annotations; the survivors keep their order.
    pub fn retain_labels<F>(&mut self, keep: F) -> Vec<Annotation>
    where
        F: Fn(&Annotation) -> bool,
    {
        let (kept, dropped): (Vec<_>, Vec<_>) = self.annotations.drain(..).partition(|a| keep(a));
        self.annotations = kept;
        dropped
    }

    /// Copy of the annotations ordered by position, for display only.
    pub fn by_position(&self) -> Vec<&Annotation> {
        let mut sorted: Vec<_> = self.annotations.iter().collect();
        sorted.sort_by_key(|a| (a.start, a.end));
        sorted
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.annotations.iter()
    }
}
