//! Fixture data structures.
//!
//! An `.ann` fixture holds a text with inline `«label:text»` markers plus a
//! list of replay steps run against an [`AnnotationSet`](intent_annotator::AnnotationSet):
//!
//! ```text
//! # Greeting then time
//! @action greet
//! «greeting:hola» buenas tardes
//! > add time 2..8 => overlap greeting
//! > add time "tardes" => ok
//! > expect greeting 0..4, time 12..18
//! ```

use intent_annotator::{Annotation, Span};

/// A `«label:text»` marker found in the fixture text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanMarker {
    pub label: String,
    pub text: String,
    /// UTF-16 range in the marker-free text.
    pub span: Span,
}

impl SpanMarker {
    pub fn to_annotation(&self) -> Annotation {
        Annotation::from_span(self.label.clone(), self.span)
    }
}

/// Where an `add` step puts its span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Explicit `start..end` in UTF-16 units.
    Range(Span),
    /// The `nth` occurrence (0-based) of a quoted substring, as `"text"@n`.
    Text { needle: String, nth: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddExpect {
    Accepted,
    Overlap { conflicting: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `add <label> <target> => ok | overlap <label>`
    Add {
        label: String,
        target: Target,
        expect: AddExpect,
    },
    /// `clear`
    Clear,
    /// `edit "<new text>" => ok | evicts <label>, ...`
    Edit { text: String, evicted: Vec<String> },
    /// `expect <label> <start>..<end>, ...` or `expect empty`
    Expect(Vec<Annotation>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStep {
    pub step: Step,
    pub source_line: usize,
}

/// A parsed `.ann` fixture.
#[derive(Debug, Clone, Default)]
pub struct AnnFixture {
    pub title: Option<String>,
    /// Action the final record is built for.
    pub action: Option<String>,
    /// Marker-free text.
    pub text: String,
    pub markers: Vec<SpanMarker>,
    pub steps: Vec<ReplayStep>,
}

impl AnnFixture {
    /// The markers as annotations, in document order.
    pub fn initial_annotations(&self) -> Vec<Annotation> {
        self.markers.iter().map(SpanMarker::to_annotation).collect()
    }

    pub fn marker(&self, label: &str) -> Option<&SpanMarker> {
        self.markers.iter().find(|m| m.label == label)
    }
}
