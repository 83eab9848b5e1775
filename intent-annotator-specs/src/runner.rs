//! Replays a fixture's steps against an [`AnnotationSet`].

use intent_annotator::{
    Annotation, AnnotationDisplay, AnnotationSet, Span, TextBuffer, TrainingRecord,
};

use crate::errors::{SpecError, SpecResult};
use crate::fixture::{AddExpect, AnnFixture, ReplayStep, Step, Target};

/// A step whose outcome differed from what the fixture expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub source_line: usize,
    pub message: String,
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.source_line, self.message)
    }
}

/// Final state of a replay plus every mismatch encountered on the way.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub title: Option<String>,
    pub action: Option<String>,
    pub text: TextBuffer,
    pub annotations: AnnotationSet,
    pub failures: Vec<StepFailure>,
}

impl ReplayReport {
    pub fn is_pass(&self) -> bool {
        self.failures.is_empty()
    }

    /// Underline rendering of the final state, with offsets.
    pub fn render(&self) -> String {
        AnnotationDisplay::new(&self.text, &self.annotations)
            .with_offsets()
            .to_string()
    }

    /// The record a save would produce, using the fixture's `@action`.
    pub fn record(&self) -> TrainingRecord {
        self.annotations
            .to_training_record(&self.text, self.action.as_deref().unwrap_or_default())
    }
}

/// Run a fixture.
///
/// Markers are committed first, in document order. Step mismatches are
/// collected in the report; only fixtures whose markers cannot be committed
/// fail outright.
pub fn run_fixture(fixture: &AnnFixture) -> SpecResult<ReplayReport> {
    let mut text = TextBuffer::new(fixture.text.as_str());
    let mut annotations = AnnotationSet::new();

    for marker in &fixture.markers {
        annotations
            .try_add(&text, marker.to_annotation())
            .map_err(|e| SpecError::Invalid {
                message: e.to_string(),
            })?;
    }

    let mut failures = Vec::new();
    for step in &fixture.steps {
        if let Err(message) = replay(step, &mut text, &mut annotations) {
            failures.push(StepFailure {
                source_line: step.source_line,
                message,
            });
        }
    }

    Ok(ReplayReport {
        title: fixture.title.clone(),
        action: fixture.action.clone(),
        text,
        annotations,
        failures,
    })
}

fn replay(
    step: &ReplayStep,
    text: &mut TextBuffer,
    annotations: &mut AnnotationSet,
) -> Result<(), String> {
    match &step.step {
        Step::Add {
            label,
            target,
            expect,
        } => {
            let span = resolve_target(target, text)?;
            let result = annotations
                .try_add(text, Annotation::from_span(label.as_str(), span))
                .map(|_| ());
            match (result, expect) {
                (Ok(()), AddExpect::Accepted) => Ok(()),
                (Err(rejected), AddExpect::Overlap { conflicting })
                    if rejected.conflicting.label == *conflicting =>
                {
                    Ok(())
                }
                (Err(rejected), AddExpect::Overlap { conflicting }) => Err(format!(
                    "expected overlap with '{}', got overlap with '{}'",
                    conflicting, rejected.conflicting.label
                )),
                (Err(rejected), AddExpect::Accepted) => Err(format!("expected ok: {}", rejected)),
                (Ok(()), AddExpect::Overlap { conflicting }) => Err(format!(
                    "expected overlap with '{}', but '{}' {} was committed",
                    conflicting, label, span
                )),
            }
        }

        Step::Clear => {
            annotations.clear();
            Ok(())
        }

        Step::Edit { text: new, evicted } => {
            let old = text.replace(new.as_str());
            let actual: Vec<String> = annotations
                .rebase(&old, text)
                .into_iter()
                .map(|a| a.label)
                .collect();
            if actual == *evicted {
                Ok(())
            } else {
                Err(format!("expected evictions {:?}, got {:?}", evicted, actual))
            }
        }

        Step::Expect(expected) => {
            if annotations.as_slice() == expected.as_slice() {
                Ok(())
            } else {
                Err(format!(
                    "expected [{}], got [{}]",
                    describe(expected),
                    describe(annotations.as_slice())
                ))
            }
        }
    }
}

fn resolve_target(target: &Target, text: &TextBuffer) -> Result<Span, String> {
    match target {
        Target::Range(span) => Span::checked(span.start, span.end, text)
            .map_err(|e| e.to_string()),
        Target::Text { needle, nth } => text
            .find_utf16(needle, *nth)
            .filter(|span| !span.is_empty())
            .ok_or_else(|| format!("occurrence {} of {:?} not found", nth, needle)),
    }
}

fn describe(annotations: &[Annotation]) -> String {
    annotations
        .iter()
        .map(|a| format!("{} {}..{}", a.label, a.start, a.end))
        .collect::<Vec<_>>()
        .join(", ")
}
