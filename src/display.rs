use std::fmt::Write;

use unicode_width::UnicodeWidthStr;

use crate::annotation::{Annotation, AnnotationSet};
use crate::text::{Span, TextBuffer};

/// Renders a text with one underline row per annotation.
///
/// ```text
/// hola buenas tardes
/// ╰──╯ greeting
///             ╰────╯ time
/// ```
///
/// Rows follow insertion order. Columns are terminal display widths, so
/// wide and combining characters line up.
pub struct AnnotationDisplay<'a> {
    text: &'a TextBuffer,
    annotations: &'a AnnotationSet,
    only_labels: Option<Vec<String>>,
    show_offsets: bool,
}

impl<'a> std::fmt::Display for AnnotationDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text.as_str())?;

        for annotation in self.included() {
            let Some((start_col, end_col)) = self.columns(annotation) else {
                continue;
            };

            f.write_char('\n')?;
            for _ in 0..start_col {
                f.write_char(' ')?;
            }

            f.write_char('╰')?;
            for _ in (start_col + 1)..end_col.saturating_sub(1) {
                f.write_char('─')?;
            }
            if end_col - start_col > 1 {
                f.write_char('╯')?;
            }

            write!(f, " {}", annotation.label)?;
            if self.show_offsets {
                write!(f, " [{}..{}]", annotation.start, annotation.end)?;
            }
        }

        Ok(())
    }
}

impl<'a> AnnotationDisplay<'a> {
    pub fn new(text: &'a TextBuffer, annotations: &'a AnnotationSet) -> Self {
        AnnotationDisplay {
            text,
            annotations,
            only_labels: None,
            show_offsets: false,
        }
    }

    /// Only render annotations with this label. May be called repeatedly.
    pub fn include(&mut self, label: impl Into<String>) {
        self.only_labels
            .get_or_insert_with(Vec::new)
            .push(label.into());
    }

    /// Takes self
    pub fn with(mut self, label: impl Into<String>) -> Self {
        self.include(label);
        self
    }

    /// Append the UTF-16 range after each label.
    pub fn with_offsets(mut self) -> Self {
        self.show_offsets = true;
        self
    }

    fn included(&self) -> impl Iterator<Item = &'a Annotation> + '_ {
        self.annotations.iter().filter(move |a| match &self.only_labels {
            Some(labels) => labels.iter().any(|l| *l == a.label),
            None => true,
        })
    }

    /// Display columns `[start, end)` of an annotation, or `None` if it no
    /// longer fits the text.
    fn columns(&self, annotation: &Annotation) -> Option<(usize, usize)> {
        let prefix = self.text.slice(Span::new(0, annotation.start))?;
        let body = self.text.slice(annotation.span())?;
        let start_col = UnicodeWidthStr::width(prefix.as_str());
        // Zero-width bodies still get a one-column marker
        let end_col = start_col + UnicodeWidthStr::width(body.as_str()).max(1);
        Some((start_col, end_col))
    }
}
