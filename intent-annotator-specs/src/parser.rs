//! Parser for `.ann` fixture files.

use intent_annotator::{Annotation, Span};

use crate::errors::{SpecError, SpecResult};
use crate::fixture::{AddExpect, AnnFixture, ReplayStep, SpanMarker, Step, Target};

/// Parse span markers from text, returning the marker-free text and markers.
///
/// Input text may contain «label:text» markers. Offsets are computed in
/// UTF-16 code units of the marker-free text. Markers cannot nest.
pub fn parse_spans(input: &str) -> SpecResult<(String, Vec<SpanMarker>)> {
    let mut markers = Vec::new();
    let mut normalized = String::new();
    let mut utf16_len = 0;
    let mut chars = input.char_indices();

    while let Some((pos, ch)) = chars.next() {
        if ch != '«' {
            normalized.push(ch);
            utf16_len += ch.len_utf16();
            continue;
        }

        let start = utf16_len;

        let mut label = String::new();
        loop {
            match chars.next() {
                Some((_, ':')) => break,
                Some((_, c)) if c.is_alphanumeric() || c == '_' || c == '-' => label.push(c),
                Some((_, c)) => {
                    return Err(SpecError::Parse {
                        line: count_lines(input, pos),
                        message: format!(
                            "Invalid span marker: expected label character or ':', found '{}'",
                            c
                        ),
                    });
                }
                None => {
                    return Err(SpecError::Parse {
                        line: count_lines(input, pos),
                        message: "Unclosed span marker: expected ':'".to_string(),
                    });
                }
            }
        }

        if label.is_empty() {
            return Err(SpecError::Parse {
                line: count_lines(input, pos),
                message: "Span marker has an empty label".to_string(),
            });
        }

        let mut text = String::new();
        loop {
            match chars.next() {
                Some((_, '»')) => break,
                Some((_, '«')) => {
                    return Err(SpecError::Parse {
                        line: count_lines(input, pos),
                        message: "Span markers cannot nest".to_string(),
                    });
                }
                Some((_, c)) => {
                    text.push(c);
                    normalized.push(c);
                    utf16_len += c.len_utf16();
                }
                None => {
                    return Err(SpecError::Parse {
                        line: count_lines(input, pos),
                        message: "Unclosed span marker: expected '»'".to_string(),
                    });
                }
            }
        }

        markers.push(SpanMarker {
            label,
            text,
            span: Span::new(start, utf16_len),
        });
    }

    Ok((normalized, markers))
}

/// Count lines up to a byte position (for error messages).
fn count_lines(input: &str, byte_pos: usize) -> usize {
    input[..byte_pos.min(input.len())]
        .chars()
        .filter(|&c| c == '\n')
        .count()
        + 1
}

/// Parse a full `.ann` fixture file.
pub fn parse_fixture(input: &str) -> SpecResult<AnnFixture> {
    let mut title = None;
    let mut action = None;
    let mut text_lines = Vec::new();
    let mut first_text_line = 1;
    let mut step_lines = Vec::new();

    for (line_num, line) in input.lines().enumerate() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("# ") {
            if title.is_none() {
                title = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = trimmed.strip_prefix("@action ") {
            action = Some(rest.trim().to_string());
        } else if let Some(rest) = trimmed.strip_prefix("> ") {
            step_lines.push((line_num + 1, rest.trim()));
        } else if !trimmed.is_empty() && !trimmed.starts_with("//") {
            if text_lines.is_empty() {
                first_text_line = line_num + 1;
            }
            text_lines.push(line);
        }
    }

    let content = text_lines.join("\n");
    let (text, markers) = parse_spans(&content).map_err(|e| match e {
        SpecError::Parse { line, message } => SpecError::Parse {
            line: line + first_text_line - 1,
            message,
        },
        other => other,
    })?;

    let mut steps = Vec::new();
    for (source_line, step_text) in step_lines {
        steps.push(ReplayStep {
            step: parse_step(step_text, source_line)?,
            source_line,
        });
    }

    Ok(AnnFixture {
        title,
        action,
        text,
        markers,
        steps,
    })
}

/// Parse one replay step (the part after `> `).
pub fn parse_step(input: &str, line: usize) -> SpecResult<Step> {
    let err = |message: String| SpecError::Parse { line, message };

    let (command, expectation) = match input.rfind("=>") {
        Some(idx) => (input[..idx].trim(), Some(input[idx + 2..].trim())),
        None => (input.trim(), None),
    };
    let (keyword, rest) = command
        .split_once(char::is_whitespace)
        .map(|(k, r)| (k, r.trim()))
        .unwrap_or((command, ""));

    match keyword {
        "clear" => Ok(Step::Clear),

        "add" => {
            let (label, target) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| err(format!("Expected 'add <label> <target>': {}", input)))?;
            let target = parse_target(target.trim(), line)?;
            let expect = match expectation {
                Some("ok") => AddExpect::Accepted,
                Some(e) => match e.strip_prefix("overlap ") {
                    Some(conflicting) => AddExpect::Overlap {
                        conflicting: conflicting.trim().to_string(),
                    },
                    None => return Err(err(format!("Unknown add expectation: {}", e))),
                },
                None => return Err(err(format!("'add' needs '=> ok' or '=> overlap <label>': {}", input))),
            };
            Ok(Step::Add {
                label: label.to_string(),
                target,
                expect,
            })
        }

        "edit" => {
            let (text, trailing) = parse_quoted(rest, line)?;
            if !trailing.trim().is_empty() {
                return Err(err(format!("Unexpected text after edit: {}", trailing)));
            }
            let evicted = match expectation {
                Some("ok") => Vec::new(),
                Some(e) => match e.strip_prefix("evicts ") {
                    Some(labels) => split_list(labels),
                    None => return Err(err(format!("Unknown edit expectation: {}", e))),
                },
                None => return Err(err(format!("'edit' needs '=> ok' or '=> evicts ...': {}", input))),
            };
            Ok(Step::Edit { text, evicted })
        }

        "expect" => {
            if rest == "empty" {
                return Ok(Step::Expect(Vec::new()));
            }
            let mut annotations = Vec::new();
            for item in split_list(rest) {
                let (label, range) = item
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| err(format!("Expected '<label> <start>..<end>': {}", item)))?;
                let span = parse_range(range.trim(), line)?;
                annotations.push(Annotation::from_span(label, span));
            }
            Ok(Step::Expect(annotations))
        }

        other => Err(err(format!("Unknown step '{}'", other))),
    }
}

fn parse_target(input: &str, line: usize) -> SpecResult<Target> {
    if input.starts_with('"') {
        let (needle, rest) = parse_quoted(input, line)?;
        let nth = match rest.trim().strip_prefix('@') {
            Some(n) => n.trim().parse().map_err(|_| SpecError::Parse {
                line,
                message: format!("Invalid occurrence index: {}", n),
            })?,
            None if rest.trim().is_empty() => 0,
            None => {
                return Err(SpecError::Parse {
                    line,
                    message: format!("Unexpected text after target: {}", rest),
                })
            }
        };
        Ok(Target::Text { needle, nth })
    } else {
        Ok(Target::Range(parse_range(input, line)?))
    }
}

/// `start..end` with no validation against any text.
fn parse_range(input: &str, line: usize) -> SpecResult<Span> {
    let invalid = || SpecError::Parse {
        line,
        message: format!("Invalid range '{}': expected <start>..<end>", input),
    };
    let (start, end) = input.split_once("..").ok_or_else(invalid)?;
    let start = start.trim().parse().map_err(|_| invalid())?;
    let end = end.trim().parse().map_err(|_| invalid())?;
    Ok(Span::new(start, end))
}

/// Parse a `"..."` string with `\"`, `\\` and `\n` escapes. Returns the
/// string and whatever follows the closing quote.
fn parse_quoted(input: &str, line: usize) -> SpecResult<(String, &str)> {
    let body = input.strip_prefix('"').ok_or_else(|| SpecError::Parse {
        line,
        message: format!("Expected a quoted string: {}", input),
    })?;

    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &body[i + 1..])),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            c => out.push(c),
        }
    }

    Err(SpecError::Parse {
        line,
        message: format!("Unclosed string: {}", input),
    })
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
