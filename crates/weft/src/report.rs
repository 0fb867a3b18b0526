//! Render match failures as annotated source snippets.
//!
//! [`report`] titles the output with the outermost failure and points
//! the caret at the character where matching actually stopped, which
//! is the deepest link of the cause chain. Intermediate links follow
//! as notes, so a failing rule stack reads top to bottom.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};
use weft_core::MatchError;

/// Render `err` against the input it came from, without color.
pub fn report(input: &str, err: &MatchError) -> String {
    render(input, err, false)
}

/// Render `err` with ANSI styling for terminals.
pub fn report_colored(input: &str, err: &MatchError) -> String {
    render(input, err, true)
}

fn render(input: &str, err: &MatchError, colored: bool) -> String {
    let links = chain(err);
    let deepest = *links.last().expect("the chain starts at the error itself");

    // Hard faults carry no position, and an empty input has no line to
    // annotate. Both fall back to plain text.
    let Some(location) = deepest.location().or(err.location()) else {
        return plain_report(err, &links);
    };
    if input.is_empty() {
        return plain_report(err, &links);
    }

    let renderer = if colored {
        Renderer::styled()
    } else {
        Renderer::plain()
    };

    let title = headline(err);
    let label = headline(deepest);
    let mut annotation = AnnotationKind::Primary.span(caret_span(input, location.offset));
    if links.len() > 1 {
        annotation = annotation.label(&label);
    }
    let snippet = Snippet::source(input).line_start(1).annotation(annotation);
    let report: Vec<Group> = vec![Level::ERROR.primary_title(&title).element(snippet)];

    let mut out = String::new();
    write!(out, "{}", renderer.render(&report)).expect("String write never fails");
    for link in notes(&links) {
        write!(out, "\nnote: {link}").expect("String write never fails");
    }
    out
}

fn plain_report(err: &MatchError, links: &[&MatchError]) -> String {
    let mut out = format!("error: {err}");
    for link in &links[1..] {
        write!(out, "\nnote: {link}").expect("String write never fails");
    }
    out
}

/// The failure and its causes, outermost first.
fn chain(err: &MatchError) -> Vec<&MatchError> {
    let mut links = vec![err];
    let mut cursor = err;
    while let Some(inner) = cause_of(cursor) {
        links.push(inner);
        cursor = inner;
    }
    links
}

fn cause_of(err: &MatchError) -> Option<&MatchError> {
    match err {
        MatchError::Mismatch { cause, .. } => cause.as_deref(),
        MatchError::RuleFailed { cause, .. } => Some(cause.as_ref()),
        _ => None,
    }
}

/// Chain links between the title and the caret label.
fn notes<'a, 'e>(links: &'a [&'e MatchError]) -> &'a [&'e MatchError] {
    if links.len() > 2 {
        &links[1..links.len() - 1]
    } else {
        &[]
    }
}

/// One-line description without the location prefix the `Display`
/// impls carry; the snippet already shows where.
fn headline(err: &MatchError) -> String {
    match err {
        MatchError::Mismatch {
            expected, found, ..
        } => format!("expected {expected}, found {found}"),
        MatchError::RuleFailed { rule, .. } => format!("rule `{rule}` did not match"),
        other => other.to_string(),
    }
}

/// Byte range of the character at `offset`, clamped to the final
/// character when the failure points past the end of input.
fn caret_span(input: &str, offset: usize) -> std::ops::Range<usize> {
    match input.char_indices().nth(offset) {
        Some((start, ch)) => start..start + ch.len_utf8(),
        None => match input.char_indices().last() {
            Some((start, _)) => start..input.len(),
            None => 0..0,
        },
    }
}
