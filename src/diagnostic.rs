//! Diagnostics for kernel sources.
//!
//! Specialization does not stop at the first bad call site; every
//! problem becomes a [`Diagnostic`] and the batch is rendered together
//! with ariadne. Registry and configuration errors carry a dummy span,
//! so rendering clamps spans to the source it is given.

use std::fmt;
use std::ops::Range;

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::span::Span;

#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }

    fn report_kind(self) -> ReportKind<'static> {
        match self {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        }
    }

    fn color(self) -> Color {
        match self {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        }
    }
}

impl Diagnostic {
    fn new(severity: Severity, message: String, span: Span) -> Self {
        Self {
            severity,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn error(message: String, span: Span) -> Self {
        Self::new(Severity::Error, message, span)
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self::new(Severity::Warning, message, span)
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// The span as a byte range that is valid within `source`.
    pub fn source_range(&self, source: &str) -> Range<usize> {
        let start = (self.span.start as usize).min(source.len());
        let end = (self.span.end as usize).clamp(start, source.len());
        start..end
    }

    /// Print to stderr with the offending source line underlined.
    pub fn render(&self, filename: &str, source: &str) {
        let range = self.source_range(source);
        let label = Label::new((filename, range.clone()))
            .with_message(&self.message)
            .with_color(self.severity.color());
        let mut report = Report::build(self.severity.report_kind(), filename, range.start)
            .with_message(&self.message)
            .with_label(label);
        for note in &self.notes {
            report = report.with_note(note);
        }
        if let Some(help) = &self.help {
            report = report.with_help(help);
        }
        if let Err(e) = report.finish().eprint((filename, Source::from(source))) {
            eprintln!("{} (while rendering: {})", self, e);
        }
    }
}

/// Plain one-line form with indented notes, for contexts without source.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity.label(), self.message)?;
        for note in &self.notes {
            write!(f, "\n  note: {}", note)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {}", help)?;
        }
        Ok(())
    }
}

pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_notes_and_help() {
        let diag = Diagnostic::error("bad call".to_string(), Span::dummy())
            .with_note("backend: rocm".to_string())
            .with_help("use println instead".to_string());
        let text = diag.to_string();
        assert!(text.starts_with("error: bad call"));
        assert!(text.contains("note: backend: rocm"));
        assert!(text.contains("help: use println instead"));
        assert!(diag.is_error());
    }

    #[test]
    fn test_warning_is_not_error() {
        let diag = Diagnostic::warning("unused".to_string(), Span::new(0, 1, 2));
        assert!(!diag.is_error());
        assert!(diag.to_string().starts_with("warning: unused"));
    }

    #[test]
    fn test_source_range_is_clamped() {
        let diag = Diagnostic::error("x".to_string(), Span::new(0, 4, 40));
        assert_eq!(diag.source_range("@grid_dim()"), 4..11);
        assert_eq!(diag.source_range("ab"), 2..2);
        assert_eq!(diag.source_range(""), 0..0);
    }
}
