use crate::diagnostics::{Diagnostic, Reporter, Severity};
use crate::doc::{Document, NodeId};
use crate::parser::ParseOptions;

/// Per-parse state: the document being built, the options, and where diagnostics go.
///
/// Every block processor, inline processor and transform gets one of these. Nothing else carries state between them.
pub struct ParseContext<'a> {
    pub doc: Document,
    pub options: &'a ParseOptions,
    /// The link and image openers still waiting for a `]` in the inline text being parsed, latest last.
    pub(crate) brackets: Vec<NodeId>,
    reporter: &'a mut dyn Reporter,
}

impl<'a> ParseContext<'a> {
    pub fn new(options: &'a ParseOptions, reporter: &'a mut dyn Reporter) -> Self {
        Self {
            doc: Document::new(options.source.clone()),
            options,
            brackets: Vec::new(),
            reporter,
        }
    }

    pub fn report(&mut self, severity: Severity, message: impl Into<String>, line: Option<usize>) {
        let diagnostic = Diagnostic {
            severity,
            message: message.into(),
            source: self.options.source.clone(),
            line,
        };
        log::debug!("reporting: {diagnostic}");
        self.reporter.report(diagnostic);
    }

    pub fn warn(&mut self, message: impl Into<String>, line: Option<usize>) {
        self.report(Severity::Warning, message, line);
    }

    pub fn into_document(self) -> Document {
        self.doc
    }
}
