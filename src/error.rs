//! Error handling for the markdown engine.
//!
//! Two kinds of problems exist. Malformed flavour configuration is a
//! programmer error and is reported eagerly as a [`MarkdownError`] when the
//! flavour is built. Everything that can go wrong with a particular document
//! is recovered locally and surfaces only as an [`ErrorInfo`] diagnostic
//! delivered to an [`ErrorHandler`]; parsing and rendering themselves never
//! fail.
use crate::lexer::Position;
use thiserror::Error;

/// Main error type for the markdown engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarkdownError {
    /// A flavour table is empty or otherwise inconsistent.
    #[error("Invalid flavour `{flavour}`: {message}")]
    Configuration { flavour: String, message: String },

    /// The same block start or sequential parser was registered twice.
    #[error("Invalid flavour `{flavour}`: {entry} is registered more than once")]
    DuplicateEntry { flavour: String, entry: String },

    /// A sequential parser produces an element type no provider renders.
    #[error("Invalid flavour `{flavour}`: parser {parser} produces {element} but no generating provider is registered for it")]
    MissingProvider {
        flavour: String,
        parser: String,
        element: String,
    },
}

/// Convenience type alias for Results in the markdown engine.
pub type Result<T> = std::result::Result<T, MarkdownError>;

impl MarkdownError {
    pub fn configuration(flavour: impl Into<String>, message: impl Into<String>) -> Self {
        MarkdownError::Configuration {
            flavour: flavour.into(),
            message: message.into(),
        }
    }

    pub fn duplicate(flavour: impl Into<String>, entry: impl Into<String>) -> Self {
        MarkdownError::DuplicateEntry {
            flavour: flavour.into(),
            entry: entry.into(),
        }
    }

    pub fn missing_provider(
        flavour: impl Into<String>,
        parser: impl Into<String>,
        element: impl Into<String>,
    ) -> Self {
        MarkdownError::MissingProvider {
            flavour: flavour.into(),
            parser: parser.into(),
            element: element.into(),
        }
    }

    /// Name of the flavour that failed validation.
    pub fn flavour(&self) -> &str {
        match self {
            MarkdownError::Configuration { flavour, .. }
            | MarkdownError::DuplicateEntry { flavour, .. }
            | MarkdownError::MissingProvider { flavour, .. } => flavour,
        }
    }
}

/// Severity of a recovered condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Document structure was truncated or degraded.
    Error,
    /// Input was interpreted differently than its syntax suggests.
    Warning,
    /// Informational messages.
    Info,
}

/// What kind of per-document recovery took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecoveryKind {
    /// Container nesting hit the configured cap; the rest of the line was
    /// kept as paragraph text.
    DepthExceeded,
    /// A reference-style link named a label with no definition; the brackets
    /// were kept as literal text.
    UnresolvableReference,
}

/// Detailed diagnostic with severity and source location.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorInfo {
    pub severity: ErrorSeverity,
    pub kind: RecoveryKind,
    pub position: Option<Position>,
    pub message: String,
    pub context: Option<String>,
}

impl ErrorInfo {
    pub fn new(severity: ErrorSeverity, kind: RecoveryKind, message: impl Into<String>) -> Self {
        ErrorInfo {
            severity,
            kind,
            position: None,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Points the diagnostic at `offset` in `text`, with the source line
    /// holding it as context.
    pub fn located(self, text: &str, offset: usize) -> Self {
        let position = Position::at(text, offset);
        let start = text[..position.offset]
            .rfind(['\n', '\r'])
            .map_or(0, |index| index + 1);
        let end = text[position.offset..]
            .find(['\n', '\r'])
            .map_or(text.len(), |index| position.offset + index);
        self.with_position(position).with_context(&text[start..end])
    }
}

/// Receiver for per-document diagnostics.
pub trait ErrorHandler {
    /// Called for every recovered condition.
    fn handle_error(&mut self, error: &ErrorInfo);

    /// Whether the handler still wants diagnostics. Parsing continues either
    /// way; this only lets callers bound how many they collect.
    fn accepts_more(&self) -> bool {
        true
    }
}

/// Default error handler that collects diagnostics in a vector.
#[derive(Debug, Default)]
pub struct DefaultErrorHandler {
    pub errors: Vec<ErrorInfo>,
    pub max_errors: Option<usize>,
}

impl DefaultErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handler that stops collecting after `max_errors` entries.
    pub fn with_max_errors(max_errors: usize) -> Self {
        DefaultErrorHandler {
            errors: Vec::new(),
            max_errors: Some(max_errors),
        }
    }

    pub fn count_by_kind(&self, kind: RecoveryKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }

    pub fn count_by_severity(&self, severity: ErrorSeverity) -> usize {
        self.errors
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn handle_error(&mut self, error: &ErrorInfo) {
        if self.accepts_more() {
            self.errors.push(error.clone());
        }
    }

    fn accepts_more(&self) -> bool {
        match self.max_errors {
            Some(max) => self.errors.len() < max,
            None => true,
        }
    }
}

/// Handler that drops every diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreErrors;

impl ErrorHandler for IgnoreErrors {
    fn handle_error(&mut self, _error: &ErrorInfo) {}

    fn accepts_more(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_display() {
        let error = MarkdownError::configuration("commonmark", "no block starts");
        let message = error.to_string();
        assert!(message.contains("commonmark"));
        assert!(message.contains("no block starts"));
        assert_eq!(error.flavour(), "commonmark");
    }

    #[test]
    fn missing_provider_display() {
        let error = MarkdownError::missing_provider("custom", "Strikethrough", "STRIKETHROUGH");
        assert!(error.to_string().contains("STRIKETHROUGH"));
    }

    #[test]
    fn handler_collects_by_kind() {
        let mut handler = DefaultErrorHandler::new();
        handler.handle_error(&ErrorInfo::new(
            ErrorSeverity::Error,
            RecoveryKind::DepthExceeded,
            "too deep",
        ));
        handler.handle_error(&ErrorInfo::new(
            ErrorSeverity::Warning,
            RecoveryKind::UnresolvableReference,
            "missing",
        ));

        assert_eq!(handler.count_by_kind(RecoveryKind::DepthExceeded), 1);
        assert_eq!(handler.count_by_severity(ErrorSeverity::Warning), 1);
    }

    #[test]
    fn handler_max_errors() {
        let mut handler = DefaultErrorHandler::with_max_errors(2);
        let info = ErrorInfo::new(ErrorSeverity::Info, RecoveryKind::DepthExceeded, "x");

        handler.handle_error(&info);
        assert!(handler.accepts_more());
        handler.handle_error(&info);
        assert!(!handler.accepts_more());
        handler.handle_error(&info);
        assert_eq!(handler.errors.len(), 2);
    }

    #[test]
    fn position_and_context() {
        let position = Position {
            line: 2,
            column: 3,
            offset: 7,
        };
        let info = ErrorInfo::new(ErrorSeverity::Error, RecoveryKind::DepthExceeded, "deep")
            .with_position(position)
            .with_context("> > >");
        assert_eq!(info.position, Some(position));
        assert_eq!(info.context.as_deref(), Some("> > >"));
    }

    #[test]
    fn located_takes_the_source_line() {
        let text = "first\r\nsecond line\nthird";
        let info = ErrorInfo::new(ErrorSeverity::Warning, RecoveryKind::UnresolvableReference, "x")
            .located(text, 10);
        assert_eq!(info.context.as_deref(), Some("second line"));
        let position = info.position.expect("position");
        assert_eq!((position.line, position.column), (2, 4));

        let info = ErrorInfo::new(ErrorSeverity::Error, RecoveryKind::DepthExceeded, "x")
            .located(text, text.len());
        assert_eq!(info.context.as_deref(), Some("third"));
    }
}
