use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of expression at {pos}: expected {expected}")]
    UnexpectedEof { pos: usize, expected: String },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },
}

impl ParseError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize, expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            pos,
            expected: expected.into(),
        }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }

    pub fn pos(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { pos, .. }
            | ParseError::UnexpectedEof { pos, .. }
            | ParseError::InvalidSyntax { pos, .. }
            | ParseError::LexerError { pos } => *pos,
        }
    }

    /// Shift positions of an error raised by a nested parser (template
    /// literal parts) so they point into the enclosing source.
    pub(crate) fn offset(self, by: usize) -> Self {
        match self {
            ParseError::UnexpectedToken { pos, expected, found } => ParseError::UnexpectedToken {
                pos: pos + by,
                expected,
                found,
            },
            ParseError::UnexpectedEof { pos, expected } => ParseError::UnexpectedEof {
                pos: pos + by,
                expected,
            },
            ParseError::InvalidSyntax { pos, message } => ParseError::InvalidSyntax {
                pos: pos + by,
                message,
            },
            ParseError::LexerError { pos } => ParseError::LexerError { pos: pos + by },
        }
    }
}

/// Pretty-print a parse error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, error: &ParseError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let name = "expression";
    let start = error.pos().min(source.len().saturating_sub(1));
    let end = (start + 1).min(source.len()).max(start);

    let report = Report::build(ReportKind::Error, name, start)
        .with_message(error.to_string())
        .with_label(
            Label::new((name, start..end))
                .with_color(Color::Red)
                .with_message(match error {
                    ParseError::UnexpectedToken { expected, .. } => format!("expected {}", expected),
                    ParseError::UnexpectedEof { expected, .. } => format!("expected {}", expected),
                    ParseError::InvalidSyntax { message, .. } => message.clone(),
                    ParseError::LexerError { .. } => "unrecognised character".to_string(),
                }),
        )
        .finish();

    let mut output = Vec::new();
    if report.write((name, Source::from(source)), &mut output).is_err() {
        return error.to_string();
    }
    String::from_utf8(output).unwrap_or_else(|_| error.to_string())
}

/// Plain rendering when ariadne is compiled out
#[cfg(not(feature = "pretty-errors"))]
pub fn format_error(_source: &str, error: &ParseError) -> String {
    error.to_string()
}
