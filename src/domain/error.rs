//! Domain error types.

/// A parse error with position information for literal parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with the offending line and a caret under the error position.
    pub fn display_with_context(&self, input: &str) -> String {
        let pos = self.position.min(input.len());
        let line_start = input[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = input[pos..]
            .find('\n')
            .map(|i| pos + i)
            .unwrap_or(input.len());
        let line_no = input[..line_start].matches('\n').count() + 1;
        let column = input[line_start..pos].chars().count();
        let caret = " ".repeat(column) + "^";
        format!(
            "line {line_no}:\n{line}\n{caret}\n{err}",
            line_no = line_no,
            line = &input[line_start..line_end],
            caret = caret,
            err = self
        )
    }
}

/// An instrument record whose series cannot be classified.
///
/// Never fatal: the instrument is treated as having fewer than three bars.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("malformed instrument {code}: {reason}")]
pub struct MalformedInstrument {
    pub code: String,
    pub reason: String,
}

/// Top-level error type for pendtag.
#[derive(Debug, thiserror::Error)]
pub enum PendtagError {
    #[error("binding {binding} not found in artifact")]
    BindingNotFound { binding: String },

    #[error(transparent)]
    LiteralParse(#[from] ParseError),

    #[error("unexpected store shape: {reason}")]
    StoreShape { reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailure { path: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PendtagError {
    /// The pipeline phase the error belongs to, used as a diagnostic prefix.
    pub fn phase(&self) -> &'static str {
        match self {
            PendtagError::Io(_) => "read",
            PendtagError::BindingNotFound { .. } => "extract",
            PendtagError::LiteralParse(_) | PendtagError::StoreShape { .. } => "parse",
            PendtagError::WriteFailure { .. } => "write",
            PendtagError::ConfigParse { .. } | PendtagError::ConfigInvalid { .. } => "config",
        }
    }
}

impl From<&PendtagError> for std::process::ExitCode {
    fn from(err: &PendtagError) -> Self {
        let code: u8 = match err {
            PendtagError::Io(_) => 1,
            PendtagError::ConfigParse { .. } | PendtagError::ConfigInvalid { .. } => 2,
            PendtagError::BindingNotFound { .. } => 3,
            PendtagError::LiteralParse(_) | PendtagError::StoreShape { .. } => 4,
            PendtagError::WriteFailure { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
