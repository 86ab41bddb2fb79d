use thiserror::Error;

pub type HashmatchResult<T> = Result<T, HashmatchError>;

#[derive(Debug, Error)]
pub enum HashmatchError {
    #[error("key resolution error: {0}")]
    KeyResolution(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("input format error: {0}")]
    InputFormat(String),

    #[error("output write error: {0}")]
    OutputWrite(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("aborted at line {line}: {reason}")]
    RecordAborted { line: u64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HashmatchError {
    /// Process exit code for this error class.
    ///
    /// - 10-19: caller or environment errors
    /// - 20: anything else
    pub fn exit_code(&self) -> i32 {
        match self {
            HashmatchError::InputFormat(_) | HashmatchError::Encoding(_) => 10,
            HashmatchError::KeyResolution(_) => 11,
            HashmatchError::OutputWrite(_) => 12,
            HashmatchError::Config(_) => 13,
            HashmatchError::RecordAborted { .. } => 14,
            HashmatchError::Io(_) | HashmatchError::Other(_) => 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_nonzero() {
        let errors = [
            HashmatchError::KeyResolution("x".into()),
            HashmatchError::Encoding("x".into()),
            HashmatchError::InputFormat("x".into()),
            HashmatchError::OutputWrite("x".into()),
            HashmatchError::Config("x".into()),
            HashmatchError::RecordAborted {
                line: 3,
                reason: "x".into(),
            },
            HashmatchError::Other(anyhow::anyhow!("x")),
        ];
        for e in &errors {
            assert_ne!(e.exit_code(), 0, "{e} must not exit 0");
        }
    }

    #[test]
    fn test_record_aborted_message() {
        let e = HashmatchError::RecordAborted {
            line: 7,
            reason: "invalid UTF-8".into(),
        };
        assert_eq!(e.to_string(), "aborted at line 7: invalid UTF-8");
    }
}
