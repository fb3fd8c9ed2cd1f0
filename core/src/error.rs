//! Error taxonomy shared by every scan-align crate.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Boxed source error carried by [`Error::ExternalOperation`].
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Insufficient points: need at least {required}, got {actual}")]
    InsufficientPoints { required: usize, actual: usize },

    #[error("Degenerate plane: {0}")]
    DegeneratePlane(String),

    #[error("Underdetermined alignment: need at least {required} correspondence points, got {actual}")]
    UnderdeterminedAlignment { required: usize, actual: usize },

    #[error("External operation '{operation}' failed: {source}")]
    ExternalOperation {
        operation: &'static str,
        #[source]
        source: BoxedSource,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless discriminant of [`Error`], used in reports and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InsufficientPoints,
    DegeneratePlane,
    UnderdeterminedAlignment,
    ExternalOperation,
    InvalidInput,
    Parse,
    UnsupportedFormat,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InsufficientPoints { .. } => ErrorKind::InsufficientPoints,
            Error::DegeneratePlane(_) => ErrorKind::DegeneratePlane,
            Error::UnderdeterminedAlignment { .. } => ErrorKind::UnderdeterminedAlignment,
            Error::ExternalOperation { .. } => ErrorKind::ExternalOperation,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Parse(_) => ErrorKind::Parse,
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Wrap a collaborator failure, naming the operation that failed.
    pub fn external<E>(operation: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::ExternalOperation {
            operation,
            source: Box::new(source),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InsufficientPoints => "InsufficientPointsError",
            ErrorKind::DegeneratePlane => "DegeneratePlaneError",
            ErrorKind::UnderdeterminedAlignment => "UnderdeterminedAlignmentError",
            ErrorKind::ExternalOperation => "ExternalOperationError",
            ErrorKind::InvalidInput => "InvalidInputError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::UnsupportedFormat => "UnsupportedFormatError",
            ErrorKind::Io => "IoError",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("host went away")]
    struct Gone;

    #[test]
    fn test_external_keeps_operation_and_source() {
        let err = Error::external("cut_points_below_plane", Gone);
        assert_eq!(err.kind(), ErrorKind::ExternalOperation);
        let msg = err.to_string();
        assert!(msg.contains("cut_points_below_plane"));
        assert!(msg.contains("host went away"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_kind_display_names() {
        let err = Error::UnderdeterminedAlignment {
            required: 3,
            actual: 2,
        };
        assert_eq!(err.kind().to_string(), "UnderdeterminedAlignmentError");
        assert!(err.to_string().contains("got 2"));
    }
}
