//! Error types for stream ingestion.

/// Failure while splitting a stream's raw bytes into lines.
///
/// Any decode error is terminal for the stream that produced it: ingestion
/// stops and no further lines are cached or broadcast.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("line exceeds {max} bytes without a newline")]
    LineTooLong { max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_too_long_display() {
        let err = DecodeError::LineTooLong { max: 16 };
        assert_eq!(err.to_string(), "line exceeds 16 bytes without a newline");
    }
}
