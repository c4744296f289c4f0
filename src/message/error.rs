use std::fmt;

use nom::error::ErrorKind;

/// Failure to decode one message, with the byte position it occurred at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError<T>
where
    T: fmt::Debug + Clone + Copy + PartialEq + Eq,
{
    kind: T,
    position: usize,
    message: &'static str,
}

impl<T> ParseError<T>
where
    T: fmt::Debug + Clone + Copy + PartialEq + Eq,
{
    pub fn new(kind: T, position: usize, message: &'static str) -> Self {
        ParseError {
            kind,
            position,
            message,
        }
    }

    pub fn kind(&self) -> T {
        self.kind
    }

    /// Offset into the input handed to the parser.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Name of the message kind being parsed.
    pub fn message(&self) -> &'static str {
        self.message
    }
}

impl ParseError<ErrorKind> {
    /// Convert a nom failure on `input`, locating the position from the
    /// slice nom reports, which may be a sub-slice of a nested parser.
    pub(crate) fn from_nom(
        input: &[u8],
        err: nom::Err<nom::error::Error<&[u8]>>,
        message: &'static str,
    ) -> Self {
        match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                let start = input.as_ptr() as usize;
                let at = e.input.as_ptr() as usize;
                let position = if at >= start && at <= start + input.len() {
                    at - start
                } else {
                    input.len().saturating_sub(e.input.len())
                };
                ParseError::new(e.code, position, message)
            }
            nom::Err::Incomplete(_) => ParseError::new(ErrorKind::Eof, input.len(), message),
        }
    }
}

impl<T> fmt::Display for ParseError<T>
where
    T: fmt::Debug + Clone + Copy + PartialEq + Eq,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error in {} at position {}: {:?}",
            self.message, self.position, self.kind
        )
    }
}

impl<T> std::error::Error for ParseError<T> where T: fmt::Debug + Clone + Copy + PartialEq + Eq {}
