//! Error types for mesh loading and print-cost estimation
//!
//! Every error carries a stable code so that callers (and support staff
//! reading logs) can categorize failures without parsing prose.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O errors
//! - **E2xxx**: Mesh file parsing errors (user can pick another file)
//! - **E3xxx**: Validation errors (user can fix the request)
//! - **E4xxx**: Internal computation errors
//! - **E5xxx**: Storage and cart errors
//!
//! Use [`Error::kind`] to get the category and [`Error::user_message`] for the
//! text that may be shown to an end user.

use std::io;
use thiserror::Error;

/// Result type for printquote operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown to users for failures they cannot fix themselves
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while pricing this model. Please try again or choose a different file.";

/// Broad category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Reading or writing files failed
    Io,
    /// The uploaded mesh bytes are malformed
    Parse,
    /// Request parameters, upload metadata or session state are invalid
    Validation,
    /// Unexpected numeric failure inside the estimator
    Computation,
    /// Persistence or cart bookkeeping failed
    Storage,
}

/// Errors that can occur while loading meshes and pricing prints
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading or writing a file
    ///
    /// **Error Code**: E1001
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error while opening a 3MF package
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - Corrupted or truncated 3MF upload
    /// - A non-3MF file renamed to `.3mf`
    #[error("[E2001] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parsing error inside a 3MF model part
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error inside a 3MF model part
    ///
    /// **Error Code**: E2003
    #[error("[E2003] XML attribute error: {0}")]
    XmlAttr(String),

    /// The bytes do not follow a recognized mesh layout
    ///
    /// **Error Code**: E2004
    ///
    /// **Common Causes**:
    /// - Non-numeric coordinates in an ASCII STL
    /// - A facet with more or fewer than three vertices
    /// - Unknown 3MF unit
    #[error("[E2004] Invalid mesh format: {0}")]
    InvalidFormat(String),

    /// The file ends before the declared triangle records
    ///
    /// **Error Code**: E2005
    ///
    /// **Suggestions**:
    /// - Re-export the model; the upload was probably cut short
    #[error("[E2005] Truncated mesh file: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required by the header
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// The file contains no triangles
    ///
    /// **Error Code**: E2006
    #[error("[E2006] Empty mesh: the file contains no triangles")]
    EmptyMesh,

    /// Vertex data is not finite
    ///
    /// **Error Code**: E2007
    ///
    /// **Common Causes**:
    /// - NaN or infinite coordinates written by a broken exporter
    /// - Triangle indices pointing past the vertex list (3MF)
    #[error("[E2007] Corrupt geometry: {0}")]
    CorruptGeometry(String),

    /// A print parameter or configuration value is out of range
    ///
    /// **Error Code**: E3001
    #[error("[E3001] Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The upload exceeds the configured size ceiling
    ///
    /// **Error Code**: E3002
    #[error("[E3002] File too large: {size} bytes exceeds the limit of {limit} bytes")]
    FileTooLarge {
        /// Size of the upload in bytes
        size: usize,
        /// Configured maximum in bytes
        limit: usize,
    },

    /// The upload's extension is not an accepted mesh format
    ///
    /// **Error Code**: E3003
    #[error("[E3003] Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// A request body does not match its schema
    ///
    /// **Error Code**: E3004
    #[error("[E3004] Invalid request: {0}")]
    InvalidRequest(String),

    /// An operation was attempted in a state that does not allow it
    ///
    /// **Error Code**: E3005
    #[error("[E3005] Invalid state: {0}")]
    InvalidState(String),

    /// The estimator produced a non-finite value
    ///
    /// **Error Code**: E4001
    #[error("[E4001] Computation error: {0}")]
    Computation(String),

    /// A stored record or cart line does not exist
    ///
    /// **Error Code**: E5001
    #[error("[E5001] Not found: {0}")]
    NotFound(String),

    /// A cart was touched by a session that does not own it
    ///
    /// **Error Code**: E5002
    #[error("[E5002] Cart belongs to a different session")]
    SessionMismatch,

    /// A stored record could not be encoded or decoded
    ///
    /// **Error Code**: E5003
    #[error("[E5003] Serialization error: {0}")]
    Serialization(String),
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::InvalidFormat(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::Zip(_)
            | Error::Xml(_)
            | Error::XmlAttr(_)
            | Error::InvalidFormat(_)
            | Error::Truncated { .. }
            | Error::EmptyMesh
            | Error::CorruptGeometry(_) => ErrorKind::Parse,
            Error::InvalidParameter(_)
            | Error::FileTooLarge { .. }
            | Error::UnsupportedFileType(_)
            | Error::InvalidRequest(_)
            | Error::InvalidState(_) => ErrorKind::Validation,
            Error::Computation(_) => ErrorKind::Computation,
            Error::NotFound(_) | Error::SessionMismatch | Error::Serialization(_) => {
                ErrorKind::Storage
            }
        }
    }

    /// Whether the end user can fix this by changing the file or the request
    pub fn is_user_correctable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Parse | ErrorKind::Validation)
    }

    /// Text suitable for display to an end user
    ///
    /// Parse and validation errors are surfaced verbatim; everything else is
    /// replaced by [`GENERIC_FAILURE_MESSAGE`].
    pub fn user_message(&self) -> String {
        if self.is_user_correctable() {
            self.to_string()
        } else {
            GENERIC_FAILURE_MESSAGE.to_string()
        }
    }

    /// Create an InvalidFormat error with the element or field that was malformed
    ///
    /// # Arguments
    /// * `context` - What was being parsed (e.g., "ASCII STL line 12")
    /// * `message` - Description of the error
    pub fn invalid_format_context(context: &str, message: &str) -> Self {
        Error::InvalidFormat(format!("{}: {}", context, message))
    }

    /// Create an InvalidParameter error for an out-of-range value
    ///
    /// # Arguments
    /// * `name` - The parameter name (e.g., "infill")
    /// * `value` - The offending value
    /// * `expected` - Human-readable description of the accepted range
    pub fn out_of_range(name: &str, value: impl std::fmt::Display, expected: &str) -> Self {
        Error::InvalidParameter(format!(
            "'{}' must be {}, got {}",
            name, expected, value
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_messages() {
        let io_err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "test"));
        assert!(io_err.to_string().contains("[E1001]"));

        let truncated = Error::Truncated {
            expected: 684,
            actual: 100,
        };
        assert!(truncated.to_string().contains("[E2005]"));
        assert!(truncated.to_string().contains("684"));

        assert!(Error::EmptyMesh.to_string().contains("[E2006]"));

        let too_large = Error::FileTooLarge {
            size: 10,
            limit: 5,
        };
        assert!(too_large.to_string().contains("[E3002]"));

        let computation = Error::Computation("NaN weight".to_string());
        assert!(computation.to_string().contains("[E4001]"));

        assert!(Error::SessionMismatch.to_string().contains("[E5002]"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::EmptyMesh.kind(), ErrorKind::Parse);
        assert_eq!(
            Error::CorruptGeometry("nan".into()).kind(),
            ErrorKind::Parse
        );
        assert_eq!(
            Error::InvalidParameter("infill".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::UnsupportedFileType(".obj".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::Computation("inf".into()).kind(),
            ErrorKind::Computation
        );
        assert_eq!(Error::NotFound("7".into()).kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_user_message_hides_computation_details() {
        let err = Error::Computation("weight was NaN after density lookup".to_string());
        assert!(!err.is_user_correctable());
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        assert!(!err.user_message().contains("density"));
    }

    #[test]
    fn test_user_message_is_verbatim_for_validation() {
        let err = Error::out_of_range("infill", 101, "between 10 and 100");
        assert!(err.is_user_correctable());
        assert_eq!(err.user_message(), err.to_string());
        assert!(err.user_message().contains("'infill'"));
        assert!(err.user_message().contains("101"));
    }

    #[test]
    fn test_invalid_format_context_helper() {
        let err = Error::invalid_format_context("ASCII STL line 4", "facet has 2 vertices");
        assert!(err.to_string().contains("ASCII STL line 4"));
        assert!(err.to_string().contains("facet has 2 vertices"));
        assert!(err.to_string().contains("[E2004]"));
    }

    #[test]
    fn test_parse_float_error_conversion() {
        let parse_err: std::num::ParseFloatError = "1,5".parse::<f64>().unwrap_err();
        let err = Error::from(parse_err);
        assert!(err
            .to_string()
            .contains("Failed to parse floating-point number"));
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
