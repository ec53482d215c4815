//! # EncodingBridge - Character Encoding Detection and Transcoding
//!
//! Guesses the encoding of opaque byte buffers and transcodes whole buffers
//! between named encodings, falling back from a portable conversion backend
//! to the platform's native code page API when the portable one cannot
//! service a pair.
//!
//! ## Features
//!
//! - **Name ↔ code page mapping** with literal aliases and structural
//!   patterns (`cp###`, `ibm###`, `windows-###`, `iso-8859-###`, ...)
//! - **Portable transcoding** backed by `encoding_rs`, plus UTF-16/UTF-32,
//!   Latin-1 and ASCII handled in-crate
//! - **Native fallback** through `MultiByteToWideChar` / `WideCharToMultiByte`
//!   on Windows
//! - **Detection** of BOMs, ASCII, UTF-8 and legacy encodings via `chardetng`
//!
//! ## Quick Start
//!
//! ```rust
//! use encoding_bridge::{convert, detect};
//!
//! // "Hello€" in Windows-1252
//! let input = &[b'H', b'e', b'l', b'l', b'o', 0x80];
//! let utf8 = convert(input, "windows-1252", "utf-8", false).unwrap();
//! assert_eq!(std::str::from_utf8(&utf8).unwrap(), "Hello€");
//!
//! let result = detect("Grüße".as_bytes()).unwrap();
//! assert!(result.encoding.is_utf8());
//! ```

#![deny(missing_docs)]

use std::fmt;

use serde::Serialize;

#[cfg(feature = "config")]
pub mod config;
mod context;
pub mod detection;
pub mod filename;
pub mod names;
pub mod native;
pub mod orchestrator;
pub mod primary;

pub use detection::{DetectionResult, Detector};
pub use names::{CodePageId, EncodingName, NameTable, ValidationPolicy};
pub use native::NativeTranscoder;
pub use orchestrator::Converter;
pub use primary::PrimaryTranscoder;

/// Result type for encoding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during detection and transcoding
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// No backend can convert between these encodings
    UnsupportedConversion {
        /// Source encoding or code page
        from: String,
        /// Target encoding or code page
        to: String,
    },
    /// Input is not valid in its declared encoding
    MalformedInput {
        /// Declared source encoding
        encoding: String,
        /// Byte offset of the first invalid sequence
        position: usize,
    },
    /// Character cannot be represented in the target encoding
    UnmappableTarget {
        /// Target encoding
        encoding: String,
        /// The unmappable character
        character: char,
        /// Byte offset of the character within the UTF-8 form of the input
        position: usize,
    },
    /// A buffer could not be allocated
    AllocationFailed {
        /// Size of the failed request in bytes
        requested: usize,
    },
    /// Encoding name has no code page id
    UnknownEncoding(String),
    /// The detector could not allocate its working or output storage
    DetectorOutOfMemory,
    /// Invalid argument
    InvalidInput(String),
}

impl Error {
    /// True when the pair is unsupported by the backend that reported it
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::UnsupportedConversion { .. })
    }

    /// True when the input could not be decoded or encoded
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::MalformedInput { .. } | Error::UnmappableTarget { .. }
        )
    }

    pub(crate) fn unsupported(from: impl fmt::Display, to: impl fmt::Display) -> Self {
        Error::UnsupportedConversion {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedConversion { from, to } => {
                write!(f, "Unsupported conversion from {} to {}", from, to)
            }
            Error::MalformedInput { encoding, position } => {
                write!(
                    f,
                    "Malformed {} input at position {}",
                    encoding, position
                )
            }
            Error::UnmappableTarget {
                encoding,
                character,
                position,
            } => {
                write!(
                    f,
                    "Cannot encode character '{}' at position {} in {}",
                    character, position, encoding
                )
            }
            Error::AllocationFailed { requested } => {
                write!(f, "Can not allocate memory, needed size: {}", requested)
            }
            Error::UnknownEncoding(name) => write!(f, "Unknown encoding: {}", name),
            Error::DetectorOutOfMemory => write!(f, "Detector ran out of memory"),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Caller-requested handling of invalid input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Validation {
    /// Fail on the first invalid or unmappable sequence
    #[default]
    Strict,
    /// Replace invalid input with U+FFFD and unmappable output with `?`
    Permissive,
}

/// The two conversion backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Backend {
    /// Portable name-based backend
    Primary,
    /// Platform code page backend
    Native,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Primary => write!(f, "primary"),
            Backend::Native => write!(f, "native"),
        }
    }
}

/// A backend that converts whole buffers between two encodings.
///
/// The primary backend is keyed by [`EncodingName`], the native backend by
/// [`CodePageId`]. Output is owned by the caller; on failure nothing is
/// returned and every intermediate buffer has been released.
pub trait Transcoder {
    /// How this backend identifies an encoding
    type Key: fmt::Display + ?Sized;

    /// Which backend this is
    fn backend(&self) -> Backend;

    /// Convert `input` from `from` to `to`
    fn transcode(&self, input: &[u8], from: &Self::Key, to: &Self::Key) -> Result<Vec<u8>>;
}

/// Convert `input` between two named encodings with the default converter.
///
/// With `primary_only` set, the native fallback is never attempted.
pub fn convert(input: &[u8], from: &str, to: &str, primary_only: bool) -> Result<Vec<u8>> {
    let from = EncodingName::new(from)?;
    let to = EncodingName::new(to)?;
    Converter::new().convert(input, &from, &to, primary_only)
}

/// Detect the encoding of `data` with the default detector
pub fn detect(data: &[u8]) -> Result<DetectionResult> {
    Detector::new().detect(data)
}
