//! Platform code page backend
//!
//! Converts between numeric code pages through the platform's byte ↔ wide
//! character API, going via UTF-16 in the middle. Only Windows provides
//! such an API; elsewhere every conversion that needs it reports
//! [`Error::UnsupportedConversion`] and [`NativeTranscoder::AVAILABLE`] is
//! `false`.
//!
//! UTF-16LE (code page 1200) is the wide form itself, so it is handled
//! here on every platform rather than passed to the platform API, which
//! rejects it.

#[cfg(not(windows))]
mod unsupported;
#[cfg(windows)]
mod windows;

#[cfg(not(windows))]
use self::unsupported as platform;
#[cfg(windows)]
use self::windows as platform;

use tracing::debug;

use crate::{Backend, CodePageId, Error, Result, Transcoder, Validation};

/// Code-page-keyed transcoder using the platform conversion API
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeTranscoder {
    validation: Validation,
}

impl NativeTranscoder {
    /// Whether the platform API exists on this build target
    pub const AVAILABLE: bool = platform::AVAILABLE;

    /// Strict native transcoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the requested validation. The code page's
    /// [`ValidationPolicy`](crate::ValidationPolicy) decides the flags
    /// actually passed to the platform.
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// Decode bytes in `code_page` to the platform wide form
    pub fn wide_from_bytes(&self, input: &[u8], code_page: CodePageId) -> Result<Vec<u16>> {
        if code_page == CodePageId::UTF16LE {
            return utf16le_units(input);
        }
        platform::to_wide(input, code_page, self.validation)
    }

    /// Encode the platform wide form to bytes in `code_page`
    pub fn bytes_from_wide(&self, wide: &[u16], code_page: CodePageId) -> Result<Vec<u8>> {
        if code_page == CodePageId::UTF16LE {
            let mut out = Vec::new();
            out.try_reserve_exact(wide.len() * 2)
                .map_err(|_| Error::AllocationFailed {
                    requested: wide.len() * 2,
                })?;
            out.extend(wide.iter().flat_map(|unit| unit.to_le_bytes()));
            return Ok(out);
        }
        platform::from_wide(wide, code_page, self.validation)
    }
}

fn utf16le_units(input: &[u8]) -> Result<Vec<u16>> {
    if input.len() % 2 != 0 {
        return Err(Error::MalformedInput {
            encoding: CodePageId::UTF16LE.to_string(),
            position: input.len() - 1,
        });
    }
    let mut units = Vec::new();
    units
        .try_reserve_exact(input.len() / 2)
        .map_err(|_| Error::AllocationFailed {
            requested: input.len(),
        })?;
    units.extend(
        input
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
    );
    Ok(units)
}

/// The system ANSI code page, where the platform has one
pub fn system_ansi_code_page() -> Option<CodePageId> {
    platform::ansi_code_page()
}

/// The system OEM (console) code page, where the platform has one
pub fn system_oem_code_page() -> Option<CodePageId> {
    platform::oem_code_page()
}

impl Transcoder for NativeTranscoder {
    type Key = CodePageId;

    fn backend(&self) -> Backend {
        Backend::Native
    }

    fn transcode(&self, input: &[u8], from: &CodePageId, to: &CodePageId) -> Result<Vec<u8>> {
        debug!(from = from.get(), to = to.get(), input = input.len(), "native conversion");
        let pair = |err: Error| {
            if err.is_unsupported() {
                Error::unsupported(from, to)
            } else {
                err
            }
        };
        let wide = self.wide_from_bytes(input, *from).map_err(pair)?;
        let output = self.bytes_from_wide(&wide, *to).map_err(pair)?;
        debug!(from = from.get(), to = to.get(), output = output.len(), "native conversion done");
        Ok(output)
    }
}
