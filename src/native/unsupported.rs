//! Targets without a native code page API

use crate::{CodePageId, Error, Result, Validation};

pub(super) const AVAILABLE: bool = false;

pub(super) fn to_wide(
    _input: &[u8],
    code_page: CodePageId,
    _validation: Validation,
) -> Result<Vec<u16>> {
    Err(Error::unsupported(code_page, CodePageId::UTF16LE))
}

pub(super) fn from_wide(
    _wide: &[u16],
    code_page: CodePageId,
    _validation: Validation,
) -> Result<Vec<u8>> {
    Err(Error::unsupported(CodePageId::UTF16LE, code_page))
}

pub(super) fn ansi_code_page() -> Option<CodePageId> {
    None
}

pub(super) fn oem_code_page() -> Option<CodePageId> {
    None
}
