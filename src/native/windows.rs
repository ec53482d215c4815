//! Win32 `MultiByteToWideChar` / `WideCharToMultiByte`
//!
//! Both directions size the output with a first call that passes no
//! buffer, allocate that many units plus one, then convert for real with
//! the same flags.

use std::ptr;

use tracing::warn;
use windows_sys::Win32::Foundation::{
    ERROR_INVALID_FLAGS, ERROR_INVALID_PARAMETER, ERROR_NO_UNICODE_TRANSLATION, GetLastError,
};
use windows_sys::Win32::Globalization::{
    GetACP, GetOEMCP, MB_ERR_INVALID_CHARS, MultiByteToWideChar, WC_ERR_INVALID_CHARS,
    WideCharToMultiByte,
};

use crate::names::ValidationPolicy;
use crate::{CodePageId, Error, Result, Validation};

pub(super) const AVAILABLE: bool = true;

pub(super) fn to_wide(
    input: &[u8],
    code_page: CodePageId,
    validation: Validation,
) -> Result<Vec<u16>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    let requested = match validation {
        Validation::Strict => MB_ERR_INVALID_CHARS,
        Validation::Permissive => 0,
    };
    let flags = code_page
        .validation_policy()
        .apply_flags(requested, MB_ERR_INVALID_CHARS);
    let len = ffi_len(input.len())?;

    // SAFETY: input is valid for `len` bytes; a null output with size 0 only queries the length.
    let needed = unsafe {
        MultiByteToWideChar(code_page.get(), flags, input.as_ptr(), len, ptr::null_mut(), 0)
    };
    if needed <= 0 {
        return Err(last_error(code_page, CodePageId::UTF16LE, code_page));
    }

    let mut wide = alloc_units::<u16>(needed as usize + 1)?;
    // SAFETY: wide holds at least `needed` units.
    let written = unsafe {
        MultiByteToWideChar(code_page.get(), flags, input.as_ptr(), len, wide.as_mut_ptr(), needed)
    };
    if written <= 0 {
        return Err(last_error(code_page, CodePageId::UTF16LE, code_page));
    }
    wide.truncate(written as usize);
    Ok(wide)
}

pub(super) fn from_wide(
    wide: &[u16],
    code_page: CodePageId,
    validation: Validation,
) -> Result<Vec<u8>> {
    if wide.is_empty() {
        return Ok(Vec::new());
    }
    let policy = code_page.validation_policy();
    let strict = validation == Validation::Strict;
    // WC_ERR_INVALID_CHARS is only accepted for UTF-8 and GB18030; other
    // code pages are checked through the default-character report instead.
    let (flags, check_default) = match policy {
        ValidationPolicy::Inherit => (0, strict && !is_utf(code_page)),
        _ => {
            let requested = if strict { WC_ERR_INVALID_CHARS } else { 0 };
            (policy.apply_flags(requested, WC_ERR_INVALID_CHARS), false)
        }
    };
    let len = ffi_len(wide.len())?;
    let mut used_default = 0;
    let used_default_ptr = if check_default {
        &mut used_default as *mut i32
    } else {
        ptr::null_mut()
    };

    // SAFETY: wide is valid for `len` units; a null output with size 0 only queries the length.
    let needed = unsafe {
        WideCharToMultiByte(
            code_page.get(),
            flags,
            wide.as_ptr(),
            len,
            ptr::null_mut(),
            0,
            ptr::null(),
            used_default_ptr,
        )
    };
    if needed <= 0 {
        return Err(last_error(CodePageId::UTF16LE, code_page, code_page));
    }
    if used_default != 0 {
        return Err(Error::UnmappableTarget {
            encoding: code_page.to_string(),
            character: char::REPLACEMENT_CHARACTER,
            position: 0,
        });
    }

    let mut out = alloc_units::<u8>(needed as usize + 1)?;
    // SAFETY: out holds at least `needed` bytes.
    let written = unsafe {
        WideCharToMultiByte(
            code_page.get(),
            flags,
            wide.as_ptr(),
            len,
            out.as_mut_ptr(),
            needed,
            ptr::null(),
            ptr::null_mut(),
        )
    };
    if written <= 0 {
        return Err(last_error(CodePageId::UTF16LE, code_page, code_page));
    }
    out.truncate(written as usize);
    Ok(out)
}

pub(super) fn ansi_code_page() -> Option<CodePageId> {
    // SAFETY: no arguments, reads process locale state.
    CodePageId::new(unsafe { GetACP() })
}

pub(super) fn oem_code_page() -> Option<CodePageId> {
    // SAFETY: no arguments, reads process locale state.
    CodePageId::new(unsafe { GetOEMCP() })
}

fn is_utf(code_page: CodePageId) -> bool {
    code_page == CodePageId::UTF7 || code_page == CodePageId::UTF8
}

fn ffi_len(len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| Error::InvalidInput(format!("buffer of {len} units is too large")))
}

fn alloc_units<T: Copy + Default>(count: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(count)
        .map_err(|_| Error::AllocationFailed {
            requested: count * std::mem::size_of::<T>(),
        })?;
    buffer.resize(count, T::default());
    Ok(buffer)
}

fn last_error(from: CodePageId, to: CodePageId, code_page: CodePageId) -> Error {
    // SAFETY: reads the calling thread's last-error value.
    let code = unsafe { GetLastError() };
    match code {
        ERROR_NO_UNICODE_TRANSLATION => Error::MalformedInput {
            encoding: code_page.to_string(),
            position: 0,
        },
        ERROR_INVALID_PARAMETER | ERROR_INVALID_FLAGS => Error::unsupported(from, to),
        _ => {
            warn!(code_page = code_page.get(), code, "native conversion failed");
            Error::InvalidInput(format!(
                "code page {code_page} conversion failed with error {code}"
            ))
        }
    }
}
