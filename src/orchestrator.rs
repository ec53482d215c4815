//! Two-tier conversion with native fallback
//!
//! [`Converter::convert`] always tries the primary backend first. When that
//! backend reports the pair unsupported, both names are resolved to code
//! page ids and the conversion is retried on the native backend. Malformed
//! input and allocation failures are final and never retried.

use tracing::{debug, info, warn};

use crate::names::NameTable;
use crate::{
    CodePageId, EncodingName, NativeTranscoder, PrimaryTranscoder, Result, Transcoder, Validation,
};

/// Primary-then-native converter
#[derive(Debug, Clone)]
pub struct Converter<P = PrimaryTranscoder, N = NativeTranscoder> {
    table: &'static NameTable,
    primary: P,
    native: N,
}

impl Converter {
    /// Converter over the standard backends and name table
    pub fn new() -> Self {
        Self::with_backends(NameTable::global(), PrimaryTranscoder::new(), NativeTranscoder::new())
    }

    /// Standard backends with the given requested validation
    pub fn with_validation(validation: Validation) -> Self {
        Self::with_backends(
            NameTable::global(),
            PrimaryTranscoder::new().with_validation(validation),
            NativeTranscoder::new().with_validation(validation),
        )
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, N> Converter<P, N>
where
    P: Transcoder<Key = EncodingName>,
    N: Transcoder<Key = CodePageId>,
{
    /// Converter over custom backends
    pub fn with_backends(table: &'static NameTable, primary: P, native: N) -> Self {
        Self {
            table,
            primary,
            native,
        }
    }

    /// The name table used for fallback resolution
    pub fn table(&self) -> &'static NameTable {
        self.table
    }

    /// The primary backend
    pub fn primary(&self) -> &P {
        &self.primary
    }

    /// The native backend
    pub fn native(&self) -> &N {
        &self.native
    }

    /// Convert `input` from `from` to `to`.
    ///
    /// With `primary_only` the primary backend's result is returned as is.
    /// Otherwise an unsupported pair is retried natively; if either name has
    /// no code page id the primary backend's error is returned.
    pub fn convert(
        &self,
        input: &[u8],
        from: &EncodingName,
        to: &EncodingName,
        primary_only: bool,
    ) -> Result<Vec<u8>> {
        debug!(%from, %to, input = input.len(), primary_only, "converting");
        let primary = self.primary.backend();
        let primary_err = match self.primary.transcode(input, from, to) {
            Ok(output) => return Ok(output),
            Err(err) if primary_only || !err.is_unsupported() => return Err(err),
            Err(err) => err,
        };

        let ids = self
            .table
            .name_to_id(from.as_str())
            .and_then(|src| Ok((src, self.table.name_to_id(to.as_str())?)));
        let (src, dst) = match ids {
            Ok(ids) => ids,
            Err(resolve_err) => {
                warn!(
                    %from,
                    %to,
                    backend = %primary,
                    error = %resolve_err,
                    "no code page for fallback"
                );
                return Err(primary_err);
            }
        };

        info!(
            %from,
            %to,
            src = src.get(),
            dst = dst.get(),
            from_backend = %primary,
            to_backend = %self.native.backend(),
            "falling back"
        );
        self.native.transcode(input, &src, &dst)
    }

    /// Convert between two code pages directly on the native backend
    pub fn convert_code_pages(
        &self,
        input: &[u8],
        from: CodePageId,
        to: CodePageId,
    ) -> Result<Vec<u8>> {
        self.native.transcode(input, &from, &to)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{Backend, Error};

    /// Returns a fixed outcome and counts calls
    struct Mock<K: ?Sized> {
        outcome: Result<Vec<u8>>,
        calls: Cell<usize>,
        keys: std::cell::RefCell<Vec<String>>,
        _key: std::marker::PhantomData<Box<K>>,
    }

    impl<K: ?Sized> Mock<K> {
        fn new(outcome: Result<Vec<u8>>) -> Self {
            Self {
                outcome,
                calls: Cell::new(0),
                keys: Default::default(),
                _key: std::marker::PhantomData,
            }
        }
    }

    impl Transcoder for Mock<EncodingName> {
        type Key = EncodingName;

        fn backend(&self) -> Backend {
            Backend::Primary
        }

        fn transcode(
            &self,
            _input: &[u8],
            from: &EncodingName,
            to: &EncodingName,
        ) -> Result<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            self.keys.borrow_mut().push(format!("{from}->{to}"));
            self.outcome.clone()
        }
    }

    impl Transcoder for Mock<CodePageId> {
        type Key = CodePageId;

        fn backend(&self) -> Backend {
            Backend::Native
        }

        fn transcode(&self, _input: &[u8], from: &CodePageId, to: &CodePageId) -> Result<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            self.keys.borrow_mut().push(format!("{from}->{to}"));
            self.outcome.clone()
        }
    }

    fn name(s: &str) -> EncodingName {
        EncodingName::new(s).unwrap()
    }

    fn unsupported() -> Result<Vec<u8>> {
        Err(Error::unsupported("a", "b"))
    }

    fn converter(
        primary: Result<Vec<u8>>,
        native: Result<Vec<u8>>,
    ) -> Converter<Mock<EncodingName>, Mock<CodePageId>> {
        Converter::with_backends(NameTable::global(), Mock::new(primary), Mock::new(native))
    }

    #[test]
    fn test_primary_success_skips_native() {
        let c = converter(Ok(b"out".to_vec()), Ok(b"native".to_vec()));
        let out = c.convert(b"in", &name("utf-8"), &name("cp437"), false).unwrap();
        assert_eq!(out, b"out");
        assert_eq!(c.primary().calls.get(), 1);
        assert_eq!(c.native().calls.get(), 0);
    }

    #[test]
    fn test_unsupported_falls_back_with_resolved_ids() {
        let c = converter(unsupported(), Ok(b"native".to_vec()));
        let out = c.convert(b"in", &name("cp1025"), &name("ibm420"), false).unwrap();
        assert_eq!(out, b"native");
        assert_eq!(c.native().calls.get(), 1);
        assert_eq!(c.native().keys.borrow()[0], "21025->20420");
    }

    #[test]
    fn test_primary_only_never_falls_back() {
        let c = converter(unsupported(), Ok(b"native".to_vec()));
        let err = c.convert(b"in", &name("cp437"), &name("utf-8"), true).unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(c.native().calls.get(), 0);
    }

    #[test]
    fn test_unresolvable_name_returns_primary_error() {
        let c = converter(unsupported(), Ok(b"native".to_vec()));
        let err = c
            .convert(b"in", &name("bogus-encoding-name"), &name("utf-8"), false)
            .unwrap_err();
        assert_eq!(err, Error::unsupported("a", "b"));
        assert_eq!(c.native().calls.get(), 0);

        let err = c
            .convert(b"in", &name("utf-8"), &name("bogus-encoding-name"), false)
            .unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(c.native().calls.get(), 0);
    }

    #[test]
    fn test_malformed_input_is_not_retried() {
        let malformed = Err(Error::MalformedInput {
            encoding: "utf-8".to_string(),
            position: 1,
        });
        let c = converter(malformed, Ok(b"native".to_vec()));
        let err = c.convert(b"in", &name("utf-8"), &name("cp437"), false).unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(c.native().calls.get(), 0);
    }

    #[test]
    fn test_native_failure_is_returned() {
        let c = converter(unsupported(), Err(Error::unsupported("437", "65001")));
        let err = c.convert(b"in", &name("cp437"), &name("utf-8"), false).unwrap_err();
        assert_eq!(err, Error::unsupported("437", "65001"));
    }

    #[test]
    fn test_backend_kinds() {
        let c = Converter::new();
        assert_eq!(c.primary().backend(), Backend::Primary);
        assert_eq!(c.native().backend(), Backend::Native);
        assert_eq!(c.native().backend().to_string(), "native");
    }

    #[test]
    fn test_real_backends() {
        let c = Converter::new();
        let out = c.convert(&[0x80], &name("windows-1252"), &name("utf-8"), false).unwrap();
        assert_eq!(out, "€".as_bytes());

        // cp437 is not a primary encoding; only the native backend can serve it
        let result = c.convert(b"abc", &name("cp437"), &name("utf-8"), false);
        if NativeTranscoder::AVAILABLE {
            assert_eq!(result.unwrap(), b"abc");
        } else {
            assert!(result.unwrap_err().is_unsupported());
        }
    }
}
