//! File name transcoding
//!
//! Raw directory entries and arguments are decoded by trying candidate
//! encodings in order: UTF-8, then the OEM code page, then the ANSI code
//! page when the platform reports them, then any configured extras.

use tracing::{debug, trace};

use crate::native::{system_ansi_code_page, system_oem_code_page};
use crate::{
    CodePageId, Converter, EncodingName, Error, NameTable, NativeTranscoder, PrimaryTranscoder,
    Result, Transcoder,
};

/// Decodes and encodes file names against an ordered candidate list
#[derive(Debug, Clone)]
pub struct FilenameCodec<P = PrimaryTranscoder, N = NativeTranscoder> {
    converter: Converter<P, N>,
    candidates: Vec<EncodingName>,
    primary_only: bool,
}

impl FilenameCodec {
    /// Codec with the platform's candidates and the standard converter
    pub fn new() -> Self {
        Self::with_converter(Converter::new(), platform_candidates())
    }
}

impl Default for FilenameCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// UTF-8, then the OEM and ANSI code pages where the platform has them
fn platform_candidates() -> Vec<EncodingName> {
    let mut candidates = vec![EncodingName::from_static("utf-8")];
    for id in [system_oem_code_page(), system_ansi_code_page()].into_iter().flatten() {
        if let Some(name) = code_page_name(id) {
            if !candidates.contains(&name) {
                candidates.push(name);
            }
        }
    }
    candidates
}

/// Printable name for `id`, or its `cp###` spelling when it has none
fn code_page_name(id: CodePageId) -> Option<EncodingName> {
    NameTable::global()
        .id_to_name(id)
        .or_else(|| EncodingName::new(&format!("cp{id}")).ok())
}

impl<P, N> FilenameCodec<P, N>
where
    P: Transcoder<Key = EncodingName>,
    N: Transcoder<Key = CodePageId>,
{
    /// Codec over an explicit converter and candidate list
    pub fn with_converter(converter: Converter<P, N>, candidates: Vec<EncodingName>) -> Self {
        Self {
            converter,
            candidates,
            primary_only: !NativeTranscoder::AVAILABLE,
        }
    }

    /// Append extra candidates after the platform ones
    pub fn with_fallbacks(mut self, names: impl IntoIterator<Item = EncodingName>) -> Self {
        for name in names {
            if !self.candidates.contains(&name) {
                self.candidates.push(name);
            }
        }
        self
    }

    /// Candidate encodings in the order they are tried
    pub fn candidates(&self) -> &[EncodingName] {
        &self.candidates
    }

    /// Decode a raw name with the first candidate that yields valid UTF-8
    pub fn decode(&self, raw: &[u8]) -> Result<String> {
        let utf8 = EncodingName::from_static("utf-8");
        let mut last_err = None;
        for candidate in &self.candidates {
            let attempt = if candidate.is_utf8() {
                utf8_string(raw.to_vec())
            } else {
                self.converter
                    .convert(raw, candidate, &utf8, self.primary_only)
                    .and_then(utf8_string)
            };
            match attempt {
                Ok(name) => {
                    debug!(%candidate, "decoded file name");
                    return Ok(name);
                }
                Err(err) => {
                    trace!(%candidate, error = %err, "candidate rejected");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::InvalidInput("no candidate encodings".to_string())))
    }

    /// Encode a UTF-8 name into `target`
    pub fn encode(&self, name: &str, target: &EncodingName) -> Result<Vec<u8>> {
        if target.is_utf8() {
            return Ok(name.as_bytes().to_vec());
        }
        let utf8 = EncodingName::from_static("utf-8");
        self.converter
            .convert(name.as_bytes(), &utf8, target, self.primary_only)
    }

    /// Convert a platform wide-character name to UTF-8
    pub fn from_wide(&self, wide: &[u16]) -> Result<String> {
        let bytes: Vec<u8> = wide.iter().flat_map(|unit| unit.to_le_bytes()).collect();
        let utf16 = EncodingName::from_static("utf-16le");
        let utf8 = EncodingName::from_static("utf-8");
        let out = self
            .converter
            .convert(&bytes, &utf16, &utf8, self.primary_only)?;
        utf8_string(out)
    }
}

fn utf8_string(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|err| Error::MalformedInput {
        encoding: "utf-8".to_string(),
        position: err.utf8_error().valid_up_to(),
    })
}
