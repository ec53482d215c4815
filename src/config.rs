//! Settings files in any encoding
//!
//! Files are read as raw bytes, detected, stripped of a UTF byte order mark,
//! converted to UTF-8 when needed and only then handed to `serde_json`. A
//! file whose conversion fails is parsed as it is rather than rejected.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::filename::FilenameCodec;
use crate::names::EncodingName;
use crate::native::system_ansi_code_page;
use crate::{CodePageId, Converter, Detector, Transcoder, Validation};

/// Errors from loading a settings file
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// The normalized contents are not valid JSON for the target type
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            ConfigError::Parse(err) => write!(f, "Invalid settings JSON: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(err) => Some(err),
        }
    }
}

/// Detect the encoding of `buf` and return it as UTF-8.
///
/// A UTF-8 or UTF-16 byte order mark reported by the detector is stripped.
/// ASCII and UTF-8 input is returned without conversion. Otherwise the
/// detected encoding is converted; on failure the system ANSI encoding is
/// tried by name on the primary backend, then by code page on the native
/// backend. When every attempt fails the stripped bytes are returned
/// unchanged.
pub fn normalize_to_utf8<'a, P, N>(
    buf: &'a [u8],
    converter: &Converter<P, N>,
    detector: &Detector,
) -> Cow<'a, [u8]>
where
    P: Transcoder<Key = EncodingName>,
    N: Transcoder<Key = CodePageId>,
{
    let detection = match detector.detect(buf) {
        Ok(detection) => detection,
        Err(err) => {
            warn!(error = %err, "detection failed, treating input as UTF-8");
            return Cow::Borrowed(buf);
        }
    };
    let encoding = &detection.encoding;

    let mut body = buf;
    if detection.bom_length > 0 {
        let strip = if encoding.is_utf8() {
            3
        } else if encoding.is_utf16() {
            2
        } else {
            0
        };
        body = &buf[strip.min(buf.len())..];
    }

    if encoding.is_ascii() || encoding.is_utf8() {
        return Cow::Borrowed(body);
    }

    let utf8 = EncodingName::from_static("utf-8");
    match converter.convert(body, encoding, &utf8, false) {
        Ok(out) => {
            debug!(%encoding, bytes = out.len(), "normalized to UTF-8");
            return Cow::Owned(out);
        }
        Err(err) => info!(%encoding, error = %err, "conversion from detected encoding failed"),
    }

    if let Some(ansi) = system_ansi_code_page() {
        if let Some(name) = converter.table().id_to_name(ansi) {
            match converter.convert(body, &name, &utf8, true) {
                Ok(out) => return Cow::Owned(out),
                Err(err) => debug!(%name, error = %err, "ANSI name conversion failed"),
            }
        }
        match converter.convert_code_pages(body, ansi, CodePageId::UTF8) {
            Ok(out) => return Cow::Owned(out),
            Err(err) => {
                debug!(code_page = ansi.get(), error = %err, "ANSI code page conversion failed")
            }
        }
    }

    warn!(%encoding, "could not normalize to UTF-8, using bytes as they are");
    Cow::Borrowed(body)
}

/// Parse JSON from a buffer in any detectable encoding
pub fn parse_json<T, P, N>(
    buf: &[u8],
    converter: &Converter<P, N>,
    detector: &Detector,
) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    P: Transcoder<Key = EncodingName>,
    N: Transcoder<Key = CodePageId>,
{
    let text = normalize_to_utf8(buf, converter, detector);
    serde_json::from_slice(&text).map_err(ConfigError::Parse)
}

/// Read and parse a JSON file in any detectable encoding
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let buf = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = buf.len(), "loading JSON");
    parse_json(&buf, &Converter::new(), &Detector::new())
}

/// Defaults for the command line tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Encoding `convert` writes when `--to` is not given
    pub target_encoding: String,
    /// Never use the native backend
    pub primary_only: bool,
    /// Fail on malformed or unmappable input
    pub strict: bool,
    /// Bytes examined by detection
    pub sample_size: usize,
    /// Top-level-domain hint for detection
    pub tld_hint: Option<String>,
    /// Extra encodings tried when decoding file names
    pub fallback_encodings: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_encoding: "utf-8".to_string(),
            primary_only: false,
            strict: true,
            sample_size: 8192,
            tld_hint: None,
            fallback_encodings: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_json(path)
    }

    /// Requested validation
    pub fn validation(&self) -> Validation {
        if self.strict {
            Validation::Strict
        } else {
            Validation::Permissive
        }
    }

    /// Detector configured from these settings
    pub fn detector(&self) -> Detector {
        let detector = Detector::with_sample_size(self.sample_size);
        match &self.tld_hint {
            Some(tld) => detector.tld_hint(tld.clone()),
            None => detector,
        }
    }

    /// Converter configured from these settings
    pub fn converter(&self) -> Converter {
        Converter::with_validation(self.validation())
    }

    /// Fallback encodings that are valid names; empty entries are skipped
    pub fn fallback_names(&self) -> Vec<EncodingName> {
        self.fallback_encodings
            .iter()
            .filter_map(|name| EncodingName::new(name).ok())
            .collect()
    }

    /// File name codec trying the platform candidates, then the fallbacks
    pub fn filename_codec(&self) -> FilenameCodec {
        FilenameCodec::with_converter(self.converter(), FilenameCodec::new().candidates().to_vec())
            .with_fallbacks(self.fallback_names())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::names::NameTable;
    use crate::{Backend, Error, Result};

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
        bytes
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut buf = vec![0xEF, 0xBB, 0xBF];
        buf.extend_from_slice(br#"{"strict": false}"#);
        let out = normalize_to_utf8(&buf, &Converter::new(), &Detector::new());
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&out[..], br#"{"strict": false}"#);
    }

    #[test]
    fn test_utf16_is_converted() {
        let buf = utf16le_with_bom(r#"{"tldHint": "jp"}"#);
        let out = normalize_to_utf8(&buf, &Converter::new(), &Detector::new());
        assert_eq!(&out[..], br#"{"tldHint": "jp"}"#);
    }

    #[test]
    fn test_legacy_encoding_is_converted() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode(
            "{\"note\": \"Привет, как дела? Это тестовый текст на русском языке.\"}",
        );
        let out = normalize_to_utf8(&bytes, &Converter::new(), &Detector::new().tld_hint("ru"));
        let text = std::str::from_utf8(&out).unwrap();
        assert!(text.contains("Привет"));
    }

    struct Failing;

    impl Transcoder for Failing {
        type Key = EncodingName;

        fn backend(&self) -> Backend {
            Backend::Primary
        }

        fn transcode(&self, _: &[u8], from: &EncodingName, to: &EncodingName) -> Result<Vec<u8>> {
            Err(Error::MalformedInput {
                encoding: from.to_string(),
                position: to.as_str().len(),
            })
        }
    }

    #[test]
    fn test_failed_conversion_keeps_stripped_bytes() {
        let converter =
            Converter::with_backends(NameTable::global(), Failing, crate::NativeTranscoder::new());
        let buf = utf16le_with_bom("{}");
        let out = normalize_to_utf8(&buf, &converter, &Detector::new());
        assert_eq!(&out[..], &[b'{', 0, b'}', 0]);
    }

    #[test]
    fn test_settings_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.target_encoding, "utf-8");
        assert!(settings.strict);
        assert_eq!(settings.sample_size, 8192);
        assert_eq!(settings.validation(), Validation::Strict);
    }

    #[test]
    fn test_settings_load_utf16_file() {
        let json = r#"{"targetEncoding": "gb18030", "primaryOnly": true, "strict": false,
            "sampleSize": 1024, "fallbackEncodings": ["windows-1252", ""]}"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&utf16le_with_bom(json)).unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.target_encoding, "gb18030");
        assert!(settings.primary_only);
        assert_eq!(settings.validation(), Validation::Permissive);
        assert_eq!(settings.detector().max_sample_size(), 1024);
        assert_eq!(settings.fallback_names(), vec![EncodingName::new("windows-1252").unwrap()]);

        let codec = settings.filename_codec();
        assert!(codec.candidates()[0].is_utf8());
        assert_eq!(codec.candidates().last().unwrap(), "windows-1252");
        if !crate::NativeTranscoder::AVAILABLE {
            assert_eq!(codec.decode(b"na\xEFve").unwrap(), "naïve");
        }
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let err = Settings::load(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("missing.json"));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, b"{ not json").unwrap();
        assert!(matches!(Settings::load(&bad), Err(ConfigError::Parse(_))));
    }
}
