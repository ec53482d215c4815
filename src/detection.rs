//! Encoding detection for byte buffers of unknown origin
//!
//! Detection runs cheap structural checks first and only then asks the
//! `chardetng` statistical detector:
//!
//! 1. Byte order marks for UTF-8, UTF-16LE and UTF-16BE (confidence 1.0)
//! 2. BOM-less UTF-16, recognised by the position of NUL bytes
//! 3. Pure ASCII
//! 4. Valid UTF-8, more confident the more multibyte sequences it holds
//! 5. `chardetng`, with an optional top-level-domain hint
//!
//! A low confidence is a normal result, not an error.

use chardetng::EncodingDetector;
use serde::Serialize;
use tracing::{debug, trace};

use crate::{EncodingName, Error, Result};

/// Result of encoding detection with confidence score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    /// Most likely encoding
    pub encoding: EncodingName,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f64,
    /// Length of the byte order mark, 0 without one, -1 when BOM reporting is off
    pub bom_length: i16,
}

impl DetectionResult {
    /// BOM length in bytes, or `None` when it was not determined
    pub fn bom_len(&self) -> Option<usize> {
        usize::try_from(self.bom_length).ok()
    }
}

/// Encoding detector
#[derive(Debug, Clone)]
pub struct Detector {
    /// Maximum bytes to analyze for detection
    max_sample_size: usize,
    /// Whether byte order marks are reported
    bom_check: bool,
    /// Top-level domain hint for the statistical detector
    tld: Option<String>,
}

impl Default for Detector {
    fn default() -> Self {
        Self {
            max_sample_size: 8192,
            bom_check: true,
            tld: None,
        }
    }
}

impl Detector {
    /// Create a new encoding detector
    pub fn new() -> Self {
        Self::default()
    }

    /// Create detector with custom sample size
    pub fn with_sample_size(max_sample_size: usize) -> Self {
        Self {
            max_sample_size: max_sample_size.max(1),
            ..Self::default()
        }
    }

    /// Enable or disable BOM reporting. When disabled, BOMs are not
    /// recognised and results carry a BOM length of -1.
    pub fn bom_check(mut self, enabled: bool) -> Self {
        self.bom_check = enabled;
        self
    }

    /// Set a default top-level-domain hint, such as `ru` or `jp`
    pub fn tld_hint(mut self, tld: impl Into<String>) -> Self {
        self.tld = Some(tld.into());
        self
    }

    /// Maximum number of leading bytes examined
    pub fn max_sample_size(&self) -> usize {
        self.max_sample_size
    }

    /// Detect the encoding of `data`
    pub fn detect(&self, data: &[u8]) -> Result<DetectionResult> {
        self.run(data, self.tld.as_deref())
    }

    /// Detect with a top-level-domain hint that overrides the configured one
    pub fn detect_with_hint(&self, data: &[u8], tld: &str) -> Result<DetectionResult> {
        self.run(data, Some(tld))
    }

    fn run(&self, data: &[u8], tld: Option<&str>) -> Result<DetectionResult> {
        let sample = &data[..data.len().min(self.max_sample_size)];
        trace!(len = data.len(), sample = sample.len(), "detecting encoding");

        let no_bom = if self.bom_check { 0 } else { -1 };

        if self.bom_check {
            if let Some((name, bom_length)) = detect_bom(sample) {
                return finish(name, 1.0, bom_length);
            }
        }

        if let Some((name, confidence)) = detect_utf16(sample) {
            return finish(name, confidence, no_bom);
        }

        if sample.is_ascii() {
            return finish("ascii", 0.8, no_bom);
        }

        if let Some(confidence) = detect_utf8(sample) {
            return finish("utf-8", confidence, no_bom);
        }

        let mut detector = EncodingDetector::new();
        detector.feed(sample, true);
        let hint = tld.and_then(normalize_tld);
        let (encoding, confident) =
            detector.guess_assess(hint.as_deref().map(str::as_bytes), false);
        let confidence = if confident { 0.75 } else { 0.35 };
        finish(encoding.name(), confidence, no_bom)
    }
}

/// Copy the winning name into storage owned by the result
fn finish(name: &str, confidence: f64, bom_length: i16) -> Result<DetectionResult> {
    let mut owned = String::new();
    owned
        .try_reserve_exact(name.len())
        .map_err(|_| Error::DetectorOutOfMemory)?;
    owned.push_str(name);

    let result = DetectionResult {
        encoding: EncodingName::from_owned(owned),
        confidence,
        bom_length,
    };
    debug!(encoding = %result.encoding, confidence, bom_length, "detected encoding");
    Ok(result)
}

/// Detect BOM (Byte Order Mark)
fn detect_bom(data: &[u8]) -> Option<(&'static str, i16)> {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Some(("utf-8", 3))
    } else if data.starts_with(&[0xFF, 0xFE]) {
        Some(("utf-16le", 2))
    } else if data.starts_with(&[0xFE, 0xFF]) {
        Some(("utf-16be", 2))
    } else {
        None
    }
}

/// Detect UTF-16 without a BOM from NUL bytes in one half of each unit
fn detect_utf16(data: &[u8]) -> Option<(&'static str, f64)> {
    if data.len() < 4 || data.len() % 2 != 0 {
        return None;
    }

    let mut le = 0usize;
    let mut be = 0usize;
    let total = data.len() / 2;
    for chunk in data.chunks_exact(2) {
        if chunk[1] == 0 && chunk[0] != 0 {
            le += 1;
        } else if chunk[0] == 0 && chunk[1] != 0 {
            be += 1;
        }
    }

    let le_score = le as f64 / total as f64;
    let be_score = be as f64 / total as f64;
    if le_score > be_score && le_score > 0.6 {
        Some(("utf-16le", le_score * 0.8))
    } else if be_score > le_score && be_score > 0.6 {
        Some(("utf-16be", be_score * 0.8))
    } else {
        None
    }
}

/// Confidence that `data` is UTF-8, or `None` if it is not valid UTF-8.
///
/// A sequence cut off at the end of the sample still counts as valid.
fn detect_utf8(data: &[u8]) -> Option<f64> {
    let valid = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(err) if err.error_len().is_none() => {
            // Truncated final sequence; the prefix is valid
            std::str::from_utf8(&data[..err.valid_up_to()]).ok()?
        }
        Err(_) => return None,
    };

    let total_bytes = valid.len();
    if total_bytes == 0 {
        return Some(0.5);
    }
    let multibyte = valid.chars().filter(|c| !c.is_ascii()).count();
    let ratio = multibyte as f64 / total_bytes as f64;
    Some(0.7 + ratio * 0.3)
}

/// Reduce a hint such as `.RU` or `example.co.jp` to the bare lowercase
/// label chardetng expects, or `None` if nothing usable remains.
fn normalize_tld(tld: &str) -> Option<String> {
    let label = tld.trim().trim_end_matches('.').rsplit('.').next()?;
    if label.is_empty() || !label.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    Some(label.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bom_detection() {
        let detector = Detector::new();

        let result = detector.detect(&[0xEF, 0xBB, 0xBF, b'h', b'i']).unwrap();
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.bom_length, 3);
        assert_eq!(result.confidence, 1.0);

        let result = detector.detect(&[0xFF, 0xFE, b'h', 0]).unwrap();
        assert_eq!(result.encoding, "utf-16le");
        assert_eq!(result.bom_len(), Some(2));

        let result = detector.detect(&[0xFE, 0xFF, 0, b'h']).unwrap();
        assert_eq!(result.encoding, "utf-16be");
    }

    #[test]
    fn test_bom_check_disabled() {
        let detector = Detector::new().bom_check(false);
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice("héllo".as_bytes());
        let result = detector.detect(&data).unwrap();
        assert!(result.encoding.is_utf8());
        assert_eq!(result.bom_length, -1);
        assert_eq!(result.bom_len(), None);
    }

    #[test]
    fn test_ascii() {
        let result = detect_plain(b"Hello, World!");
        assert_eq!(result.encoding, "ascii");
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.bom_length, 0);

        assert_eq!(detect_plain(b"").encoding, "ascii");
    }

    #[test]
    fn test_utf8_confidence_grows_with_multibyte_share() {
        let light = detect_plain("Hello, World! é".as_bytes());
        let heavy = detect_plain("éèêëàâäôöûü".as_bytes());
        assert!(light.encoding.is_utf8());
        assert!(heavy.encoding.is_utf8());
        assert!(light.confidence > 0.7);
        assert!(heavy.confidence > light.confidence);
        assert!(heavy.confidence <= 1.0);
    }

    #[test]
    fn test_sample_cut_inside_sequence() {
        let data = "é".repeat(10);
        let result = Detector::with_sample_size(5).detect(data.as_bytes()).unwrap();
        assert!(result.encoding.is_utf8());
    }

    #[test]
    fn test_utf16_without_bom() {
        let le: Vec<u8> = "Hello world".encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(detect_plain(&le).encoding, "utf-16le");

        let be: Vec<u8> = "Hello world".encode_utf16().flat_map(u16::to_be_bytes).collect();
        assert_eq!(detect_plain(&be).encoding, "utf-16be");
    }

    #[test]
    fn test_legacy_latin() {
        let data = b"Gr\xFC\xDFe aus K\xF6ln, sch\xF6ne Stra\xDFe und gro\xDFe Gr\xFC\xDFe";
        let result = detect_plain(data);
        assert_eq!(result.encoding, "windows-1252");
        assert_eq!(result.bom_length, 0);

        let utf8 = crate::convert(data, result.encoding.as_str(), "utf-8", true).unwrap();
        assert!(std::str::from_utf8(&utf8).unwrap().starts_with("Grüße aus Köln"));
    }

    #[test]
    fn test_legacy_japanese() {
        let text = "これは日本語のテキストです。文字コードを判定します。";
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode(text);
        let result = detect_plain(&bytes);
        assert_eq!(result.encoding, "shift_jis");
    }

    #[test]
    fn test_tld_hint() {
        let text = "Привет, как дела? Это тестовый текст на русском языке.";
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode(text);
        let result = Detector::new().detect_with_hint(&bytes, ".RU").unwrap();
        assert_eq!(result.encoding, "windows-1251");
    }

    #[test]
    fn test_normalize_tld() {
        assert_eq!(normalize_tld(".RU").as_deref(), Some("ru"));
        assert_eq!(normalize_tld("example.co.jp").as_deref(), Some("jp"));
        assert_eq!(normalize_tld("jp.").as_deref(), Some("jp"));
        assert_eq!(normalize_tld(""), None);
        assert_eq!(normalize_tld("ü"), None);
    }

    fn detect_plain(data: &[u8]) -> DetectionResult {
        Detector::new().detect(data).unwrap()
    }
}
