//! Conversion contexts for the primary backend
//!
//! A context pairs a source decoder with a target encoder and moves bytes
//! from an input slice into a caller-provided output slice, reporting how far
//! it got on each call. Text passes through UTF-8 between the two halves.
//! Encoded bytes that do not fit the caller's output stay queued in the
//! context until the next call.

use encoding_rs::{
    Decoder, DecoderResult, Encoder, EncoderResult, Encoding, REPLACEMENT, UTF_8, UTF_16BE,
    UTF_16LE,
};

use crate::names::NameTable;
use crate::{EncodingName, Error, Result, Validation};

/// Decoded text is staged in a buffer of this many bytes
const TEXT_CAPACITY: usize = 4096;

/// An encoding the primary backend knows how to read and write
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Charset {
    Ascii,
    Latin1,
    Utf8,
    Utf16 { big_endian: bool },
    Utf32 { big_endian: bool },
    Legacy(&'static Encoding),
}

impl Charset {
    /// Resolve a name, or `None` when the primary backend has no such encoding.
    ///
    /// ASCII, Latin-1 and UTF-32 are matched first because the WHATWG label
    /// set either aliases them to windows-1252 or lacks them.
    pub(crate) fn for_name(name: &EncodingName) -> Option<Self> {
        match name.as_str() {
            "ascii" | "us-ascii" | "ansi_x3.4-1968" | "iso646-us" => return Some(Charset::Ascii),
            "iso-8859-1" | "iso8859-1" | "iso88591" | "iso_8859-1" | "latin1" | "latin-1"
            | "l1" | "cp819" | "ibm819" => return Some(Charset::Latin1),
            "utf16" | "utf16le" => return Some(Charset::Utf16 { big_endian: false }),
            "utf16be" => return Some(Charset::Utf16 { big_endian: true }),
            "utf-32" | "utf32" | "utf-32le" | "utf32le" | "ucs-4le" => {
                return Some(Charset::Utf32 { big_endian: false });
            }
            "utf-32be" | "utf32be" | "ucs-4" | "ucs-4be" => {
                return Some(Charset::Utf32 { big_endian: true });
            }
            _ => {}
        }

        let encoding = Encoding::for_label(name.as_str().as_bytes())?;
        if encoding == REPLACEMENT {
            None
        } else if encoding == UTF_8 {
            Some(Charset::Utf8)
        } else if encoding == UTF_16LE {
            Some(Charset::Utf16 { big_endian: false })
        } else if encoding == UTF_16BE {
            Some(Charset::Utf16 { big_endian: true })
        } else {
            Some(Charset::Legacy(encoding))
        }
    }
}

/// Outcome of one context call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    /// All input handed in was consumed and its output fully written
    InputEmpty,
    /// The output slice filled up before everything was written
    OutputFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Progress {
    pub(crate) status: Status,
    pub(crate) read: usize,
    pub(crate) written: usize,
}

enum SourceDecoder {
    Ascii,
    Latin1,
    Utf32 { big_endian: bool },
    Rs(Decoder),
}

impl SourceDecoder {
    fn new(charset: Charset) -> Self {
        match charset {
            Charset::Ascii => SourceDecoder::Ascii,
            Charset::Latin1 => SourceDecoder::Latin1,
            Charset::Utf32 { big_endian } => SourceDecoder::Utf32 { big_endian },
            Charset::Utf8 => SourceDecoder::Rs(UTF_8.new_decoder_without_bom_handling()),
            Charset::Utf16 { big_endian: false } => {
                SourceDecoder::Rs(UTF_16LE.new_decoder_without_bom_handling())
            }
            Charset::Utf16 { big_endian: true } => {
                SourceDecoder::Rs(UTF_16BE.new_decoder_without_bom_handling())
            }
            Charset::Legacy(encoding) => {
                SourceDecoder::Rs(encoding.new_decoder_without_bom_handling())
            }
        }
    }

    /// Decode from `src` into the spare capacity of `dst`.
    ///
    /// Returns the number of bytes read, or the offset into `src` of the
    /// first malformed sequence.
    fn decode(
        &mut self,
        src: &[u8],
        dst: &mut String,
        validation: Validation,
    ) -> std::result::Result<usize, usize> {
        match self {
            SourceDecoder::Rs(decoder) => match validation {
                Validation::Strict => {
                    let (result, read) =
                        decoder.decode_to_string_without_replacement(src, dst, true);
                    match result {
                        DecoderResult::InputEmpty | DecoderResult::OutputFull => Ok(read),
                        DecoderResult::Malformed(length, offset) => {
                            Err(read.saturating_sub(length as usize + offset as usize))
                        }
                    }
                }
                Validation::Permissive => {
                    let (_, read, _) = decoder.decode_to_string(src, dst, true);
                    Ok(read)
                }
            },
            SourceDecoder::Ascii | SourceDecoder::Latin1 => {
                let latin1 = matches!(self, SourceDecoder::Latin1);
                let mut read = 0;
                for &byte in src {
                    let c = if byte < 0x80 || latin1 {
                        byte as char
                    } else if validation == Validation::Permissive {
                        char::REPLACEMENT_CHARACTER
                    } else {
                        return Err(read);
                    };
                    if dst.len() + c.len_utf8() > dst.capacity() {
                        break;
                    }
                    dst.push(c);
                    read += 1;
                }
                Ok(read)
            }
            SourceDecoder::Utf32 { big_endian } => {
                let mut read = 0;
                for chunk in src.chunks(4) {
                    let decoded = <[u8; 4]>::try_from(chunk).ok().and_then(|bytes| {
                        let code = if *big_endian {
                            u32::from_be_bytes(bytes)
                        } else {
                            u32::from_le_bytes(bytes)
                        };
                        char::from_u32(code)
                    });
                    let c = match decoded {
                        Some(c) => c,
                        None if validation == Validation::Permissive => char::REPLACEMENT_CHARACTER,
                        None => return Err(read),
                    };
                    if dst.len() + c.len_utf8() > dst.capacity() {
                        break;
                    }
                    dst.push(c);
                    read += chunk.len();
                }
                Ok(read)
            }
        }
    }
}

enum TargetEncoder {
    Ascii,
    Latin1,
    Utf8,
    Utf16 { big_endian: bool },
    Utf32 { big_endian: bool },
    Rs(Encoder),
}

impl TargetEncoder {
    fn new(charset: Charset) -> Self {
        match charset {
            Charset::Ascii => TargetEncoder::Ascii,
            Charset::Latin1 => TargetEncoder::Latin1,
            Charset::Utf8 => TargetEncoder::Utf8,
            Charset::Utf16 { big_endian } => TargetEncoder::Utf16 { big_endian },
            Charset::Utf32 { big_endian } => TargetEncoder::Utf32 { big_endian },
            Charset::Legacy(encoding) => TargetEncoder::Rs(encoding.new_encoder()),
        }
    }

    /// Append the encoding of `text` to `out`. `base` is the offset of `text`
    /// within the UTF-8 form of the whole input.
    fn encode(
        &mut self,
        text: &str,
        out: &mut Vec<u8>,
        validation: Validation,
        base: usize,
        to: &EncodingName,
    ) -> Result<()> {
        let unmappable = |character: char, offset: usize| Error::UnmappableTarget {
            encoding: to.to_string(),
            character,
            position: base + offset,
        };

        match self {
            TargetEncoder::Utf8 => {
                reserve(out, text.len())?;
                out.extend_from_slice(text.as_bytes());
            }
            TargetEncoder::Utf16 { big_endian } => {
                reserve(out, text.len() * 2)?;
                for unit in text.encode_utf16() {
                    let bytes = if *big_endian {
                        unit.to_be_bytes()
                    } else {
                        unit.to_le_bytes()
                    };
                    out.extend_from_slice(&bytes);
                }
            }
            TargetEncoder::Utf32 { big_endian } => {
                reserve(out, text.len() * 4)?;
                for c in text.chars() {
                    let bytes = if *big_endian {
                        (c as u32).to_be_bytes()
                    } else {
                        (c as u32).to_le_bytes()
                    };
                    out.extend_from_slice(&bytes);
                }
            }
            TargetEncoder::Ascii | TargetEncoder::Latin1 => {
                let limit = if matches!(self, TargetEncoder::Ascii) { 0x7F } else { 0xFF };
                reserve(out, text.len())?;
                for (offset, c) in text.char_indices() {
                    if (c as u32) <= limit {
                        out.push(c as u8);
                    } else if validation == Validation::Permissive {
                        out.push(b'?');
                    } else {
                        return Err(unmappable(c, offset));
                    }
                }
            }
            TargetEncoder::Rs(encoder) => {
                let mut done = 0;
                while done < text.len() {
                    let rest = &text[done..];
                    let needed = encoder
                        .max_buffer_length_from_utf8_without_replacement(rest.len())
                        .ok_or(Error::AllocationFailed {
                            requested: usize::MAX,
                        })?;
                    reserve(out, needed)?;
                    let (result, read) =
                        encoder.encode_from_utf8_to_vec_without_replacement(rest, out, false);
                    match result {
                        EncoderResult::InputEmpty => done = text.len(),
                        EncoderResult::OutputFull => done += read,
                        EncoderResult::Unmappable(c) => {
                            if validation == Validation::Strict {
                                return Err(unmappable(c, done + read - c.len_utf8()));
                            }
                            reserve(out, 1)?;
                            out.push(b'?');
                            done += read;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Append any bytes needed to return the encoder to its initial state,
    /// such as the ISO-2022-JP escape back to ASCII.
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<()> {
        if let TargetEncoder::Rs(encoder) = self {
            let needed = encoder
                .max_buffer_length_from_utf8_without_replacement(0)
                .unwrap_or(8);
            reserve(out, needed)?;
            let _ = encoder.encode_from_utf8_to_vec_without_replacement("", out, true);
        }
        Ok(())
    }
}

fn reserve(out: &mut Vec<u8>, additional: usize) -> Result<()> {
    out.try_reserve(additional)
        .map_err(|_| Error::AllocationFailed {
            requested: additional,
        })
}

/// Open conversion between two named encodings
pub(crate) struct ConversionContext {
    from: EncodingName,
    to: EncodingName,
    decoder: SourceDecoder,
    encoder: TargetEncoder,
    decode_validation: Validation,
    encode_validation: Validation,
    text: String,
    pending: Vec<u8>,
    pending_pos: usize,
    consumed: usize,
    decoded: usize,
    finished: bool,
}

impl ConversionContext {
    /// Open a context, failing with [`Error::UnsupportedConversion`] when
    /// either side is unknown to this backend.
    ///
    /// The requested validation is adjusted separately for each side by the
    /// code page's [`ValidationPolicy`](crate::ValidationPolicy) when the
    /// name has an id.
    pub(crate) fn open(
        from: &EncodingName,
        to: &EncodingName,
        requested: Validation,
        table: &NameTable,
    ) -> Result<Self> {
        let source = Charset::for_name(from).ok_or_else(|| Error::unsupported(from, to))?;
        let target = Charset::for_name(to).ok_or_else(|| Error::unsupported(from, to))?;

        let effective = |name: &EncodingName| {
            table
                .name_to_id(name.as_str())
                .map(|id| id.validation_policy().apply(requested))
                .unwrap_or(requested)
        };

        let mut text = String::new();
        text.try_reserve_exact(TEXT_CAPACITY)
            .map_err(|_| Error::AllocationFailed {
                requested: TEXT_CAPACITY,
            })?;

        Ok(Self {
            from: from.clone(),
            to: to.clone(),
            decoder: SourceDecoder::new(source),
            encoder: TargetEncoder::new(target),
            decode_validation: effective(from),
            encode_validation: effective(to),
            text,
            pending: Vec::new(),
            pending_pos: 0,
            consumed: 0,
            decoded: 0,
            finished: false,
        })
    }

    /// Convert as much of `src` as fits into `dst`.
    ///
    /// `src` must always be the whole remaining input; a trailing incomplete
    /// sequence is reported as malformed.
    pub(crate) fn convert(&mut self, src: &[u8], dst: &mut [u8]) -> Result<Progress> {
        let mut read = 0;
        let mut written = 0;
        loop {
            written += self.drain(&mut dst[written..]);
            if self.pending_pos < self.pending.len() {
                return Ok(self.progress(Status::OutputFull, read, written));
            }
            if read == src.len() {
                return Ok(self.progress(Status::InputEmpty, read, written));
            }

            self.text.clear();
            let taken = self
                .decoder
                .decode(&src[read..], &mut self.text, self.decode_validation)
                .map_err(|offset| Error::MalformedInput {
                    encoding: self.from.to_string(),
                    position: self.consumed + read + offset,
                })?;
            if taken == 0 && self.text.is_empty() {
                return Err(Error::MalformedInput {
                    encoding: self.from.to_string(),
                    position: self.consumed + read,
                });
            }
            read += taken;

            self.encoder.encode(
                &self.text,
                &mut self.pending,
                self.encode_validation,
                self.decoded,
                &self.to,
            )?;
            self.decoded += self.text.len();
        }
    }

    /// Emit the target's reset sequence, if any, into `dst`. Call repeatedly
    /// with fresh output space until it reports [`Status::InputEmpty`].
    pub(crate) fn finish(&mut self, dst: &mut [u8]) -> Result<Progress> {
        if !self.finished {
            self.encoder.finish(&mut self.pending)?;
            self.finished = true;
        }
        let written = self.drain(dst);
        let status = if self.pending_pos < self.pending.len() {
            Status::OutputFull
        } else {
            Status::InputEmpty
        };
        Ok(Progress {
            status,
            read: 0,
            written,
        })
    }

    fn drain(&mut self, dst: &mut [u8]) -> usize {
        let queued = &self.pending[self.pending_pos..];
        let n = queued.len().min(dst.len());
        dst[..n].copy_from_slice(&queued[..n]);
        self.pending_pos += n;
        if self.pending_pos == self.pending.len() {
            self.pending.clear();
            self.pending_pos = 0;
        }
        n
    }

    fn progress(&mut self, status: Status, read: usize, written: usize) -> Progress {
        self.consumed += read;
        Progress {
            status,
            read,
            written,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> EncodingName {
        EncodingName::new(s).unwrap()
    }

    fn open(from: &str, to: &str, validation: Validation) -> ConversionContext {
        ConversionContext::open(&name(from), &name(to), validation, NameTable::global()).unwrap()
    }

    /// Drive a context with a tiny output window to exercise queued output.
    fn run(ctx: &mut ConversionContext, input: &[u8], window: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; window];
        let mut read = 0;
        loop {
            let progress = ctx.convert(&input[read..], &mut buf)?;
            read += progress.read;
            out.extend_from_slice(&buf[..progress.written]);
            if progress.status == Status::InputEmpty {
                break;
            }
        }
        loop {
            let progress = ctx.finish(&mut buf)?;
            out.extend_from_slice(&buf[..progress.written]);
            if progress.status == Status::InputEmpty {
                break;
            }
        }
        Ok(out)
    }

    #[test]
    fn test_charset_resolution() {
        assert_eq!(Charset::for_name(&name("UTF-8")), Some(Charset::Utf8));
        assert_eq!(Charset::for_name(&name("utf-16")), Some(Charset::Utf16 { big_endian: false }));
        assert_eq!(Charset::for_name(&name("utf-16be")), Some(Charset::Utf16 { big_endian: true }));
        assert_eq!(Charset::for_name(&name("utf-32be")), Some(Charset::Utf32 { big_endian: true }));
        assert_eq!(Charset::for_name(&name("iso-8859-1")), Some(Charset::Latin1));
        assert_eq!(Charset::for_name(&name("us-ascii")), Some(Charset::Ascii));
        assert_eq!(
            Charset::for_name(&name("windows-1251")),
            Some(Charset::Legacy(encoding_rs::WINDOWS_1251))
        );
        assert_eq!(Charset::for_name(&name("cp437")), None);
        assert_eq!(Charset::for_name(&name("iso-2022-kr")), None);
        assert_eq!(Charset::for_name(&name("bogus-encoding-name")), None);
    }

    #[test]
    fn test_unsupported_pair_reported_on_open() {
        let err = ConversionContext::open(
            &name("cp437"),
            &name("utf-8"),
            Validation::Strict,
            NameTable::global(),
        )
        .err()
        .unwrap();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_small_output_window() {
        let text = "Ünïcödé text → with arrows and 日本語";
        let mut ctx = open("utf-8", "utf-16be", Validation::Strict);
        let out = run(&mut ctx, text.as_bytes(), 3).unwrap();
        let expected: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_iso_2022_jp_reset_sequence() {
        let mut ctx = open("utf-8", "iso-2022-jp", Validation::Strict);
        let out = run(&mut ctx, "日本".as_bytes(), 2).unwrap();
        assert_eq!(&out[..3], &[0x1B, 0x24, 0x42]);
        assert_eq!(&out[out.len() - 3..], &[0x1B, 0x28, 0x42]);
    }

    #[test]
    fn test_malformed_position() {
        let mut ctx = open("utf-8", "utf-16le", Validation::Strict);
        let err = run(&mut ctx, b"abc\xFFdef", 64).unwrap_err();
        assert_eq!(
            err,
            Error::MalformedInput {
                encoding: "utf-8".to_string(),
                position: 3
            }
        );
    }

    #[test]
    fn test_permissive_replaces() {
        let mut ctx = open("us-ascii", "utf-8", Validation::Permissive);
        let out = run(&mut ctx, b"a\xE9b", 64).unwrap();
        assert_eq!(std::str::from_utf8(&out).unwrap(), "a\u{FFFD}b");

        let mut ctx = open("utf-8", "windows-1252", Validation::Permissive);
        let out = run(&mut ctx, "a日b".as_bytes(), 64).unwrap();
        assert_eq!(out, b"a?b");
    }

    #[test]
    fn test_unmappable_target() {
        let mut ctx = open("utf-8", "iso-8859-1", Validation::Strict);
        let err = run(&mut ctx, "ab€".as_bytes(), 64).unwrap_err();
        assert_eq!(
            err,
            Error::UnmappableTarget {
                encoding: "iso-8859-1".to_string(),
                character: '€',
                position: 2
            }
        );
    }

    #[test]
    fn test_utf32_source() {
        let mut ctx = open("utf-32le", "utf-8", Validation::Strict);
        let out = run(&mut ctx, &[0x41, 0, 0, 0, 0xAC, 0x20, 0, 0], 16).unwrap();
        assert_eq!(std::str::from_utf8(&out).unwrap(), "A€");

        let mut ctx = open("utf-32le", "utf-8", Validation::Strict);
        let err = run(&mut ctx, &[0x41, 0, 0, 0, 0x42, 0], 16).unwrap_err();
        assert!(err.is_malformed());
    }
}
