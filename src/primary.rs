//! Portable transcoding backend
//!
//! Converts whole buffers between named encodings with a growable output
//! buffer. The buffer starts at one chunk (the input length unless a fixed
//! chunk size is configured) and grows by exactly one chunk each time the
//! conversion context reports that the output is full.

use std::num::NonZeroUsize;

use tracing::{debug, info, trace, warn};

use crate::context::{ConversionContext, Status};
use crate::names::NameTable;
use crate::{Backend, EncodingName, Error, Result, Transcoder, Validation};

/// Name-keyed transcoder built on `encoding_rs`
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryTranscoder {
    validation: Validation,
    chunk_size: Option<NonZeroUsize>,
}

impl PrimaryTranscoder {
    /// Strict transcoder growing by the input length
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the requested validation. Code pages with a
    /// [`ValidationPolicy`](crate::ValidationPolicy) override may still
    /// convert permissively.
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// Grow the output by a fixed number of bytes instead of the input length
    pub fn with_chunk_size(mut self, chunk_size: NonZeroUsize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Requested validation
    pub fn validation(&self) -> Validation {
        self.validation
    }

    fn chunk_for(&self, input: &[u8]) -> usize {
        self.chunk_size
            .map(NonZeroUsize::get)
            .unwrap_or(input.len())
            .max(1)
    }

    fn run(&self, ctx: &mut ConversionContext, input: &[u8], chunk: usize) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        grow(&mut output, chunk)?;
        let mut used = 0;
        let mut read = 0;

        loop {
            let progress = ctx.convert(&input[read..], &mut output[used..])?;
            read += progress.read;
            used += progress.written;
            match progress.status {
                Status::InputEmpty => break,
                Status::OutputFull => {
                    trace!(used, read, chunk, "output full, growing");
                    grow(&mut output, chunk)?;
                }
            }
        }

        loop {
            let progress = ctx.finish(&mut output[used..])?;
            used += progress.written;
            match progress.status {
                Status::InputEmpty => break,
                Status::OutputFull => grow(&mut output, chunk)?,
            }
        }

        output.truncate(used);
        output.shrink_to_fit();
        Ok(output)
    }
}

/// Extend `output` by `chunk` zeroed bytes
fn grow(output: &mut Vec<u8>, chunk: usize) -> Result<()> {
    let requested = output.len().saturating_add(chunk);
    output.try_reserve_exact(chunk).map_err(|_| {
        warn!(requested, "output buffer allocation failed");
        Error::AllocationFailed { requested }
    })?;
    output.resize(requested, 0);
    Ok(())
}

impl Transcoder for PrimaryTranscoder {
    type Key = EncodingName;

    fn backend(&self) -> Backend {
        Backend::Primary
    }

    fn transcode(&self, input: &[u8], from: &EncodingName, to: &EncodingName) -> Result<Vec<u8>> {
        let mut ctx = ConversionContext::open(from, to, self.validation, NameTable::global())
            .inspect_err(|err| {
                if err.is_unsupported() {
                    info!(%from, %to, "primary backend does not support pair");
                }
            })?;

        let chunk = self.chunk_for(input);
        let output = self.run(&mut ctx, input, chunk)?;
        debug!(%from, %to, input = input.len(), output = output.len(), "primary conversion done");
        Ok(output)
    }
}
