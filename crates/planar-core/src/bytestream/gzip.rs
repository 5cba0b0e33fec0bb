/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Archive-entry handle over a gzip member
//!
//! The decompression stream underneath this handle is forward-only.
//! Seeking to an offset at or past the current decompressed position is
//! a pure skip-forward; seeking backward discards the decoder state and
//! replays from the start of the entry, so the cost of a backward seek
//! is proportional to the target offset. Callers that hop backwards
//! frequently on archive entries pay that cost.

use std::io::Read;
use std::sync::Arc;

use flate2::read::GzDecoder;
use log::trace;

use crate::bytestream::{Handle, IoError};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

// FLG bits from RFC 1952
const FEXTRA: u8 = 0b100;
const FNAME: u8 = 0b1000;

/// Read-only cursor over shared compressed bytes, so several entry
/// handles can exist over one archive without copying it
struct SharedCursor {
    data: Arc<Vec<u8>>,
    pos:  usize
}

impl SharedCursor {
    fn new(data: Arc<Vec<u8>>) -> SharedCursor {
        SharedCursor { data, pos: 0 }
    }
}

impl Read for SharedCursor {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let start = self.pos.min(self.data.len());
        let count = (self.data.len() - start).min(buf.len());
        buf[..count].copy_from_slice(&self.data[start..start + count]);
        self.pos = start + count;
        Ok(count)
    }
}

/// Handle over the single member of a gzip archive.
///
/// Holds a non-owning reference to the enclosing archive's compressed
/// bytes plus the entry name recorded in the member header, if any.
/// The decompressed length comes from the ISIZE trailer.
pub struct GzipHandle {
    compressed: Arc<Vec<u8>>,
    entry_name: Option<String>,
    length:     u64,
    decoder:    Option<GzDecoder<SharedCursor>>,
    // bytes already pulled out of the decoder
    decoded:    u64,
    // logical position requested by the caller
    position:   u64,
    closed:     bool
}

impl GzipHandle {
    /// Create a handle over the member of the given gzip archive.
    ///
    /// Fails with a generic I/O error if the bytes do not carry a
    /// well-formed gzip header and trailer.
    pub fn new(compressed: Arc<Vec<u8>>) -> Result<GzipHandle, IoError> {
        if compressed.len() < 18 {
            return Err(IoError::Generic("gzip member shorter than header and trailer"));
        }
        if compressed[..2] != GZIP_MAGIC {
            return Err(IoError::Generic("missing gzip magic bytes"));
        }
        let entry_name = parse_entry_name(&compressed)?;
        // ISIZE, the decompressed length modulo 2^32, little endian
        let tail: [u8; 4] = compressed[compressed.len() - 4..].try_into().unwrap_or([0; 4]);
        let length = u64::from(u32::from_le_bytes(tail));

        Ok(GzipHandle {
            compressed,
            entry_name,
            length,
            decoder: None,
            decoded: 0,
            position: 0,
            closed: false
        })
    }

    /// The file name recorded in the member header, if present
    pub fn entry_name(&self) -> Option<&str> {
        self.entry_name.as_deref()
    }

    /// The compressed bytes of the enclosing archive
    pub fn shared_bytes(&self) -> Arc<Vec<u8>> {
        self.compressed.clone()
    }

    fn check_open(&self) -> Result<(), IoError> {
        if self.closed {
            return Err(IoError::Closed("GzipHandle"));
        }
        Ok(())
    }

    /// Position the decoder at `self.position`, restarting it when the
    /// target lies behind the current decompression cursor
    fn align_decoder(&mut self) -> Result<(), IoError> {
        if self.decoder.is_none() || self.position < self.decoded {
            if self.position < self.decoded {
                trace!(
                    "gzip entry: backward seek to {}, replaying {} bytes from the entry start",
                    self.position, self.position
                );
            }
            let cursor = SharedCursor::new(self.compressed.clone());
            self.decoder = Some(GzDecoder::new(cursor));
            self.decoded = 0;
        }
        // pure skip-forward
        let mut remaining = self.position - self.decoded;
        let decoder = self.decoder.as_mut().ok_or(IoError::Closed("GzipHandle"))?;
        let mut scratch = [0_u8; 8192];
        while remaining > 0 {
            let want = (scratch.len() as u64).min(remaining) as usize;
            let read = decoder.read(&mut scratch[..want])?;
            if read == 0 {
                break;
            }
            self.decoded += read as u64;
            remaining -= read as u64;
        }
        Ok(())
    }
}

impl Handle for GzipHandle {
    fn name(&self) -> &'static str {
        "GzipHandle"
    }

    fn length(&mut self) -> Result<u64, IoError> {
        self.check_open()?;
        Ok(self.length)
    }

    fn seek(&mut self, pos: u64) -> Result<(), IoError> {
        self.check_open()?;
        self.position = pos;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        self.check_open()?;
        self.align_decoder()?;
        if self.position > self.decoded {
            // the skip ran off the end of the member
            return Ok(0);
        }
        let decoder = self.decoder.as_mut().ok_or(IoError::Closed("GzipHandle"))?;
        let read = decoder.read(buf)?;
        self.decoded += read as u64;
        self.position += read as u64;
        Ok(read)
    }

    fn close(&mut self) -> Result<(), IoError> {
        self.decoder = None;
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Extract the optional FNAME field from a gzip member header
pub(crate) fn parse_entry_name(data: &[u8]) -> Result<Option<String>, IoError> {
    let flags = data[3];
    let mut offset = 10_usize;
    if flags & FEXTRA != 0 {
        let xlen = data
            .get(offset..offset + 2)
            .map(|b| usize::from(u16::from_le_bytes([b[0], b[1]])))
            .ok_or(IoError::Generic("truncated gzip extra field"))?;
        offset += 2 + xlen;
    }
    if flags & FNAME == 0 {
        return Ok(None);
    }
    let rest = data
        .get(offset..)
        .ok_or(IoError::Generic("truncated gzip header"))?;
    let end = rest
        .iter()
        .position(|b| *b == 0)
        .ok_or(IoError::Generic("unterminated gzip member name"))?;
    Ok(Some(String::from_utf8_lossy(&rest[..end]).into_owned()))
}
