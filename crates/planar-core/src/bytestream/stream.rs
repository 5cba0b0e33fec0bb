/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Seekable, byte-order aware buffered stream over a [`Handle`]

use crate::bytestream::{Handle, IoError};
use crate::pixel::ByteOrder;

/// Default size of the buffered window.
///
/// A throughput tunable, not a correctness parameter; tests shrink it
/// to force refills on tiny fixtures.
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Default block size used by [`BufferedStream::find_string`]
pub const DEFAULT_SEARCH_BLOCK: usize = 256 * 1024;

/// Hard cap on how far a terminator search may scan before failing.
///
/// Bounds the damage a pathological input without terminators can do.
pub const MAX_SEARCH_SIZE: u64 = 512 * 1024 * 1024;

struct Mark {
    position: u64,
    limit:    u64
}

/// A buffered random-access stream over one exclusively owned [`Handle`].
///
/// Keeps a file pointer, a contiguous buffered window of recently read
/// bytes and a byte-order flag honored by every multi-byte primitive.
/// Reads that fall outside the window trigger a refill at the miss
/// offset; the refill is the only place backing-store I/O happens, and
/// it retries short reads until the window is filled or the end of the
/// resource is reached. Genuine I/O errors are never retried.
///
/// Writes are not buffered; they invalidate the window and go straight
/// to the handle. Writing at or beyond the current length extends the
/// resource to the post-write file pointer, with any gap zero-filled.
pub struct BufferedStream {
    handle:          Box<dyn Handle>,
    pointer:         u64,
    order:           ByteOrder,
    buffer:          Vec<u8>,
    buffer_start:    u64,
    buffer_valid:    usize,
    buffer_size:     usize,
    length_override: Option<u64>,
    mark:            Option<Mark>
}

impl BufferedStream {
    /// Create a stream over `handle` with the default window size.
    ///
    /// The stream starts out big endian.
    pub fn new(handle: Box<dyn Handle>) -> BufferedStream {
        Self::with_buffer_size(handle, DEFAULT_BUFFER_SIZE)
    }

    /// Create a stream with a custom buffered-window size
    pub fn with_buffer_size(handle: Box<dyn Handle>, buffer_size: usize) -> BufferedStream {
        BufferedStream {
            handle,
            pointer: 0,
            order: ByteOrder::BigEndian,
            buffer: Vec::new(),
            buffer_start: 0,
            buffer_valid: 0,
            buffer_size: buffer_size.max(1),
            length_override: None,
            mark: None
        }
    }

    /// Get the active byte order
    pub const fn order(&self) -> ByteOrder {
        self.order
    }

    /// Set the byte order honored by the multi-byte primitives
    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Get the current absolute file pointer
    pub const fn file_pointer(&self) -> u64 {
        self.pointer
    }

    /// Current length of the stream in bytes.
    ///
    /// Reflects the logical truncation installed by
    /// [`set_length`](Self::set_length) when one is active.
    pub fn length(&mut self) -> Result<u64, IoError> {
        match self.length_override {
            Some(length) => Ok(length),
            None => self.handle.length()
        }
    }

    /// Install a logical truncation of the stream.
    ///
    /// `new_length` must be strictly less than the physical resource
    /// length; the resource itself is not mutated, reads at or beyond
    /// the logical length simply report end of stream. Passing a
    /// negative value resets to the real length.
    pub fn set_length(&mut self, new_length: i64) -> Result<(), IoError> {
        if new_length < 0 {
            self.length_override = None;
            return Ok(());
        }
        let new_length = new_length as u64;
        let real = self.handle.length()?;
        if new_length >= real {
            return Err(IoError::SeekError(
                "logical length must be strictly less than the physical length"
            ));
        }
        self.length_override = Some(new_length);
        self.buffer_valid = 0;
        Ok(())
    }

    /// Move the file pointer to `pos`.
    ///
    /// Seeking past the current length is legal for streams opened for
    /// writing, where the next write extends the resource; on read-only
    /// streams a subsequent read there reports end of stream.
    pub fn seek(&mut self, pos: u64) -> Result<(), IoError> {
        if self.handle.is_closed() {
            return Err(IoError::Closed(self.handle.name()));
        }
        self.pointer = pos;
        Ok(())
    }

    /// Advance the file pointer by `n` bytes
    pub fn skip(&mut self, n: u64) -> Result<u64, IoError> {
        self.seek(self.pointer + n)?;
        Ok(self.pointer)
    }

    /// Move the file pointer back by `n` bytes, failing when that would
    /// land before the start of the stream
    pub fn rewind(&mut self, n: u64) -> Result<u64, IoError> {
        let target = self
            .pointer
            .checked_sub(n)
            .ok_or(IoError::SeekError("cannot seek before the start of the stream"))?;
        self.seek(target)?;
        Ok(self.pointer)
    }

    /// Report whether the file pointer is at or past the end of the
    /// stream.
    ///
    /// Unknown-length sources never report end of stream here, their
    /// end is only observable through a read returning no bytes.
    pub fn is_eof(&mut self) -> Result<bool, IoError> {
        Ok(self.pointer >= self.length()?)
    }

    /// Remember the current file pointer.
    ///
    /// [`reset`](Self::reset) returns to it as long as no more than
    /// `limit` bytes have been consumed since.
    pub fn mark(&mut self, limit: u64) {
        self.mark = Some(Mark { position: self.pointer, limit });
    }

    /// Return to the marked position
    pub fn reset(&mut self) -> Result<(), IoError> {
        match &self.mark {
            Some(mark) => {
                let consumed = self.pointer.saturating_sub(mark.position);
                if consumed > mark.limit {
                    return Err(IoError::ResetLimitExceeded(consumed, mark.limit));
                }
                self.pointer = mark.position;
                Ok(())
            }
            None => Err(IoError::SeekError("reset called without a mark"))
        }
    }

    /// Close the stream and the handle beneath it. Idempotent
    pub fn close(&mut self) -> Result<(), IoError> {
        self.buffer_valid = 0;
        self.handle.close()
    }

    /// Refill the buffered window starting at the current file pointer.
    ///
    /// Returns the number of bytes now available in the window, zero
    /// at end of stream.
    fn refill(&mut self) -> Result<usize, IoError> {
        let length = self.length()?;
        if self.pointer >= length {
            return Ok(0);
        }
        let want = (length - self.pointer).min(self.buffer_size as u64) as usize;
        self.handle.seek(self.pointer)?;
        self.buffer.resize(want, 0);

        let mut filled = 0;
        while filled < want {
            let read = self.handle.read(&mut self.buffer[filled..want])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        self.buffer_start = self.pointer;
        self.buffer_valid = filled;
        Ok(filled)
    }

    /// Read up to `buf.len()` bytes, returning how many were read.
    ///
    /// Returns zero at end of stream, short counts only there.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        let mut total = 0;
        while total < buf.len() {
            let window_end = self.buffer_start + self.buffer_valid as u64;
            if self.pointer >= self.buffer_start && self.pointer < window_end {
                let offset = (self.pointer - self.buffer_start) as usize;
                let count = (self.buffer_valid - offset).min(buf.len() - total);
                buf[total..total + count].copy_from_slice(&self.buffer[offset..offset + count]);
                total += count;
                self.pointer += count as u64;
                continue;
            }
            if self.refill()? == 0 {
                break;
            }
        }
        Ok(total)
    }

    /// Read exactly `buf.len()` bytes or fail.
    ///
    /// The file pointer is left where it was when the stream cannot
    /// provide enough bytes.
    pub fn read_exact_bytes(&mut self, buf: &mut [u8]) -> Result<(), IoError> {
        let start = self.pointer;
        let read = self.read_bytes(buf)?;
        if read < buf.len() {
            self.pointer = start;
            return Err(IoError::NotEnoughBytes(buf.len(), read));
        }
        Ok(())
    }

    #[inline(always)]
    fn read_const<const N: usize>(&mut self) -> Result<[u8; N], IoError> {
        let mut space = [0; N];
        self.read_exact_bytes(&mut space)?;
        Ok(space)
    }

    /// Read every byte from the current file pointer to the end of the
    /// stream
    pub fn read_remaining(&mut self) -> Result<Vec<u8>, IoError> {
        let mut out = Vec::new();
        let mut chunk = vec![0_u8; self.buffer_size];
        loop {
            let read = self.read_bytes(&mut chunk)?;
            if read == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read a single byte
    #[inline(always)]
    pub fn read_u8(&mut self) -> Result<u8, IoError> {
        let space: [u8; 1] = self.read_const()?;
        Ok(space[0])
    }

    /// Read a single signed byte
    #[inline(always)]
    pub fn read_i8(&mut self) -> Result<i8, IoError> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a 32 bit IEEE float honoring the stream byte order
    pub fn read_f32(&mut self) -> Result<f32, IoError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Read a 64 bit IEEE float honoring the stream byte order
    pub fn read_f64(&mut self) -> Result<f64, IoError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Write up to `buf.len()` bytes at the file pointer.
    ///
    /// The buffered window is invalidated and the bytes go straight to
    /// the handle. Writing at or past the end of the stream grows it to
    /// the post-write file pointer; the contents of any gap between the
    /// old length and the write offset are zeros.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        if !self.handle.is_writable() {
            return Err(IoError::NotWritable(self.handle.name()));
        }
        self.buffer_valid = 0;
        self.handle.seek(self.pointer)?;

        let mut written = 0;
        while written < buf.len() {
            let count = self.handle.write(&buf[written..])?;
            if count == 0 {
                return Err(IoError::Generic("backing store refused the write"));
            }
            written += count;
        }
        self.pointer += written as u64;
        Ok(written)
    }

    /// Write a single byte
    pub fn write_u8(&mut self, byte: u8) -> Result<(), IoError> {
        self.write_bytes(&[byte])?;
        Ok(())
    }

    /// Write a single signed byte
    pub fn write_i8(&mut self, byte: i8) -> Result<(), IoError> {
        self.write_u8(byte as u8)
    }

    /// Write a 32 bit IEEE float honoring the stream byte order
    pub fn write_f32(&mut self, value: f32) -> Result<(), IoError> {
        self.write_u32(value.to_bits())
    }

    /// Write a 64 bit IEEE float honoring the stream byte order
    pub fn write_f64(&mut self, value: f64) -> Result<(), IoError> {
        self.write_u64(value.to_bits())
    }

    /// Write each character of `text` as a two-byte big-endian unit,
    /// regardless of the stream byte order
    pub fn write_chars(&mut self, text: &str) -> Result<(), IoError> {
        for unit in text.encode_utf16() {
            self.write_bytes(&unit.to_be_bytes())?;
        }
        Ok(())
    }

    /// Read `n` bytes and decode them as text, replacing invalid
    /// sequences
    pub fn read_string(&mut self, n: usize) -> Result<String, IoError> {
        let mut buf = vec![0; n];
        self.read_exact_bytes(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Read a NUL terminated string, without the terminator
    pub fn read_cstring(&mut self) -> Result<String, IoError> {
        let text = self.find_string(true, &["\0"])?.unwrap_or_default();
        Ok(text.trim_end_matches('\0').to_string())
    }

    /// Read one line of text, without the line ending
    pub fn read_line(&mut self) -> Result<String, IoError> {
        let text = self.find_string(true, &["\n"])?.unwrap_or_default();
        Ok(text
            .trim_end_matches('\n')
            .trim_end_matches('\r')
            .to_string())
    }

    /// Scan forward for the first occurrence of any terminator,
    /// using the default block size.
    ///
    /// See [`find_string_block`](Self::find_string_block).
    pub fn find_string(
        &mut self, save: bool, terminators: &[&str]
    ) -> Result<Option<String>, IoError> {
        self.find_string_block(save, DEFAULT_SEARCH_BLOCK, terminators)
    }

    /// Scan forward in `block_size` chunks for the first occurrence of
    /// any of `terminators`, leaving the file pointer just past the
    /// terminating sequence.
    ///
    /// When `save` is true the scanned text, through the end of the
    /// terminating sequence, is collected and returned; otherwise the
    /// text is discarded and `None` is returned. Reaching the end of
    /// the stream without a terminator returns what was scanned.
    ///
    /// Fails with [`IoError::SearchExhausted`] once [`MAX_SEARCH_SIZE`]
    /// bytes have been scanned without a match.
    pub fn find_string_block(
        &mut self, save: bool, block_size: usize, terminators: &[&str]
    ) -> Result<Option<String>, IoError> {
        let max_term = terminators.iter().map(|t| t.len()).max().unwrap_or(0);
        if max_term == 0 {
            return Err(IoError::Generic("no terminators provided"));
        }
        let start = self.pointer;
        let mut saved: Vec<u8> = Vec::new();
        // unmatched suffix of the previous chunk, so terminators
        // spanning a chunk boundary are still found
        let mut tail: Vec<u8> = Vec::new();
        let mut chunk = vec![0_u8; block_size.max(max_term)];

        loop {
            let chunk_pos = self.pointer;
            let read = self.read_bytes(&mut chunk)?;
            if read == 0 {
                return Ok(if save {
                    Some(String::from_utf8_lossy(&saved).into_owned())
                } else {
                    None
                });
            }

            let mut combined = Vec::with_capacity(tail.len() + read);
            combined.extend_from_slice(&tail);
            combined.extend_from_slice(&chunk[..read]);

            if let Some((index, term_len)) = find_terminator(&combined, terminators) {
                let end = chunk_pos - tail.len() as u64 + (index + term_len) as u64;
                self.pointer = end;
                if save {
                    saved.extend_from_slice(&chunk[..read]);
                    saved.truncate((end - start) as usize);
                    return Ok(Some(String::from_utf8_lossy(&saved).into_owned()));
                }
                return Ok(None);
            }

            if save {
                saved.extend_from_slice(&chunk[..read]);
            }
            if self.pointer - start >= MAX_SEARCH_SIZE {
                return Err(IoError::SearchExhausted(MAX_SEARCH_SIZE));
            }
            let keep = max_term.saturating_sub(1).min(combined.len());
            tail.clear();
            tail.extend_from_slice(&combined[combined.len() - keep..]);
        }
    }
}

/// Find the earliest terminator occurrence in `data`.
///
/// Position beats listing order; at equal positions the first listed
/// terminator wins.
fn find_terminator(data: &[u8], terminators: &[&str]) -> Option<(usize, usize)> {
    for position in 0..data.len() {
        for terminator in terminators {
            if data[position..].starts_with(terminator.as_bytes()) {
                return Some((position, terminator.len()));
            }
        }
    }
    None
}

macro_rules! read_int_type {
    ($name:tt, $int_type:tt) => {
        impl BufferedStream {
            #[doc = concat!("Read a ", stringify!($int_type), " honoring the stream byte order")]
            #[inline]
            pub fn $name(&mut self) -> Result<$int_type, IoError> {
                const SIZE_OF_VAL: usize = core::mem::size_of::<$int_type>();

                let space: [u8; SIZE_OF_VAL] = self.read_const()?;

                Ok(match self.order {
                    ByteOrder::BigEndian => $int_type::from_be_bytes(space),
                    ByteOrder::LittleEndian => $int_type::from_le_bytes(space)
                })
            }
        }
    };
}

read_int_type!(read_u16, u16);
read_int_type!(read_i16, i16);
read_int_type!(read_u32, u32);
read_int_type!(read_i32, i32);
read_int_type!(read_u64, u64);
read_int_type!(read_i64, i64);

macro_rules! write_int_type {
    ($name:tt, $int_type:tt) => {
        impl BufferedStream {
            #[doc = concat!("Write a ", stringify!($int_type), " honoring the stream byte order")]
            #[inline]
            pub fn $name(&mut self, value: $int_type) -> Result<(), IoError> {
                let bytes = match self.order {
                    ByteOrder::BigEndian => value.to_be_bytes(),
                    ByteOrder::LittleEndian => value.to_le_bytes()
                };
                self.write_bytes(&bytes)?;
                Ok(())
            }
        }
    };
}

write_int_type!(write_u16, u16);
write_int_type!(write_i16, i16);
write_int_type!(write_u32, u32);
write_int_type!(write_i32, i32);
write_int_type!(write_u64, u64);
write_int_type!(write_i64, i64);
