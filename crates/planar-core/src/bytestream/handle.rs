/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Handle implementations for local files, memory buffers and
//! forward-only streams

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use crate::bytestream::IoError;

/// A byte-addressable backing resource.
///
/// A handle is exclusively owned by exactly one
/// [`BufferedStream`](crate::bytestream::BufferedStream) at a time, which
/// closes it when the stream is closed. Handles keep a current position;
/// reads and writes start there and advance it.
///
/// Once [`close`](Self::close) has been called every subsequent operation
/// must fail with [`IoError::Closed`] rather than return stale data.
/// Closing twice is a no-op.
pub trait Handle {
    /// Name of the handle implementation, used in error reports
    fn name(&self) -> &'static str;

    /// Current length of the resource in bytes.
    ///
    /// Forward-only streams of unknown length report [`u64::MAX`];
    /// their true end is only discovered when a read returns zero bytes.
    fn length(&mut self) -> Result<u64, IoError>;

    /// Move the current position to `pos`.
    ///
    /// Seeking past the current length is legal; whether a subsequent
    /// read or write succeeds there is up to the implementation.
    fn seek(&mut self, pos: u64) -> Result<(), IoError>;

    /// Read up to `buf.len()` bytes at the current position, returning
    /// how many bytes were read. Zero means end of resource.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError>;

    /// Write up to `buf.len()` bytes at the current position, returning
    /// how many bytes were written
    fn write(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        let _ = buf;
        Err(IoError::NotWritable(self.name()))
    }

    /// Ensure written bytes have reached the backing store
    fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    /// Release the resource. Idempotent
    fn close(&mut self) -> Result<(), IoError>;

    /// Whether this handle accepts writes
    fn is_writable(&self) -> bool {
        false
    }

    /// Whether [`close`](Self::close) has been called
    fn is_closed(&self) -> bool;
}

/// Handle over a local file with direct random access
pub struct FileHandle {
    file:     Option<File>,
    writable: bool
}

impl FileHandle {
    /// Open an existing file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<FileHandle, IoError> {
        let file = File::open(path)?;
        Ok(FileHandle { file: Some(file), writable: false })
    }

    /// Create a file for reading and writing, truncating any
    /// previous contents
    pub fn create<P: AsRef<Path>>(path: P) -> Result<FileHandle, IoError> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(FileHandle { file: Some(file), writable: true })
    }

    fn file(&mut self) -> Result<&mut File, IoError> {
        self.file.as_mut().ok_or(IoError::Closed("FileHandle"))
    }
}

impl Handle for FileHandle {
    fn name(&self) -> &'static str {
        "FileHandle"
    }

    fn length(&mut self) -> Result<u64, IoError> {
        Ok(self.file()?.metadata()?.len())
    }

    fn seek(&mut self, pos: u64) -> Result<(), IoError> {
        self.file()?.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        Ok(self.file()?.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        if !self.writable {
            return Err(IoError::NotWritable(self.name()));
        }
        Ok(self.file()?.write(buf)?)
    }

    fn flush(&mut self) -> Result<(), IoError> {
        Ok(self.file()?.flush()?)
    }

    fn close(&mut self) -> Result<(), IoError> {
        // dropping the file closes it
        self.file = None;
        Ok(())
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}

enum MemoryBacking {
    Owned(Vec<u8>),
    Shared(Arc<Vec<u8>>)
}

impl MemoryBacking {
    fn bytes(&self) -> &[u8] {
        match self {
            MemoryBacking::Owned(v) => v,
            MemoryBacking::Shared(v) => v
        }
    }
}

/// Handle over an in-memory byte buffer.
///
/// Owned buffers are growable, writes beyond the current length extend
/// the buffer, zero-filling any gap between the old length and the write
/// offset. Shared buffers are read-only views used for resources mapped
/// into a context, several handles may share one buffer.
pub struct MemoryHandle {
    data:     MemoryBacking,
    position: u64,
    closed:   bool
}

impl MemoryHandle {
    /// Create an empty growable buffer
    pub fn new() -> MemoryHandle {
        MemoryHandle::from_vec(Vec::new())
    }

    /// Create a growable buffer seeded with `data`
    pub fn from_vec(data: Vec<u8>) -> MemoryHandle {
        MemoryHandle {
            data:     MemoryBacking::Owned(data),
            position: 0,
            closed:   false
        }
    }

    /// Create a read-only handle over shared bytes
    pub fn from_shared(data: Arc<Vec<u8>>) -> MemoryHandle {
        MemoryHandle {
            data:     MemoryBacking::Shared(data),
            position: 0,
            closed:   false
        }
    }

    /// Consume the handle returning the underlying bytes.
    ///
    /// Shared backings return a clone of the shared buffer.
    pub fn into_vec(self) -> Vec<u8> {
        match self.data {
            MemoryBacking::Owned(v) => v,
            MemoryBacking::Shared(v) => v.as_ref().clone()
        }
    }

    fn check_open(&self) -> Result<(), IoError> {
        if self.closed {
            return Err(IoError::Closed("MemoryHandle"));
        }
        Ok(())
    }
}

impl Default for MemoryHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Handle for MemoryHandle {
    fn name(&self) -> &'static str {
        "MemoryHandle"
    }

    fn length(&mut self) -> Result<u64, IoError> {
        self.check_open()?;
        Ok(self.data.bytes().len() as u64)
    }

    fn seek(&mut self, pos: u64) -> Result<(), IoError> {
        self.check_open()?;
        self.position = pos;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        self.check_open()?;
        let bytes = self.data.bytes();
        let start = usize::try_from(self.position)?.min(bytes.len());
        let count = (bytes.len() - start).min(buf.len());
        buf[..count].copy_from_slice(&bytes[start..start + count]);
        self.position += count as u64;
        Ok(count)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        self.check_open()?;
        let data = match &mut self.data {
            MemoryBacking::Owned(v) => v,
            MemoryBacking::Shared(_) => return Err(IoError::NotWritable("MemoryHandle"))
        };
        let start = usize::try_from(self.position)?;
        let end = start
            .checked_add(buf.len())
            .ok_or(IoError::Generic("write would overflow the address space"))?;
        if end > data.len() {
            // any gap between the old length and the write offset
            // becomes zeros
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        self.position = end as u64;
        Ok(buf.len())
    }

    fn close(&mut self) -> Result<(), IoError> {
        self.closed = true;
        Ok(())
    }

    fn is_writable(&self) -> bool {
        matches!(self.data, MemoryBacking::Owned(_))
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Handle over a forward-only byte source, e.g a socket or a pipe.
///
/// The length of the source is unknown up front and is reported as
/// [`u64::MAX`]; seeking forward skips by reading and discarding,
/// seeking backward fails with a seek error since the source cannot be
/// rewound. Read failures propagate as I/O errors, they are never
/// converted into silent truncation.
pub struct StreamHandle<R> {
    source:   Option<R>,
    position: u64
}

impl<R: Read> StreamHandle<R> {
    /// Wrap a forward-only source
    pub fn new(source: R) -> StreamHandle<R> {
        StreamHandle { source: Some(source), position: 0 }
    }

    fn skip_forward(&mut self, mut remaining: u64) -> Result<(), IoError> {
        let source = self
            .source
            .as_mut()
            .ok_or(IoError::Closed("StreamHandle"))?;
        let mut scratch = [0_u8; 8192];
        while remaining > 0 {
            let want = (scratch.len() as u64).min(remaining) as usize;
            let read = source.read(&mut scratch[..want])?;
            if read == 0 {
                // end of source, later reads report EOF
                break;
            }
            remaining -= read as u64;
        }
        Ok(())
    }
}

impl<R: Read> Handle for StreamHandle<R> {
    fn name(&self) -> &'static str {
        "StreamHandle"
    }

    fn length(&mut self) -> Result<u64, IoError> {
        if self.source.is_none() {
            return Err(IoError::Closed("StreamHandle"));
        }
        Ok(u64::MAX)
    }

    fn seek(&mut self, pos: u64) -> Result<(), IoError> {
        if self.source.is_none() {
            return Err(IoError::Closed("StreamHandle"));
        }
        if pos < self.position {
            return Err(IoError::SeekError(
                "cannot seek backwards on a forward-only stream"
            ));
        }
        let skip = pos - self.position;
        self.skip_forward(skip)?;
        self.position = pos;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        let source = self
            .source
            .as_mut()
            .ok_or(IoError::Closed("StreamHandle"))?;
        let read = source.read(buf)?;
        self.position += read as u64;
        Ok(read)
    }

    fn close(&mut self) -> Result<(), IoError> {
        self.source = None;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.source.is_none()
    }
}
