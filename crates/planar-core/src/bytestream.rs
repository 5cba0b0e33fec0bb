/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Byte-addressable handles and the buffered random-access stream
//!
//! A [`Handle`] is a byte-addressable backing resource, a local file, a
//! growable in-memory buffer, an archive entry or a forward-only stream.
//! Handles know nothing about image formats.
//!
//! A [`BufferedStream`] owns exactly one handle and layers a buffered
//! window, a byte-order flag, mark/reset and logical truncation on top of
//! it. All parsing and decoding in the planar crates goes through a
//! `BufferedStream`; the window refill is the only place backing-store
//! I/O happens.

use std::fmt::Formatter;

mod gzip;
mod handle;
mod stream;

pub use gzip::GzipHandle;
pub use handle::{FileHandle, Handle, MemoryHandle, StreamHandle};
pub use stream::{BufferedStream, DEFAULT_BUFFER_SIZE, DEFAULT_SEARCH_BLOCK, MAX_SEARCH_SIZE};

/// Errors that can occur when talking to a backing resource
pub enum IoError {
    /// An error bubbled up from the operating system
    StdIoError(std::io::Error),
    /// An offset did not fit the addressable range
    TryFromIntError(std::num::TryFromIntError),
    // requested, read
    NotEnoughBytes(usize, usize),
    /// A seek request the backing resource cannot honor
    SeekError(&'static str),
    /// The resource was closed and can no longer be used.
    ///
    /// Carries the name of the handle implementation
    Closed(&'static str),
    /// A write was attempted on a read-only resource
    NotWritable(&'static str),
    // consumed, limit
    ResetLimitExceeded(u64, u64),
    /// A terminator search consumed the hard search cap without a match
    SearchExhausted(u64),
    Generic(&'static str),
    GenericOwned(String)
}

impl std::fmt::Debug for IoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::StdIoError(err) => {
                writeln!(f, "Underlying I/O error {}", err)
            }
            IoError::TryFromIntError(err) => {
                writeln!(f, "Cannot convert to int {}", err)
            }
            IoError::NotEnoughBytes(expected, found) => {
                writeln!(f, "Not enough bytes, expected {expected} but found {found}")
            }
            IoError::SeekError(err) => {
                writeln!(f, "Seek error: {err}")
            }
            IoError::Closed(name) => {
                writeln!(f, "Resource {name} is closed")
            }
            IoError::NotWritable(name) => {
                writeln!(f, "Resource {name} is not writable")
            }
            IoError::ResetLimitExceeded(consumed, limit) => {
                writeln!(
                    f,
                    "Cannot reset, {consumed} bytes consumed since mark but the read limit is {limit}"
                )
            }
            IoError::SearchExhausted(cap) => {
                writeln!(f, "No terminator found within the {cap} byte search cap")
            }
            IoError::Generic(err) => {
                writeln!(f, "Generic I/O error: {err}")
            }
            IoError::GenericOwned(err) => {
                writeln!(f, "Generic I/O error: {err}")
            }
        }
    }
}

impl From<std::io::Error> for IoError {
    fn from(value: std::io::Error) -> Self {
        IoError::StdIoError(value)
    }
}

impl From<std::num::TryFromIntError> for IoError {
    fn from(value: std::num::TryFromIntError) -> Self {
        IoError::TryFromIntError(value)
    }
}

impl From<&'static str> for IoError {
    fn from(value: &'static str) -> Self {
        IoError::Generic(value)
    }
}
