/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Options controlling parsing and plane materialization
//!
//! Options are plain values handed to every parse or open call,
//! they are never stored as parser state and hence never leak
//! from one resource to the next.

use crate::bytestream::DEFAULT_BUFFER_SIZE;

/// Options respected by format parsers and readers.
///
/// Not all options are respected by all formats, e.g a format
/// without float samples ignores [`normalize_floats`](Self::normalize_floats).
#[derive(Debug, Copy, Clone)]
pub struct ReadOptions {
    /// Whether parsers should retain the raw key/value table
    /// found in the container alongside the derived axis model.
    ///
    /// - Default value: true
    populate_original_metadata: bool,
    /// Whether the raw key/value table should be run through the
    /// metadata filtering policy, dropping noisy entries.
    ///
    /// - Default value: false
    filter_metadata:            bool,
    /// Whether readers should canonicalize non-standard float
    /// encodings when materializing a plane.
    ///
    /// This is explicit configuration, it is never inferred from
    /// the data itself.
    ///
    /// - Default value: false
    normalize_floats:           bool,
    /// Size of the buffered window used by streams opened for this
    /// operation. A throughput tunable, not a correctness parameter.
    ///
    /// - Default value: 128 KiB
    buffer_size:                usize
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            populate_original_metadata: true,
            filter_metadata:            false,
            normalize_floats:           false,
            buffer_size:                DEFAULT_BUFFER_SIZE
        }
    }
}

impl ReadOptions {
    /// Return true if parsers should retain the raw key/value table
    pub const fn populate_original_metadata(&self) -> bool {
        self.populate_original_metadata
    }

    /// Return true if the metadata filtering policy should be applied
    pub const fn filter_metadata(&self) -> bool {
        self.filter_metadata
    }

    /// Return true if float planes should be canonicalized on read
    pub const fn normalize_floats(&self) -> bool {
        self.normalize_floats
    }

    /// Get the configured buffered-window size
    pub const fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Set whether parsers retain the raw key/value table
    pub fn set_populate_original_metadata(mut self, yes: bool) -> Self {
        self.populate_original_metadata = yes;
        self
    }

    /// Set whether the metadata filtering policy is applied
    pub fn set_filter_metadata(mut self, yes: bool) -> Self {
        self.filter_metadata = yes;
        self
    }

    /// Set whether float planes are canonicalized on read
    pub fn set_normalize_floats(mut self, yes: bool) -> Self {
        self.normalize_floats = yes;
        self
    }

    /// Set the buffered-window size used by streams opened for this
    /// operation
    pub fn set_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }
}
