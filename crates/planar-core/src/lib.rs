/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Core I/O routines shared by the planar family of crates
//!
//! This crate provides the byte-addressable backing-store abstraction and the
//! buffered random-access stream that every format parser, reader and writer
//! in the planar crates is built on.
//!
//! It currently contains
//!
//! - A [`Handle`](crate::bytestream::Handle) trait abstracting over local
//!   files, growable in-memory buffers, archive entries and forward-only
//!   streams
//! - A byte-order aware [`BufferedStream`](crate::bytestream::BufferedStream)
//!   with endian aware reads and writes, mark/reset, logical truncation and
//!   bounded terminator search
//! - Pixel element type and byte order information shared by images
//! - Options controlling parsing and plane materialization
//!
//! # Features
//!  - `serde`: Enables serializing of some of the data structures
//!    present in the crate

pub mod bytestream;
pub mod options;
pub mod pixel;
mod serde;
