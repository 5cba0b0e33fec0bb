/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Plane-addressable scientific image I/O
//!
//! This crate turns heterogeneous binary container formats into one
//! uniform pixel API: a resource id goes through format identification,
//! metadata parsing and plane materialization, and comes out as typed
//! pixel arrays regardless of the on-disk layout.
//!
//! The pipeline is
//! [`Handle`](planar_core::bytestream::Handle) →
//! [`BufferedStream`](planar_core::bytestream::BufferedStream) →
//! [`Context::identify`](crate::context::Context::identify) →
//! [`ImageParser::parse`](crate::traits::ImageParser::parse) →
//! [`ImageReader::open_plane`](crate::traits::ImageReader::open_plane) →
//! [`decode_plane`](crate::decode::decode_plane).
//!
//! Everything is driven by an explicit [`Context`](crate::context::Context)
//! holding the format registry and the id-to-bytes mappings, so several
//! independent registries can coexist in one process.

pub mod context;
pub mod decode;
pub mod errors;
pub mod formats;
pub mod metadata;
pub mod plane;
pub mod terms;
pub mod traits;
