/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! The explicit context threaded through every operation
//!
//! A [`Context`] owns the format registry and the table mapping
//! resource ids to backings that are not plain files: bytes placed
//! there by callers, and archive entries placed there by container
//! formats during unwrapping. Passing the context explicitly, instead
//! of consulting process-global state, lets several independent
//! registries and mapping tables coexist in one process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::trace;
use planar_core::bytestream::{
    BufferedStream, FileHandle, GzipHandle, Handle, IoError, MemoryHandle
};
use planar_core::options::ReadOptions;

use crate::errors::ImageErrors;
use crate::formats::{suffix_matches, Format, FormatRegistry};
use crate::metadata::ImageMetadata;
use crate::traits::{ImageReader, ImageWriter};

/// Hard cap on container-in-container nesting, guarding against
/// self-referential or malicious inputs
pub const MAX_CONTAINER_DEPTH: u8 = 8;

enum Backing {
    /// Plain bytes mapped by a caller
    Bytes(Arc<Vec<u8>>),
    /// The single entry of a gzip archive, stored compressed; every
    /// open gets its own decompression cursor
    GzipEntry(Arc<Vec<u8>>)
}

struct Mapping {
    backing: Backing,
    /// How many container layers were unwrapped to produce this
    /// resource
    depth:   u8
}

/// An explicit operation context: the format registry plus the
/// id-to-backing mapping table
pub struct Context {
    registry: FormatRegistry,
    mappings: Mutex<HashMap<String, Mapping>>
}

impl Context {
    pub fn new(registry: FormatRegistry) -> Context {
        Context { registry, mappings: Mutex::new(HashMap::new()) }
    }

    /// A context over every format the library ships
    pub fn with_default_formats() -> Context {
        Context::new(FormatRegistry::with_default_formats())
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    fn mappings(&self) -> MutexGuard<'_, HashMap<String, Mapping>> {
        match self.mappings.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner()
        }
    }

    /// Map `id` to in-memory bytes, shadowing any file of the same name
    pub fn map_bytes(&self, id: &str, bytes: Vec<u8>) {
        self.mappings().insert(
            id.to_string(),
            Mapping { backing: Backing::Bytes(Arc::new(bytes)), depth: 0 }
        );
    }

    /// Map `id` to the entry of a gzip archive given the archive's
    /// compressed bytes
    pub(crate) fn map_gzip_entry(&self, id: &str, compressed: Arc<Vec<u8>>, depth: u8) {
        self.mappings().insert(
            id.to_string(),
            Mapping { backing: Backing::GzipEntry(compressed), depth }
        );
    }

    /// Remove a mapping installed earlier
    pub fn unmap(&self, id: &str) {
        self.mappings().remove(id);
    }

    pub fn is_mapped(&self, id: &str) -> bool {
        self.mappings().contains_key(id)
    }

    /// How many container layers are between `id` and the resource the
    /// caller originally named
    pub(crate) fn resource_depth(&self, id: &str) -> u8 {
        self.mappings().get(id).map(|m| m.depth).unwrap_or(0)
    }

    /// Resolve `id` to a fresh handle.
    ///
    /// Mapped ids resolve to their mapped backing, everything else is
    /// treated as a local file path by the location layer above us.
    pub fn open_handle(&self, id: &str) -> Result<Box<dyn Handle>, IoError> {
        let mappings = self.mappings();
        match mappings.get(id) {
            Some(mapping) => match &mapping.backing {
                Backing::Bytes(bytes) => Ok(Box::new(MemoryHandle::from_shared(bytes.clone()))),
                Backing::GzipEntry(compressed) => {
                    Ok(Box::new(GzipHandle::new(compressed.clone())?))
                }
            },
            None => Ok(Box::new(FileHandle::open(id)?))
        }
    }

    /// Resolve `id` and wrap the handle in a buffered stream
    pub fn open_stream(&self, id: &str, options: &ReadOptions) -> Result<BufferedStream, IoError> {
        Ok(BufferedStream::with_buffer_size(
            self.open_handle(id)?,
            options.buffer_size()
        ))
    }

    /// Resolve `id` to exactly one registered format.
    ///
    /// Formats are tried in registry priority order; the first whose
    /// byte checker accepts the content, or whose suffix list matches
    /// the id, wins. Container formats additionally unwrap their
    /// content and require the wrapped resource to identify, so the
    /// composite identity is transparent to callers. Identical bytes
    /// always resolve to the same format.
    pub fn identify(&self, id: &str) -> Result<&'static Format, ImageErrors> {
        let mut stream = self.open_stream(id, &ReadOptions::default())?;
        let result = self.identify_with(&mut stream, id);
        let closed = stream.close();
        let format = result?;
        closed?;
        Ok(format)
    }

    fn identify_with(
        &self, stream: &mut BufferedStream, id: &str
    ) -> Result<&'static Format, ImageErrors> {
        for format in self.registry.formats() {
            stream.seek(0)?;
            let matched = (format.checker)(stream)? || suffix_matches(id, format.suffixes);
            if !matched {
                continue;
            }
            trace!("identified {id} as {}", format.name);
            if let Some(unwrap) = format.unwrap {
                let inner_id = unwrap(self, id, &ReadOptions::default())?;
                self.identify(&inner_id)?;
            }
            return Ok(format);
        }
        Err(ImageErrors::UnidentifiedFormat(id.to_string()))
    }

    /// Identify `id` and parse its metadata
    pub fn parse(&self, id: &str, options: &ReadOptions) -> Result<ImageMetadata, ImageErrors> {
        let format = self.identify(id)?;
        let mut parser = (format.parser)();
        parser.parse(self, id, options)
    }

    /// Identify `id` and open a reader over it
    pub fn open_reader(
        &self, id: &str, options: &ReadOptions
    ) -> Result<Box<dyn ImageReader>, ImageErrors> {
        let format = self.identify(id)?;
        (format.reader)(self, id, options)
    }

    /// Open a writer for `id`, choosing the format by suffix
    pub fn open_writer(
        &self, id: &str, metadata: ImageMetadata
    ) -> Result<Box<dyn ImageWriter>, ImageErrors> {
        let format = self
            .registry
            .format_for_id(id)
            .ok_or_else(|| ImageErrors::UnidentifiedFormat(id.to_string()))?;
        let writer = format
            .writer
            .ok_or(ImageErrors::NoWriterForFormat(format.name))?;
        writer(self, id, metadata)
    }
}
