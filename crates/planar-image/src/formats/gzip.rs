/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! The gzip container format
//!
//! A container, not a pixel format: the single member of the archive is
//! mapped into the context and identification re-runs against it, so
//! the composite identity is transparent. Opening `stack.mha.gz` and
//! opening the decompressed `stack.mha` directly are observably
//! equivalent once past the unwrap. Parser and reader both delegate to
//! the wrapped format; closing the composite reader cascades to the
//! nested one.

use std::sync::Arc;

use log::trace;
use planar_core::bytestream::{BufferedStream, GzipHandle, IoError};
use planar_core::options::ReadOptions;

use crate::context::{Context, MAX_CONTAINER_DEPTH};
use crate::errors::ImageErrors;
use crate::formats::Format;
use crate::metadata::{ColorTable, ImageMetadata};
use crate::plane::{Plane, Region};
use crate::traits::{ImageParser, ImageReader};

pub static GZIP: Format = Format {
    name:     "gzip",
    suffixes: &["gz"],
    checker:  check_gzip,
    parser:   create_parser,
    reader:   open_reader,
    writer:   None,
    unwrap:   Some(unwrap_entry)
};

fn check_gzip(stream: &mut BufferedStream) -> Result<bool, IoError> {
    let mut magic = [0_u8; 2];
    let read = stream.read_bytes(&mut magic)?;
    Ok(read == 2 && magic == [0x1f, 0x8b])
}

/// Map the archive's entry into the context and return its id.
///
/// The entry id is the name recorded in the member header when there
/// is one, otherwise the archive id with its `.gz` suffix stripped.
fn unwrap_entry(ctx: &Context, id: &str, options: &ReadOptions) -> Result<String, ImageErrors> {
    let depth = ctx.resource_depth(id);
    if depth + 1 > MAX_CONTAINER_DEPTH {
        return Err(ImageErrors::ContainerDepthExceeded(depth + 1));
    }

    let mut stream = ctx.open_stream(id, options)?;
    let read = stream.read_remaining();
    let closed = stream.close();
    let compressed = Arc::new(read?);
    closed?;

    let handle = GzipHandle::new(compressed.clone())?;
    let entry_id = match handle.entry_name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => id
            .strip_suffix(".gz")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{id}.entry"))
    };
    trace!("gzip: mapping entry {entry_id} of {id} at depth {}", depth + 1);
    ctx.map_gzip_entry(&entry_id, compressed, depth + 1);
    Ok(entry_id)
}

fn create_parser() -> Box<dyn ImageParser> {
    Box::new(GzipParser)
}

struct GzipParser;

impl ImageParser for GzipParser {
    fn format(&self) -> &'static Format {
        &GZIP
    }

    fn typed_parse(
        &mut self, ctx: &Context, id: &str, _stream: &mut BufferedStream, options: &ReadOptions
    ) -> Result<ImageMetadata, ImageErrors> {
        let entry_id = unwrap_entry(ctx, id, options)?;
        let entry_format = ctx.identify(&entry_id)?;

        let mut parser = (entry_format.parser)();
        let mut metadata = parser.parse(ctx, &entry_id, options)?;
        metadata.record_entry(options, "Entry", &entry_id);
        Ok(metadata)
    }
}

fn open_reader(
    ctx: &Context, id: &str, options: &ReadOptions
) -> Result<Box<dyn ImageReader>, ImageErrors> {
    let entry_id = unwrap_entry(ctx, id, options)?;
    let entry_format = ctx.identify(&entry_id)?;
    let entry_reader = (entry_format.reader)(ctx, &entry_id, options)?;

    Ok(Box::new(GzipReader { entry: entry_reader, closed: false }))
}

/// Composite reader delegating plane access to the wrapped format
struct GzipReader {
    entry:  Box<dyn ImageReader>,
    closed: bool
}

impl ImageReader for GzipReader {
    fn series_count(&self) -> usize {
        self.entry.series_count()
    }

    fn metadata(&self, series: usize) -> Result<&ImageMetadata, ImageErrors> {
        self.entry.metadata(series)
    }

    fn set_normalized(&mut self, normalized: bool) {
        self.entry.set_normalized(normalized);
    }

    fn is_normalized(&self) -> bool {
        self.entry.is_normalized()
    }

    fn open_plane(
        &mut self, series: usize, plane: usize, region: Region
    ) -> Result<Plane, ImageErrors> {
        if self.closed {
            return Err(ImageErrors::IoErrors(IoError::Closed("GzipReader")));
        }
        self.entry.open_plane(series, plane, region)
    }

    fn color_table(&self, series: usize, plane: usize) -> Option<&ColorTable> {
        self.entry.color_table(series, plane)
    }

    fn close(&mut self) -> Result<(), ImageErrors> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.entry.close()
    }
}
