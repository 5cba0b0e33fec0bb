/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Traits implemented by every format's parser, reader and writer

use planar_core::bytestream::BufferedStream;
use planar_core::options::ReadOptions;

use crate::context::Context;
use crate::errors::ImageErrors;
use crate::formats::Format;
use crate::metadata::{ColorTable, ImageMetadata};
use crate::plane::{Plane, Region};

/// Per-format logic turning a resource into structured image metadata.
///
/// Parsing is a two-phase template: [`parse`](Self::parse) opens the
/// stream, verifies the format's checker and fails fast with a format
/// error when the signature is absent, then hands the stream to
/// [`typed_parse`](Self::typed_parse) for the format-specific work.
/// Options are pass-through values, never parser state that leaks
/// across calls.
pub trait ImageParser {
    /// The format this parser belongs to
    fn format(&self) -> &'static Format;

    /// Parse the resource behind `id` into metadata
    fn parse(
        &mut self, ctx: &Context, id: &str, options: &ReadOptions
    ) -> Result<ImageMetadata, ImageErrors> {
        let format = self.format();
        let mut stream = ctx.open_stream(id, options)?;

        let matched = match (format.checker)(&mut stream) {
            Ok(matched) => matched,
            Err(error) => {
                let _ = stream.close();
                return Err(ImageErrors::IoErrors(error));
            }
        };
        if !matched {
            let _ = stream.close();
            return Err(ImageErrors::FormatErrorsOwned(format!(
                "{id} does not carry the {} signature",
                format.name
            )));
        }
        if let Err(error) = stream.seek(0) {
            let _ = stream.close();
            return Err(ImageErrors::IoErrors(error));
        }

        let result = self.typed_parse(ctx, id, &mut stream, options);
        let closed = stream.close();
        let metadata = result?;
        closed?;
        Ok(metadata)
    }

    /// Format-specific parsing, called with a verified stream
    /// positioned at the start of the resource
    fn typed_parse(
        &mut self, ctx: &Context, id: &str, stream: &mut BufferedStream, options: &ReadOptions
    ) -> Result<ImageMetadata, ImageErrors>;
}

/// Per-format logic materializing pixel planes.
///
/// A reader parses its resource once when opened and can then serve any
/// number of planes without re-parsing. Closing is idempotent; a
/// composite reader over unwrapped container content cascades the close
/// to the nested reader.
pub trait ImageReader {
    /// Number of image series in the resource
    fn series_count(&self) -> usize {
        1
    }

    /// Metadata of one series
    fn metadata(&self, series: usize) -> Result<&ImageMetadata, ImageErrors>;

    /// Switch float canonicalization on or off.
    ///
    /// Explicit configuration; never inferred from the data.
    fn set_normalized(&mut self, normalized: bool);

    /// Whether float canonicalization is on
    fn is_normalized(&self) -> bool;

    /// Materialize a region of one plane into fresh bytes.
    ///
    /// Out-of-range indices or regions fail with a bounds error, never
    /// silently clamp.
    fn open_plane(
        &mut self, series: usize, plane: usize, region: Region
    ) -> Result<Plane, ImageErrors>;

    /// Materialize one whole plane
    fn open_full_plane(&mut self, series: usize, plane: usize) -> Result<Plane, ImageErrors> {
        let region = self.metadata(series)?.full_region();
        self.open_plane(series, plane, region)
    }

    /// The lookup table of one plane, when the format carries indexed
    /// color
    fn color_table(&self, series: usize, plane: usize) -> Option<&ColorTable> {
        let _ = (series, plane);
        None
    }

    /// Release the reader and its stream. Idempotent
    fn close(&mut self) -> Result<(), ImageErrors>;
}

/// Per-format logic persisting pixel planes, mirroring
/// [`ImageReader`]'s contract and preserving the declared dimension
/// order
pub trait ImageWriter {
    /// Persist a region of one plane from `bytes`
    fn save_plane(
        &mut self, series: usize, plane: usize, region: Region, bytes: &[u8]
    ) -> Result<(), ImageErrors>;

    /// Flush and release the writer. Idempotent
    fn close(&mut self) -> Result<(), ImageErrors>;
}
