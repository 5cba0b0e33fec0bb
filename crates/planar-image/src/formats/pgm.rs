/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! The portable graymap format (`.pgm`)
//!
//! Single-plane grayscale with a whitespace-separated text header:
//! magic, width, height, maxval, then samples. Raw `P5` data is one or
//! two bytes per sample, big endian; the ASCII `P2` variant is parsed
//! for metadata but its planes are not materialized.

use log::trace;
use planar_core::bytestream::{BufferedStream, FileHandle, IoError};
use planar_core::options::ReadOptions;
use planar_core::pixel::{ByteOrder, PixelType};

use crate::context::Context;
use crate::errors::ImageErrors;
use crate::formats::Format;
use crate::metadata::{Axis, AxisType, ImageMetadata};
use crate::plane::{Plane, Region};
use crate::traits::{ImageParser, ImageReader, ImageWriter};

pub static PGM: Format = Format {
    name:     "Portable graymap",
    suffixes: &["pgm", "pnm"],
    checker:  check_pgm,
    parser:   create_parser,
    reader:   open_reader,
    writer:   Some(create_writer),
    unwrap:   None
};

fn check_pgm(stream: &mut BufferedStream) -> Result<bool, IoError> {
    let mut magic = [0_u8; 2];
    let read = stream.read_bytes(&mut magic)?;
    Ok(read == 2 && (magic == *b"P5" || magic == *b"P2"))
}

/// Read the next whitespace-delimited header token, skipping `#`
/// comments, consuming the single whitespace byte that ends it
fn next_token(stream: &mut BufferedStream) -> Result<String, ImageErrors> {
    let mut token = String::new();
    let mut in_comment = false;

    loop {
        if stream.is_eof()? {
            if token.is_empty() {
                return Err(ImageErrors::FormatErrors("truncated graymap header"));
            }
            return Ok(token);
        }
        let byte = stream.read_u8()?;
        if in_comment {
            if byte == b'\n' {
                in_comment = false;
            }
            continue;
        }
        match byte {
            b'#' if token.is_empty() => in_comment = true,
            b' ' | b'\t' | b'\r' | b'\n' => {
                if !token.is_empty() {
                    return Ok(token);
                }
            }
            _ => token.push(byte as char)
        }
    }
}

fn token_usize(stream: &mut BufferedStream, what: &'static str) -> Result<usize, ImageErrors> {
    let token = next_token(stream)?;
    token
        .parse::<usize>()
        .map_err(|_| ImageErrors::FormatErrorsOwned(format!("{what} is not a number: {token:?}")))
}

fn create_parser() -> Box<dyn ImageParser> {
    Box::new(PgmParser)
}

struct PgmParser;

impl ImageParser for PgmParser {
    fn format(&self) -> &'static Format {
        &PGM
    }

    fn typed_parse(
        &mut self, _ctx: &Context, _id: &str, stream: &mut BufferedStream, options: &ReadOptions
    ) -> Result<ImageMetadata, ImageErrors> {
        let magic = stream.read_string(2)?;
        let width = token_usize(stream, "width")?;
        let height = token_usize(stream, "height")?;
        let maxval = token_usize(stream, "maxval")?;

        let pixel_type = match maxval {
            1..=255 => PixelType::UInt8,
            256..=65535 => PixelType::UInt16,
            _ => return Err(ImageErrors::FormatErrors("maxval must be between 1 and 65535"))
        };

        let axes = vec![Axis::new(AxisType::X, width), Axis::new(AxisType::Y, height)];
        let mut metadata = ImageMetadata::new(axes, pixel_type, ByteOrder::BigEndian)?;
        metadata.record_entry(options, "MagicNumber", &magic);
        metadata.record_entry(options, "Maxval", &maxval.to_string());

        trace!("graymap: {width}x{height}, maxval {maxval}");
        Ok(metadata)
    }
}

fn open_reader(
    ctx: &Context, id: &str, options: &ReadOptions
) -> Result<Box<dyn ImageReader>, ImageErrors> {
    let mut parser = PgmParser;
    let metadata = parser.parse(ctx, id, options)?;

    let mut stream = ctx.open_stream(id, options)?;
    let magic = stream.read_string(2)?;
    let ascii = magic == "P2";
    // skip width, height and maxval; the samples start right after
    next_token(&mut stream)?;
    next_token(&mut stream)?;
    next_token(&mut stream)?;
    let data_offset = stream.file_pointer();

    Ok(Box::new(PgmReader { stream, metadata, data_offset, ascii, closed: false }))
}

struct PgmReader {
    stream:      BufferedStream,
    metadata:    ImageMetadata,
    data_offset: u64,
    ascii:       bool,
    closed:      bool
}

impl ImageReader for PgmReader {
    fn metadata(&self, series: usize) -> Result<&ImageMetadata, ImageErrors> {
        if series != 0 {
            return Err(ImageErrors::SeriesOutOfBounds(series, 1));
        }
        Ok(&self.metadata)
    }

    fn set_normalized(&mut self, _normalized: bool) {
        // graymaps have no float samples to canonicalize
    }

    fn is_normalized(&self) -> bool {
        false
    }

    fn open_plane(
        &mut self, series: usize, plane: usize, region: Region
    ) -> Result<Plane, ImageErrors> {
        if self.closed {
            return Err(ImageErrors::IoErrors(IoError::Closed("PgmReader")));
        }
        if series != 0 {
            return Err(ImageErrors::SeriesOutOfBounds(series, 1));
        }
        if self.ascii {
            return Err(ImageErrors::FormatErrors(
                "ASCII graymap planes are not materialized"
            ));
        }
        self.metadata.check_plane(plane, &region)?;

        let width = self.metadata.width();
        let element_size = self.metadata.pixel_type().size_of();

        let mut bytes = vec![0_u8; region.width * region.height * element_size];
        for (row, y) in (region.y..region.y + region.height).enumerate() {
            let offset = (y * width + region.x) * element_size;
            self.stream.seek(self.data_offset + offset as u64)?;
            self.stream.read_exact_bytes(
                &mut bytes[row * region.width * element_size..][..region.width * element_size]
            )?;
        }
        Ok(Plane::new(series, plane, region, bytes))
    }

    fn close(&mut self) -> Result<(), ImageErrors> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream.close()?;
        Ok(())
    }
}

fn create_writer(
    _ctx: &Context, id: &str, metadata: ImageMetadata
) -> Result<Box<dyn ImageWriter>, ImageErrors> {
    let maxval: usize = match metadata.pixel_type() {
        PixelType::UInt8 => 255,
        PixelType::UInt16 => 65535,
        _ => {
            return Err(ImageErrors::FormatErrors(
                "graymaps store unsigned 8 or 16 bit samples"
            ))
        }
    };
    if metadata.plane_count() != 1 {
        return Err(ImageErrors::FormatErrors("graymaps hold exactly one plane"));
    }

    let header = format!("P5\n{} {}\n{}\n", metadata.width(), metadata.height(), maxval);
    let handle = FileHandle::create(id)?;
    let mut stream = BufferedStream::new(Box::new(handle));
    stream.write_bytes(header.as_bytes())?;
    let data_offset = stream.file_pointer();

    Ok(Box::new(PgmWriter { stream, metadata, data_offset, closed: false }))
}

struct PgmWriter {
    stream:      BufferedStream,
    metadata:    ImageMetadata,
    data_offset: u64,
    closed:      bool
}

impl ImageWriter for PgmWriter {
    fn save_plane(
        &mut self, series: usize, plane: usize, region: Region, bytes: &[u8]
    ) -> Result<(), ImageErrors> {
        if self.closed {
            return Err(ImageErrors::IoErrors(IoError::Closed("PgmWriter")));
        }
        if series != 0 {
            return Err(ImageErrors::SeriesOutOfBounds(series, 1));
        }
        self.metadata.check_plane(plane, &region)?;

        let element_size = self.metadata.pixel_type().size_of();
        let expected = region.width * region.height * element_size;
        if bytes.len() != expected {
            return Err(ImageErrors::BufferMismatch(expected, bytes.len()));
        }

        let width = self.metadata.width();
        for (row, y) in (region.y..region.y + region.height).enumerate() {
            let offset = (y * width + region.x) * element_size;
            self.stream.seek(self.data_offset + offset as u64)?;
            self.stream
                .write_bytes(&bytes[row * region.width * element_size..][..region.width * element_size])?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ImageErrors> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // pad the sample block so unsaved regions read back as zeros
        let element_size = self.metadata.pixel_type().size_of();
        let total = self.data_offset
            + (self.metadata.width() * self.metadata.height() * element_size) as u64;
        if self.stream.length()? < total {
            self.stream.seek(total - 1)?;
            self.stream.write_u8(0)?;
        }
        self.stream.close()?;
        Ok(())
    }
}
