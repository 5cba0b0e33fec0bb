/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! The pattern format (`.pattern`)
//!
//! A text descriptor whose planes are synthesized on read: the sample
//! at `(x, y)` of plane `p` is `x + y + p`, truncated to the declared
//! type. Deterministic pixels without any binary payload make this the
//! go-to format for exercising the pipeline, multi-axis plane
//! indexing, enumeration vocabularies and indexed color included.
//!
//! ```text
//! #pattern
//! axes = X:64, Y:48, C:3
//! type = uint16
//! order = big
//! indexed = true
//! ```

use planar_core::bytestream::{BufferedStream, IoError};
use planar_core::options::ReadOptions;
use planar_core::pixel::{ByteOrder, PixelType};

use crate::context::Context;
use crate::errors::ImageErrors;
use crate::formats::Format;
use crate::metadata::{Axis, ColorTable, ImageMetadata};
use crate::plane::{Plane, Region};
use crate::terms::{match_term, AXIS_TERMS, BYTE_ORDER_TERMS, PIXEL_TYPE_TERMS};
use crate::traits::{ImageParser, ImageReader};

pub static PATTERN: Format = Format {
    name:     "Pattern",
    suffixes: &["pattern"],
    checker:  check_pattern,
    parser:   create_parser,
    reader:   open_reader,
    writer:   None,
    unwrap:   None
};

const PATTERN_MAGIC: &[u8] = b"#pattern";

fn check_pattern(stream: &mut BufferedStream) -> Result<bool, IoError> {
    let mut magic = [0_u8; 8];
    let read = stream.read_bytes(&mut magic)?;
    Ok(read == magic.len() && magic == PATTERN_MAGIC)
}

fn create_parser() -> Box<dyn ImageParser> {
    Box::new(PatternParser)
}

struct PatternParser;

impl ImageParser for PatternParser {
    fn format(&self) -> &'static Format {
        &PATTERN
    }

    fn typed_parse(
        &mut self, _ctx: &Context, _id: &str, stream: &mut BufferedStream, options: &ReadOptions
    ) -> Result<ImageMetadata, ImageErrors> {
        // the magic line
        stream.read_line()?;

        let mut axes: Vec<Axis> = Vec::new();
        let mut pixel_type = PixelType::UInt8;
        let mut order = ByteOrder::BigEndian;
        let mut indexed = false;
        let mut entries: Vec<(String, String)> = Vec::new();

        while !stream.is_eof()? {
            let line = stream.read_line()?;
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                ImageErrors::FormatErrorsOwned(format!("malformed descriptor line {line:?}"))
            })?;
            let key = key.trim();
            let value = value.trim();
            entries.push((key.to_string(), value.to_string()));

            match key {
                "axes" => {
                    axes = value
                        .split(',')
                        .map(|token| parse_axis(token))
                        .collect::<Result<_, _>>()?;
                }
                "type" => pixel_type = match_term("PixelType", value, &PIXEL_TYPE_TERMS)?,
                "order" => order = match_term("ByteOrder", value, &BYTE_ORDER_TERMS)?,
                "indexed" => {
                    indexed = value.eq_ignore_ascii_case("true");
                }
                _ => {}
            }
        }

        let mut metadata = ImageMetadata::new(axes, pixel_type, order)?;
        if indexed {
            metadata.set_color_table(ramp_table());
        }
        for (key, value) in entries {
            metadata.record_entry(options, &key, &value);
        }
        Ok(metadata)
    }
}

fn parse_axis(token: &str) -> Result<Axis, ImageErrors> {
    let (label, length) = token.split_once(':').ok_or_else(|| {
        ImageErrors::FormatErrorsOwned(format!("malformed axis token {token:?}"))
    })?;
    // unrecognized labels land on AxisType::Other by design
    let kind = match_term("AxisType", label, &AXIS_TERMS)?;
    let length = length.trim().parse::<usize>().map_err(|_| {
        ImageErrors::FormatErrorsOwned(format!("axis length is not a number: {token:?}"))
    })?;
    Ok(Axis::new(kind, length))
}

/// The deterministic lookup table indexed patterns carry
fn ramp_table() -> ColorTable {
    let entries = (0..256_usize)
        .map(|i| [i as u8, (255 - i) as u8, ((i * 7) % 256) as u8])
        .collect();
    ColorTable::new(entries)
}

fn open_reader(
    ctx: &Context, id: &str, options: &ReadOptions
) -> Result<Box<dyn ImageReader>, ImageErrors> {
    let mut parser = PatternParser;
    let metadata = parser.parse(ctx, id, options)?;
    Ok(Box::new(PatternReader { metadata, normalized: options.normalize_floats(), closed: false }))
}

struct PatternReader {
    metadata:   ImageMetadata,
    normalized: bool,
    closed:     bool
}

/// Encode one synthesized sample into `out` per the declared layout
fn encode_sample(out: &mut [u8], value: u64, pixel_type: PixelType, order: ByteOrder) {
    macro_rules! put {
        ($converted:expr) => {{
            let bytes = match order {
                ByteOrder::BigEndian => $converted.to_be_bytes(),
                ByteOrder::LittleEndian => $converted.to_le_bytes()
            };
            out.copy_from_slice(&bytes);
        }};
    }

    match pixel_type {
        PixelType::Int8 | PixelType::UInt8 => out[0] = value as u8,
        PixelType::Int16 | PixelType::UInt16 => put!((value as u16)),
        PixelType::Int32 | PixelType::UInt32 => put!((value as u32)),
        PixelType::Int64 | PixelType::UInt64 => put!(value),
        PixelType::Float32 => put!((value as f32).to_bits()),
        PixelType::Float64 => put!((value as f64).to_bits()),
        _ => {}
    }
}

impl ImageReader for PatternReader {
    fn metadata(&self, series: usize) -> Result<&ImageMetadata, ImageErrors> {
        if series != 0 {
            return Err(ImageErrors::SeriesOutOfBounds(series, 1));
        }
        Ok(&self.metadata)
    }

    fn set_normalized(&mut self, normalized: bool) {
        self.normalized = normalized;
    }

    fn is_normalized(&self) -> bool {
        self.normalized
    }

    fn open_plane(
        &mut self, series: usize, plane: usize, region: Region
    ) -> Result<Plane, ImageErrors> {
        if self.closed {
            return Err(ImageErrors::IoErrors(IoError::Closed("PatternReader")));
        }
        if series != 0 {
            return Err(ImageErrors::SeriesOutOfBounds(series, 1));
        }
        self.metadata.check_plane(plane, &region)?;

        let pixel_type = self.metadata.pixel_type();
        let order = self.metadata.byte_order();
        let element_size = pixel_type.size_of();

        let mut bytes = vec![0_u8; region.width * region.height * element_size];
        for row in 0..region.height {
            for column in 0..region.width {
                let value =
                    (region.x + column) as u64 + (region.y + row) as u64 + plane as u64;
                let offset = (row * region.width + column) * element_size;
                encode_sample(&mut bytes[offset..offset + element_size], value, pixel_type, order);
            }
        }
        Ok(Plane::new(series, plane, region, bytes))
    }

    fn color_table(&self, series: usize, plane: usize) -> Option<&ColorTable> {
        let _ = (series, plane);
        self.metadata.color_table()
    }

    fn close(&mut self) -> Result<(), ImageErrors> {
        self.closed = true;
        Ok(())
    }
}
