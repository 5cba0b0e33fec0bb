/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! The MetaImage format (`.mha`)
//!
//! A combined text header followed by a raw pixel block. The header is
//! `Key = Value` lines: `NDims`, `DimSize`, `ElementType` (`MET_UCHAR`,
//! `MET_SHORT`, `MET_FLOAT`, ...), `BinaryDataByteOrderMSB` and
//! optionally `ElementNumberOfChannels` for interleaved channels. The
//! pixel block stores the dimensions with X fastest, channels
//! interleaved per element.
//!
//! Only the combined single-file layout (`ElementDataFile = LOCAL`) is
//! supported; detached and compressed element data are format errors.

use log::trace;
use planar_core::bytestream::{BufferedStream, IoError};
use planar_core::options::ReadOptions;
use planar_core::pixel::{ByteOrder, PixelType};

use crate::context::Context;
use crate::decode::{normalize_plane_bytes, PixelLayout};
use crate::errors::ImageErrors;
use crate::formats::Format;
use crate::metadata::{Axis, AxisType, ImageMetadata};
use crate::plane::{Plane, Region};
use crate::terms::{match_term, TermTable};
use crate::traits::{ImageParser, ImageReader, ImageWriter};

pub static META_IMAGE: Format = Format {
    name:     "MetaImage",
    suffixes: &["mha"],
    checker:  check_meta,
    parser:   create_parser,
    reader:   open_reader,
    writer:   Some(create_writer),
    unwrap:   None
};

const META_MAGIC: &[u8] = b"ObjectType";

/// MetaImage element type names
static ELEMENT_TYPE_TERMS: TermTable<PixelType> = TermTable::new(
    &[
        ("met_char", PixelType::Int8),
        ("met_uchar", PixelType::UInt8),
        ("met_short", PixelType::Int16),
        ("met_ushort", PixelType::UInt16),
        ("met_int", PixelType::Int32),
        ("met_uint", PixelType::UInt32),
        ("met_long_long", PixelType::Int64),
        ("met_ulong_long", PixelType::UInt64),
        ("met_float", PixelType::Float32),
        ("met_double", PixelType::Float64)
    ],
    None
);

fn check_meta(stream: &mut BufferedStream) -> Result<bool, IoError> {
    let mut magic = [0_u8; 10];
    let read = stream.read_bytes(&mut magic)?;
    Ok(read == magic.len() && magic == META_MAGIC)
}

fn parse_bool(value: &str) -> Result<bool, ImageErrors> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ImageErrors::EnumerationError("Boolean", value.to_string()))
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ImageErrors> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ImageErrors::FormatErrorsOwned(format!("{key} is not a number: {value:?}")))
}

fn met_name(pixel_type: PixelType) -> Option<&'static str> {
    match pixel_type {
        PixelType::Int8 => Some("MET_CHAR"),
        PixelType::UInt8 => Some("MET_UCHAR"),
        PixelType::Int16 => Some("MET_SHORT"),
        PixelType::UInt16 => Some("MET_USHORT"),
        PixelType::Int32 => Some("MET_INT"),
        PixelType::UInt32 => Some("MET_UINT"),
        PixelType::Int64 => Some("MET_LONG_LONG"),
        PixelType::UInt64 => Some("MET_ULONG_LONG"),
        PixelType::Float32 => Some("MET_FLOAT"),
        PixelType::Float64 => Some("MET_DOUBLE"),
        _ => None
    }
}

fn create_parser() -> Box<dyn ImageParser> {
    Box::new(MetaParser)
}

struct MetaParser;

impl ImageParser for MetaParser {
    fn format(&self) -> &'static Format {
        &META_IMAGE
    }

    fn typed_parse(
        &mut self, _ctx: &Context, _id: &str, stream: &mut BufferedStream, options: &ReadOptions
    ) -> Result<ImageMetadata, ImageErrors> {
        let mut ndims: Option<usize> = None;
        let mut dim_size: Vec<usize> = Vec::new();
        let mut element_type: Option<PixelType> = None;
        let mut channels = 1_usize;
        // MetaImage data is little endian unless the header says MSB
        let mut order = ByteOrder::LittleEndian;
        let mut entries: Vec<(String, String)> = Vec::new();

        loop {
            if stream.is_eof()? {
                return Err(ImageErrors::FormatErrors("missing ElementDataFile key"));
            }
            let line = stream.read_line()?;
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                ImageErrors::FormatErrorsOwned(format!("malformed header line {line:?}"))
            })?;
            let key = key.trim();
            let value = value.trim();
            entries.push((key.to_string(), value.to_string()));

            match key {
                "ObjectType" => {
                    if !value.eq_ignore_ascii_case("image") {
                        return Err(ImageErrors::FormatErrorsOwned(format!(
                            "object type {value:?} is not an image"
                        )));
                    }
                }
                "NDims" => ndims = Some(parse_usize(key, value)?),
                "DimSize" => {
                    dim_size = value
                        .split_whitespace()
                        .map(|v| parse_usize(key, v))
                        .collect::<Result<_, _>>()?;
                }
                "ElementType" => {
                    element_type = Some(match_term("ElementType", value, &ELEMENT_TYPE_TERMS)?);
                }
                "ElementNumberOfChannels" => channels = parse_usize(key, value)?,
                "BinaryDataByteOrderMSB" | "ElementByteOrderMSB" => {
                    order = if parse_bool(value)? {
                        ByteOrder::BigEndian
                    } else {
                        ByteOrder::LittleEndian
                    };
                }
                "BinaryData" => {
                    if !parse_bool(value)? {
                        return Err(ImageErrors::FormatErrors(
                            "ASCII MetaImage data is not supported"
                        ));
                    }
                }
                "CompressedData" => {
                    if parse_bool(value)? {
                        return Err(ImageErrors::FormatErrors(
                            "compressed MetaImage data is not supported"
                        ));
                    }
                }
                "ElementDataFile" => {
                    if !value.eq_ignore_ascii_case("local") {
                        return Err(ImageErrors::FormatErrors(
                            "detached element data files are not supported"
                        ));
                    }
                    break;
                }
                _ => {}
            }
        }

        let ndims = ndims.ok_or(ImageErrors::FormatErrors("missing NDims key"))?;
        if ndims < 2 {
            return Err(ImageErrors::FormatErrors("MetaImage needs at least two dimensions"));
        }
        if dim_size.len() != ndims {
            return Err(ImageErrors::FormatErrorsOwned(format!(
                "DimSize lists {} lengths but NDims is {ndims}",
                dim_size.len()
            )));
        }
        let element_type = element_type.ok_or(ImageErrors::FormatErrors("missing ElementType key"))?;
        if channels == 0 {
            return Err(ImageErrors::FormatErrors("ElementNumberOfChannels cannot be zero"));
        }

        let mut axes = vec![
            Axis::new(AxisType::X, dim_size[0]),
            Axis::new(AxisType::Y, dim_size[1]),
        ];
        if channels > 1 {
            axes.push(Axis::new(AxisType::Channel, channels));
        }
        for (index, length) in dim_size[2..].iter().enumerate() {
            let kind = match index {
                0 => AxisType::Z,
                1 => AxisType::Time,
                _ => AxisType::Other
            };
            axes.push(Axis::new(kind, *length));
        }

        let mut metadata = ImageMetadata::new(axes, element_type, order)?;
        for (key, value) in entries {
            metadata.record_entry(options, &key, &value);
        }

        trace!(
            "MetaImage: {}x{}, {} plane(s), {:?} {:?}",
            metadata.width(),
            metadata.height(),
            metadata.plane_count(),
            element_type,
            order
        );
        Ok(metadata)
    }
}

/// Linear element offset of a plane's first row.
///
/// The plane index runs over the non-planar axes in declared order,
/// first axis fastest; channels are interleaved per element on disk,
/// every other axis selects a whole X-Y slice.
fn plane_origin(metadata: &ImageMetadata, plane: usize) -> (usize, usize) {
    let mut remaining = plane;
    let mut channel = 0_usize;
    let mut slice = 0_usize;
    let mut slice_stride = 1_usize;

    for axis in metadata.axes() {
        match axis.kind {
            AxisType::X | AxisType::Y => {}
            AxisType::Channel => {
                channel = remaining % axis.length;
                remaining /= axis.length;
            }
            _ => {
                slice += (remaining % axis.length) * slice_stride;
                remaining /= axis.length;
                slice_stride *= axis.length;
            }
        }
    }
    (channel, slice)
}

fn open_reader(
    ctx: &Context, id: &str, options: &ReadOptions
) -> Result<Box<dyn ImageReader>, ImageErrors> {
    let mut parser = MetaParser;
    let metadata = parser.parse(ctx, id, options)?;

    let mut stream = ctx.open_stream(id, options)?;
    // the pixel block begins right after the ElementDataFile line
    stream.find_string(false, &["ElementDataFile"])?;
    stream.read_line()?;
    let data_offset = stream.file_pointer();

    Ok(Box::new(MetaReader {
        stream,
        metadata,
        data_offset,
        normalized: options.normalize_floats(),
        closed: false
    }))
}

struct MetaReader {
    stream:      BufferedStream,
    metadata:    ImageMetadata,
    data_offset: u64,
    normalized:  bool,
    closed:      bool
}

impl ImageReader for MetaReader {
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
            return Err(ImageErrors::IoErrors(IoError::Closed("MetaReader")));
        }
        if series != 0 {
            return Err(ImageErrors::SeriesOutOfBounds(series, 1));
        }
        self.metadata.check_plane(plane, &region)?;

        let width = self.metadata.width();
        let height = self.metadata.height();
        let element_size = self.metadata.pixel_type().size_of();
        let channels = self.metadata.axis_length(AxisType::Channel).unwrap_or(1);
        let (channel, slice) = plane_origin(&self.metadata, plane);

        let mut bytes = vec![0_u8; region.width * region.height * element_size];
        for (row, y) in (region.y..region.y + region.height).enumerate() {
            let element_offset =
                (((slice * height + y) * width + region.x) * channels + channel) * element_size;
            self.stream.seek(self.data_offset + element_offset as u64)?;

            let out = &mut bytes[row * region.width * element_size..][..region.width * element_size];
            if channels == 1 {
                self.stream.read_exact_bytes(out)?;
            } else {
                // interleaved channels: read the row span, keep every
                // channels-th element
                let span = ((region.width - 1) * channels + 1) * element_size;
                let mut interleaved = vec![0_u8; span];
                self.stream.read_exact_bytes(&mut interleaved)?;
                for x in 0..region.width {
                    let src = x * channels * element_size;
                    out[x * element_size..][..element_size]
                        .copy_from_slice(&interleaved[src..src + element_size]);
                }
            }
        }

        if self.normalized && self.metadata.pixel_type().is_float() {
            normalize_plane_bytes(&mut bytes, &PixelLayout::from_metadata(&self.metadata));
        }
        Ok(Plane::new(series, plane, region, bytes))
    }

    fn close(&mut self) -> Result<(), ImageErrors> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // pad the pixel block to its declared size so planes that were
        // never saved read back as zeros
        let element_size = self.metadata.pixel_type().size_of();
        let total = self.data_offset
            + (self.metadata.width() * self.metadata.height() * self.metadata.plane_count()
                * element_size) as u64;
        if self.stream.length()? < total {
            self.stream.seek(total - 1)?;
            self.stream.write_u8(0)?;
        }
        self.stream.close()?;
        Ok(())
    }
}

fn create_writer(
    _ctx: &Context, id: &str, metadata: ImageMetadata
) -> Result<Box<dyn ImageWriter>, ImageErrors> {
    let element = met_name(metadata.pixel_type())
        .ok_or(ImageErrors::FormatErrors("pixel type has no MetaImage element type"))?;

    let mut dims: Vec<usize> = vec![metadata.width(), metadata.height()];
    for axis in metadata.axes() {
        if !axis.kind.is_planar() && axis.kind != AxisType::Channel {
            dims.push(axis.length);
        }
    }
    let channels = metadata.axis_length(AxisType::Channel).unwrap_or(1);

    let mut header = String::new();
    header.push_str("ObjectType = Image\n");
    header.push_str(&format!("NDims = {}\n", dims.len()));
    header.push_str(&format!(
        "DimSize = {}\n",
        dims.iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    ));
    header.push_str("BinaryData = True\n");
    header.push_str(&format!(
        "BinaryDataByteOrderMSB = {}\n",
        if metadata.byte_order() == ByteOrder::BigEndian { "True" } else { "False" }
    ));
    if channels > 1 {
        header.push_str(&format!("ElementNumberOfChannels = {channels}\n"));
    }
    header.push_str(&format!("ElementType = {element}\n"));
    header.push_str("ElementDataFile = LOCAL\n");

    let handle = planar_core::bytestream::FileHandle::create(id)?;
    let mut stream = BufferedStream::new(Box::new(handle));
    stream.write_bytes(header.as_bytes())?;
    let data_offset = stream.file_pointer();

    Ok(Box::new(MetaWriter { stream, metadata, data_offset, closed: false }))
}

struct MetaWriter {
    stream:      BufferedStream,
    metadata:    ImageMetadata,
    data_offset: u64,
    closed:      bool
}

impl ImageWriter for MetaWriter {
    fn save_plane(
        &mut self, series: usize, plane: usize, region: Region, bytes: &[u8]
    ) -> Result<(), ImageErrors> {
        if self.closed {
            return Err(ImageErrors::IoErrors(IoError::Closed("MetaWriter")));
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
        let height = self.metadata.height();
        let channels = self.metadata.axis_length(AxisType::Channel).unwrap_or(1);
        let (channel, slice) = plane_origin(&self.metadata, plane);

        for (row, y) in (region.y..region.y + region.height).enumerate() {
            let element_offset =
                (((slice * height + y) * width + region.x) * channels + channel) * element_size;
            let source = &bytes[row * region.width * element_size..][..region.width * element_size];

            if channels == 1 {
                self.stream.seek(self.data_offset + element_offset as u64)?;
                self.stream.write_bytes(source)?;
            } else {
                // interleaved channels are written element by element
                for x in 0..region.width {
                    let target = element_offset + x * channels * element_size;
                    self.stream.seek(self.data_offset + target as u64)?;
                    self.stream
                        .write_bytes(&source[x * element_size..][..element_size])?;
                }
            }
        }
        Ok(())
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
