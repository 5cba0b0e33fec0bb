/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! The per-series image metadata model
//!
//! An [`ImageMetadata`] is produced by a format parser and owned by the
//! reader/writer pair for the lifetime of the open resource. It carries
//! the ordered axis list, the pixel element layout and the raw key/value
//! table found in the container.

use planar_core::options::ReadOptions;
use planar_core::pixel::{ByteOrder, PixelType};

use crate::errors::ImageErrors;
use crate::plane::Region;

/// The role of one image axis
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AxisType {
    /// Horizontal spatial axis, part of every plane
    X,
    /// Vertical spatial axis, part of every plane
    Y,
    /// Depth, one step per focal slice
    Z,
    /// Channel, e.g a fluorescence wavelength
    Channel,
    /// Time point
    Time,
    /// An axis the vocabulary does not recognize.
    ///
    /// The designated fallback for unrecognized axis labels; values
    /// mapped here are preserved, not errors.
    Other
}

impl AxisType {
    /// Canonical single-letter label of the axis
    pub const fn label(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
            Self::Channel => "C",
            Self::Time => "T",
            Self::Other => "Other"
        }
    }

    /// Whether this axis is part of every 2-D plane
    pub const fn is_planar(self) -> bool {
        matches!(self, Self::X | Self::Y)
    }
}

/// One named axis with its length
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Axis {
    pub kind:   AxisType,
    pub length: usize
}

impl Axis {
    pub const fn new(kind: AxisType, length: usize) -> Axis {
        Axis { kind, length }
    }
}

/// Optional per-plane lookup table for indexed-color data
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColorTable {
    entries: Vec<[u8; 3]>
}

impl ColorTable {
    pub fn new(entries: Vec<[u8; 3]>) -> ColorTable {
        ColorTable { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up one index, `None` when out of range
    pub fn entry(&self, index: usize) -> Option<[u8; 3]> {
        self.entries.get(index).copied()
    }

    pub fn entries(&self) -> &[[u8; 3]] {
        &self.entries
    }
}

/// Metadata for one image series.
///
/// The plane count is always the product of all non-planar axis
/// lengths; it is derived from the axis list rather than stored, so the
/// invariant cannot drift.
#[derive(Clone, Debug)]
pub struct ImageMetadata {
    axes:           Vec<Axis>,
    pixel_type:     PixelType,
    bits_per_pixel: u32,
    order:          ByteOrder,
    tile_width:     Option<usize>,
    tile_height:    Option<usize>,
    color_table:    Option<ColorTable>,
    table:          Vec<(String, String)>
}

impl ImageMetadata {
    /// Create metadata over the given ordered axis list.
    ///
    /// The list must contain exactly one X and one Y axis and no axis
    /// of length zero.
    pub fn new(
        axes: Vec<Axis>, pixel_type: PixelType, order: ByteOrder
    ) -> Result<ImageMetadata, ImageErrors> {
        let x_count = axes.iter().filter(|a| a.kind == AxisType::X).count();
        let y_count = axes.iter().filter(|a| a.kind == AxisType::Y).count();
        if x_count != 1 || y_count != 1 {
            return Err(ImageErrors::FormatErrors(
                "the axis list must contain exactly one X and one Y axis"
            ));
        }
        if axes.iter().any(|a| a.length == 0) {
            return Err(ImageErrors::FormatErrors("axes of length zero are not allowed"));
        }
        Ok(ImageMetadata {
            axes,
            pixel_type,
            bits_per_pixel: pixel_type.bits(),
            order,
            tile_width: None,
            tile_height: None,
            color_table: None,
            table: Vec::new()
        })
    }

    /// The ordered axis list
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Length of the first axis of the given kind
    pub fn axis_length(&self, kind: AxisType) -> Option<usize> {
        self.axes.iter().find(|a| a.kind == kind).map(|a| a.length)
    }

    /// Length of the X axis
    pub fn width(&self) -> usize {
        self.axis_length(AxisType::X).unwrap_or(0)
    }

    /// Length of the Y axis
    pub fn height(&self) -> usize {
        self.axis_length(AxisType::Y).unwrap_or(0)
    }

    /// Number of planes in the series, the product of all non-planar
    /// axis lengths
    pub fn plane_count(&self) -> usize {
        self.axes
            .iter()
            .filter(|a| !a.kind.is_planar())
            .map(|a| a.length)
            .product()
    }

    /// The pixel element storage type
    pub const fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// The byte order of the pixel block
    pub const fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// The number of meaningful bits per sample.
    ///
    /// Equal to the storage width except for bit-packed encodings,
    /// where it is smaller.
    pub const fn bits_per_pixel(&self) -> u32 {
        self.bits_per_pixel
    }

    /// Declare a packed sample width.
    ///
    /// Must be between one and the storage width; float samples are
    /// never packed.
    pub fn set_bits_per_pixel(&mut self, bits: u32) -> Result<(), ImageErrors> {
        if bits == 0 || bits > self.pixel_type.bits() {
            return Err(ImageErrors::FormatErrors(
                "bits per pixel must be between one and the storage width"
            ));
        }
        if self.pixel_type.is_float() && bits != self.pixel_type.bits() {
            return Err(ImageErrors::FormatErrors("float samples cannot be bit-packed"));
        }
        self.bits_per_pixel = bits;
        Ok(())
    }

    /// Tile width, for formats that store planes in tiles
    pub const fn tile_width(&self) -> Option<usize> {
        self.tile_width
    }

    /// Tile height, for formats that store planes in tiles
    pub const fn tile_height(&self) -> Option<usize> {
        self.tile_height
    }

    pub fn set_tile_size(&mut self, width: usize, height: usize) {
        self.tile_width = Some(width);
        self.tile_height = Some(height);
    }

    /// The lookup table for indexed-color data, if the format carries
    /// one
    pub fn color_table(&self) -> Option<&ColorTable> {
        self.color_table.as_ref()
    }

    pub fn set_color_table(&mut self, table: ColorTable) {
        self.color_table = Some(table);
    }

    /// The raw key/value table found in the container
    pub fn table(&self) -> &[(String, String)] {
        &self.table
    }

    /// Value of one raw table key
    pub fn table_value(&self, key: &str) -> Option<&str> {
        self.table
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Append a raw table entry unconditionally
    pub fn add_table_entry(&mut self, key: &str, value: &str) {
        self.table.push((key.to_string(), value.to_string()));
    }

    /// Append a raw table entry honoring the configured options.
    ///
    /// Entries are dropped entirely when the original-metadata table is
    /// not populated, and run through the filtering policy when
    /// filtering is on.
    pub fn record_entry(&mut self, options: &ReadOptions, key: &str, value: &str) {
        if !options.populate_original_metadata() {
            return;
        }
        if options.filter_metadata() && !accept_entry(key, value) {
            return;
        }
        self.add_table_entry(key, value);
    }

    /// The full region of one plane
    pub fn full_region(&self) -> Region {
        Region::new(0, 0, self.width(), self.height())
    }

    /// Number of bytes a `width` x `height` region of one plane
    /// occupies in the raw encoding
    pub fn region_bytes(&self, width: usize, height: usize) -> usize {
        let bits = width * height * self.bits_per_pixel as usize;
        bits.div_ceil(8)
    }

    /// Validate a plane index and region against this series.
    ///
    /// Out-of-range input is a caller bug and fails with a bounds
    /// error; it is never clamped.
    pub fn check_plane(&self, plane: usize, region: &Region) -> Result<(), ImageErrors> {
        let count = self.plane_count();
        if plane >= count {
            return Err(ImageErrors::PlaneOutOfBounds(plane, count));
        }
        let width = self.width();
        let height = self.height();
        let fits_x = region.width != 0 && region.x.checked_add(region.width).is_some_and(|e| e <= width);
        let fits_y = region.height != 0 && region.y.checked_add(region.height).is_some_and(|e| e <= height);
        if !fits_x || !fits_y {
            return Err(ImageErrors::RegionOutOfBounds {
                x:            region.x,
                y:            region.y,
                width:        region.width,
                height:       region.height,
                plane_width:  width,
                plane_height: height
            });
        }
        Ok(())
    }
}

/// The metadata filtering policy: drop empty values and keys or values
/// that do not read as clean text
fn accept_entry(key: &str, value: &str) -> bool {
    if key.is_empty() || value.is_empty() {
        return false;
    }
    let clean = |text: &str| text.chars().all(|c| !c.is_control());
    clean(key) && clean(value)
}
