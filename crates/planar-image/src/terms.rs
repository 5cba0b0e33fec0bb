/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Enumerated metadata term matching
//!
//! Formats carry enumerated values as free text. Each vocabulary is a
//! precomputed static ordered table with deterministic first-match
//! semantics: the value is trimmed and compared case-insensitively
//! against each pattern in turn. Vocabularies with a designated
//! fallback map anything unrecognized to it; vocabularies without one
//! surface an enumeration error instead of silently defaulting.

use planar_core::pixel::{ByteOrder, PixelType};

use crate::errors::ImageErrors;
use crate::metadata::AxisType;

/// A static ordered vocabulary mapping text patterns to terms
pub struct TermTable<T: 'static> {
    entries: &'static [(&'static str, T)],
    other:   Option<T>
}

impl<T: Copy> TermTable<T> {
    pub const fn new(entries: &'static [(&'static str, T)], other: Option<T>) -> TermTable<T> {
        TermTable { entries, other }
    }

    /// Match `value` against the table, first match wins
    pub fn lookup(&self, value: &str) -> Option<T> {
        let trimmed = value.trim();
        for (pattern, term) in self.entries {
            if trimmed.eq_ignore_ascii_case(pattern) {
                return Some(*term);
            }
        }
        self.other
    }
}

/// Match `value` against `table`, failing with an enumeration error
/// naming `entity` when nothing matches and the vocabulary has no
/// fallback
pub fn match_term<T: Copy>(
    entity: &'static str, value: &str, table: &TermTable<T>
) -> Result<T, ImageErrors> {
    table
        .lookup(value)
        .ok_or_else(|| ImageErrors::EnumerationError(entity, value.to_string()))
}

/// Pixel storage type names. No fallback: an unknown sample type is an
/// error, not a guess
pub static PIXEL_TYPE_TERMS: TermTable<PixelType> = TermTable::new(
    &[
        ("int8", PixelType::Int8),
        ("uint8", PixelType::UInt8),
        ("int16", PixelType::Int16),
        ("uint16", PixelType::UInt16),
        ("int32", PixelType::Int32),
        ("uint32", PixelType::UInt32),
        ("int64", PixelType::Int64),
        ("uint64", PixelType::UInt64),
        ("float", PixelType::Float32),
        ("float32", PixelType::Float32),
        ("single", PixelType::Float32),
        ("double", PixelType::Float64),
        ("float64", PixelType::Float64)
    ],
    None
);

/// Axis labels. Unrecognized labels fall back to
/// [`AxisType::Other`], the designated unknown alias
pub static AXIS_TERMS: TermTable<AxisType> = TermTable::new(
    &[
        ("x", AxisType::X),
        ("y", AxisType::Y),
        ("z", AxisType::Z),
        ("c", AxisType::Channel),
        ("ch", AxisType::Channel),
        ("channel", AxisType::Channel),
        ("t", AxisType::Time),
        ("time", AxisType::Time)
    ],
    Some(AxisType::Other)
);

/// Byte order names as they appear in text headers
pub static BYTE_ORDER_TERMS: TermTable<ByteOrder> = TermTable::new(
    &[
        ("big", ByteOrder::BigEndian),
        ("msb", ByteOrder::BigEndian),
        ("bigendian", ByteOrder::BigEndian),
        ("little", ByteOrder::LittleEndian),
        ("lsb", ByteOrder::LittleEndian),
        ("littleendian", ByteOrder::LittleEndian)
    ],
    None
);
