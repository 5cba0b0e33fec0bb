/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Errors possible during identification, parsing and plane access
//!
//! The variants deliberately separate four failure kinds: malformed
//! content, backing-store failure, caller bounds bugs and unrecognized
//! enumerated metadata values. Identification failure
//! ([`UnidentifiedFormat`](ImageErrors::UnidentifiedFormat)) is reported
//! distinctly from a parse failure after successful identification, so
//! callers can tell "unsupported" from "corrupt".

use std::fmt::{Debug, Formatter};

use planar_core::bytestream::IoError;

/// All possible errors that can occur in the format pipeline
pub enum ImageErrors {
    /// Malformed or unexpected content for the identified format
    FormatErrors(&'static str),
    /// Malformed content, with owned context
    FormatErrorsOwned(String),
    /// The backing store failed
    IoErrors(IoError),
    // requested, available
    SeriesOutOfBounds(usize, usize),
    // requested, available
    PlaneOutOfBounds(usize, usize),
    /// A plane region does not fit the plane it addresses
    RegionOutOfBounds {
        x:            usize,
        y:            usize,
        width:        usize,
        height:       usize,
        plane_width:  usize,
        plane_height: usize
    },
    // expected bytes, found bytes
    BufferMismatch(usize, usize),
    /// A metadata value matched no recognized term for the named entity
    /// and is not the designated unknown alias
    EnumerationError(&'static str, String),
    /// No registered format matched the resource
    UnidentifiedFormat(String),
    /// Container recursion went deeper than the guard allows
    ContainerDepthExceeded(u8),
    /// The format exists but cannot persist pixels
    NoWriterForFormat(&'static str)
}

impl Debug for ImageErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FormatErrors(reason) => {
                writeln!(f, "{reason}")
            }
            Self::FormatErrorsOwned(reason) => {
                writeln!(f, "{reason}")
            }
            Self::IoErrors(error) => {
                writeln!(f, "I/O error: {:?}", error)
            }
            Self::SeriesOutOfBounds(requested, count) => {
                writeln!(
                    f,
                    "Series {requested} out of bounds, the resource has {count} series"
                )
            }
            Self::PlaneOutOfBounds(requested, count) => {
                writeln!(
                    f,
                    "Plane {requested} out of bounds, the series has {count} planes"
                )
            }
            Self::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                plane_width,
                plane_height
            } => {
                writeln!(
                    f,
                    "Region {width}x{height}+{x}+{y} does not fit a {plane_width}x{plane_height} plane"
                )
            }
            Self::BufferMismatch(expected, found) => {
                writeln!(f, "Expected a buffer of {expected} bytes but found {found}")
            }
            Self::EnumerationError(entity, value) => {
                writeln!(f, "No {entity} term matches {value:?}")
            }
            Self::UnidentifiedFormat(id) => {
                writeln!(f, "No registered format matches {id}")
            }
            Self::ContainerDepthExceeded(depth) => {
                writeln!(f, "Container recursion exceeded {depth} levels")
            }
            Self::NoWriterForFormat(name) => {
                writeln!(f, "The {name} format has no writer")
            }
        }
    }
}

impl From<IoError> for ImageErrors {
    fn from(error: IoError) -> Self {
        ImageErrors::IoErrors(error)
    }
}

impl From<&'static str> for ImageErrors {
    fn from(reason: &'static str) -> Self {
        ImageErrors::FormatErrors(reason)
    }
}

impl From<String> for ImageErrors {
    fn from(reason: String) -> Self {
        ImageErrors::FormatErrorsOwned(reason)
    }
}
