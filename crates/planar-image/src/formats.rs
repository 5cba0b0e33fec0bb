/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! The format catalog: descriptors, the priority-ordered registry and
//! every concrete format the library ships
//!
//! A [`Format`] is data plus a function table: a name, the recognized
//! filename suffixes, a magic-byte checker and factories for the
//! format's parser, reader and writer. Formats are resolved through an
//! explicit registry lookup; there is no reflection and no global
//! catalog. The registry is populated once, up front, and read-only
//! afterwards; its order is a deliberate tie-break, containers come
//! before leaf formats.

use planar_core::bytestream::{BufferedStream, IoError};
use planar_core::options::ReadOptions;

use crate::context::Context;
use crate::errors::ImageErrors;
use crate::metadata::ImageMetadata;
use crate::traits::{ImageParser, ImageReader, ImageWriter};

pub mod gzip;
pub mod meta;
pub mod pattern;
pub mod pgm;

/// A format descriptor: identification data plus factories
pub struct Format {
    /// Human readable format name
    pub name:     &'static str,
    /// Recognized filename suffixes, lowercase and without the dot
    pub suffixes: &'static [&'static str],
    /// Content probe over a bounded prefix of the resource.
    ///
    /// Must tolerate resources shorter than the magic it looks for and
    /// answer `false` rather than error.
    pub checker:  fn(&mut BufferedStream) -> Result<bool, IoError>,
    /// Create a metadata parser for this format
    pub parser:   fn() -> Box<dyn ImageParser>,
    /// Open a reader over an identified resource
    pub reader:   fn(&Context, &str, &ReadOptions) -> Result<Box<dyn ImageReader>, ImageErrors>,
    /// Open a writer, for formats that can persist pixels
    pub writer:
        Option<fn(&Context, &str, ImageMetadata) -> Result<Box<dyn ImageWriter>, ImageErrors>>,
    /// For container formats: map the wrapped content into the context
    /// and return its id
    pub unwrap:   Option<fn(&Context, &str, &ReadOptions) -> Result<String, ImageErrors>>
}

impl Format {
    /// Whether this format wraps another recognizable format
    pub const fn is_container(&self) -> bool {
        self.unwrap.is_some()
    }
}

impl std::fmt::Debug for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Format")
            .field("name", &self.name)
            .field("suffixes", &self.suffixes)
            .finish()
    }
}

/// Whether the id's filename suffix is one of `suffixes`
pub fn suffix_matches(id: &str, suffixes: &[&str]) -> bool {
    match id.rsplit_once('.') {
        Some((_, extension)) => suffixes.iter().any(|s| s.eq_ignore_ascii_case(extension)),
        None => false
    }
}

/// The priority-ordered catalog of known formats.
///
/// Populated once at startup and read-only thereafter.
pub struct FormatRegistry {
    formats: Vec<&'static Format>
}

impl FormatRegistry {
    /// Build a registry from an explicit priority-ordered list
    pub fn new(formats: Vec<&'static Format>) -> FormatRegistry {
        FormatRegistry { formats }
    }

    /// Every format the library ships, containers first
    pub fn with_default_formats() -> FormatRegistry {
        FormatRegistry::new(vec![
            &gzip::GZIP,
            &meta::META_IMAGE,
            &pgm::PGM,
            &pattern::PATTERN,
        ])
    }

    /// The formats in priority order
    pub fn formats(&self) -> &[&'static Format] {
        &self.formats
    }

    /// Look a format up by name
    pub fn format_named(&self, name: &str) -> Option<&'static Format> {
        self.formats.iter().copied().find(|f| f.name == name)
    }

    /// The first format whose suffix list matches `id`
    pub fn format_for_id(&self, id: &str) -> Option<&'static Format> {
        self.formats
            .iter()
            .copied()
            .find(|f| suffix_matches(id, f.suffixes))
    }
}
