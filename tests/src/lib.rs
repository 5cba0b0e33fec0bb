/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![allow(unused_imports, unused)]

use std::io::Write;
use std::path::PathBuf;

use flate2::{Compression, GzBuilder};

mod identify;
mod meta;
mod pattern;
mod pgm;

/// Wrap `payload` into a single-member gzip archive, optionally naming
/// the entry
pub fn gzip_bytes(payload: &[u8], entry_name: Option<&str>) -> Vec<u8> {
    let builder = GzBuilder::new();
    let builder = match entry_name {
        Some(name) => builder.filename(name),
        None => builder
    };
    let mut encoder = builder.write(Vec::new(), Compression::default());
    encoder.write_all(payload).unwrap();
    encoder.finish().unwrap()
}

/// Assemble a combined MetaImage resource from header fields and a raw
/// pixel block
pub fn mha_bytes(
    dims: &[usize], channels: usize, element: &str, msb: bool, data: &[u8]
) -> Vec<u8> {
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
        if msb { "True" } else { "False" }
    ));
    if channels > 1 {
        header.push_str(&format!("ElementNumberOfChannels = {channels}\n"));
    }
    header.push_str(&format!("ElementType = {element}\n"));
    header.push_str("ElementDataFile = LOCAL\n");

    let mut bytes = header.into_bytes();
    bytes.extend_from_slice(data);
    bytes
}

/// A per-process scratch path for writer tests
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("planar-{}-{name}", std::process::id()))
}
