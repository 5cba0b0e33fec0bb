/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Portable graymap tests: header tokenizing, raw sample access and
//! the write path

use planar_core::options::ReadOptions;
use planar_core::pixel::{ByteOrder, PixelType};
use planar_image::context::Context;
use planar_image::decode::{decode_plane, PixelData, PixelLayout};
use planar_image::errors::ImageErrors;
use planar_image::metadata::{Axis, AxisType, ImageMetadata};
use planar_image::plane::Region;

use crate::temp_path;

fn small_p5() -> Vec<u8> {
    let mut bytes = b"P5\n# a comment line\n4 2\n255\n".to_vec();
    bytes.extend_from_slice(&[10, 20, 30, 40, 50, 60, 70, 80]);
    bytes
}

#[test]
fn p5_parses_and_reads() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes("gray.pgm", small_p5());

    let format = ctx.identify("gray.pgm").unwrap();
    assert_eq!(format.name, "Portable graymap");

    let mut reader = ctx.open_reader("gray.pgm", &ReadOptions::default()).unwrap();
    let metadata = reader.metadata(0).unwrap();
    assert_eq!(metadata.width(), 4);
    assert_eq!(metadata.height(), 2);
    assert_eq!(metadata.pixel_type(), PixelType::UInt8);
    assert_eq!(metadata.plane_count(), 1);
    assert_eq!(metadata.table_value("Maxval"), Some("255"));

    let plane = reader.open_full_plane(0, 0).unwrap();
    assert_eq!(plane.bytes(), &[10, 20, 30, 40, 50, 60, 70, 80]);

    let region = reader.open_plane(0, 0, Region::new(2, 1, 2, 1)).unwrap();
    assert_eq!(region.bytes(), &[70, 80]);
    reader.close().unwrap();
}

#[test]
fn sixteen_bit_maxval_selects_wide_samples() {
    let mut bytes = b"P5\n2 1\n65535\n".to_vec();
    bytes.extend_from_slice(&0x0102_u16.to_be_bytes());
    bytes.extend_from_slice(&0x0304_u16.to_be_bytes());

    let ctx = Context::with_default_formats();
    ctx.map_bytes("wide.pgm", bytes);

    let mut reader = ctx.open_reader("wide.pgm", &ReadOptions::default()).unwrap();
    let layout = PixelLayout::from_metadata(reader.metadata(0).unwrap());
    assert_eq!(layout.pixel_type, PixelType::UInt16);
    assert_eq!(layout.order, ByteOrder::BigEndian);

    let plane = reader.open_full_plane(0, 0).unwrap();
    match decode_plane(plane.bytes(), &layout).unwrap() {
        PixelData::U16(values) => assert_eq!(values, vec![0x0102, 0x0304]),
        _ => unreachable!()
    }
    reader.close().unwrap();
}

#[test]
fn ascii_graymaps_are_parse_only() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes("ascii.pgm", b"P2\n2 2\n255\n0 1\n2 3\n".to_vec());

    let metadata = ctx.parse("ascii.pgm", &ReadOptions::default()).unwrap();
    assert_eq!(metadata.width(), 2);

    let mut reader = ctx.open_reader("ascii.pgm", &ReadOptions::default()).unwrap();
    assert!(matches!(
        reader.open_full_plane(0, 0),
        Err(ImageErrors::FormatErrors(_))
    ));
    reader.close().unwrap();
}

#[test]
fn graymap_write_round_trips() {
    let path = temp_path("out.pgm");
    let id = path.to_string_lossy().into_owned();

    let metadata = ImageMetadata::new(
        vec![Axis::new(AxisType::X, 3), Axis::new(AxisType::Y, 2)],
        PixelType::UInt8,
        ByteOrder::BigEndian
    )
    .unwrap();

    let ctx = Context::with_default_formats();
    let mut writer = ctx.open_writer(&id, metadata.clone()).unwrap();
    writer
        .save_plane(0, 0, metadata.full_region(), &[1, 2, 3, 4, 5, 6])
        .unwrap();
    writer.close().unwrap();

    let mut reader = ctx.open_reader(&id, &ReadOptions::default()).unwrap();
    assert_eq!(reader.open_full_plane(0, 0).unwrap().bytes(), &[1, 2, 3, 4, 5, 6]);
    reader.close().unwrap();

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn float_metadata_has_no_graymap_writer() {
    let path = temp_path("bad.pgm");
    let id = path.to_string_lossy().into_owned();

    let metadata = ImageMetadata::new(
        vec![Axis::new(AxisType::X, 2), Axis::new(AxisType::Y, 2)],
        PixelType::Float32,
        ByteOrder::BigEndian
    )
    .unwrap();

    let ctx = Context::with_default_formats();
    assert!(ctx.open_writer(&id, metadata).is_err());
}
