/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Pattern format tests: vocabulary matching, synthesized planes and
//! indexed color

use planar_core::options::ReadOptions;
use planar_core::pixel::{ByteOrder, PixelType};
use planar_image::context::Context;
use planar_image::decode::{decode_plane, PixelData, PixelLayout};
use planar_image::errors::ImageErrors;
use planar_image::metadata::AxisType;
use planar_image::plane::Region;

fn descriptor() -> Vec<u8> {
    b"#pattern\naxes = X:4, Y:3, C:2, Z:2\ntype = uint16\norder = big\nindexed = true\n".to_vec()
}

#[test]
fn descriptor_parses_into_axes_and_terms() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes("grid.pattern", descriptor());

    let metadata = ctx.parse("grid.pattern", &ReadOptions::default()).unwrap();
    assert_eq!(metadata.width(), 4);
    assert_eq!(metadata.height(), 3);
    assert_eq!(metadata.axis_length(AxisType::Channel), Some(2));
    assert_eq!(metadata.axis_length(AxisType::Z), Some(2));
    assert_eq!(metadata.plane_count(), 4);
    assert_eq!(metadata.pixel_type(), PixelType::UInt16);
    assert_eq!(metadata.byte_order(), ByteOrder::BigEndian);
}

#[test]
fn unknown_axis_labels_fall_back_to_other() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes(
        "odd.pattern",
        b"#pattern\naxes = X:2, Y:2, lambda:3\ntype = uint8\n".to_vec()
    );

    let metadata = ctx.parse("odd.pattern", &ReadOptions::default()).unwrap();
    assert_eq!(metadata.axis_length(AxisType::Other), Some(3));
    assert_eq!(metadata.plane_count(), 3);
}

#[test]
fn unknown_sample_type_is_surfaced() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes(
        "bad.pattern",
        b"#pattern\naxes = X:2, Y:2\ntype = voxelsoup\n".to_vec()
    );

    assert!(matches!(
        ctx.parse("bad.pattern", &ReadOptions::default()),
        Err(ImageErrors::EnumerationError("PixelType", _))
    ));
}

#[test]
fn planes_are_deterministic_gradients() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes("grid.pattern", descriptor());

    let mut reader = ctx.open_reader("grid.pattern", &ReadOptions::default()).unwrap();
    let layout = PixelLayout::from_metadata(reader.metadata(0).unwrap());

    let plane = reader.open_full_plane(0, 3).unwrap();
    match decode_plane(plane.bytes(), &layout).unwrap() {
        PixelData::U16(values) => {
            let expected: Vec<u16> = (0..3_u16)
                .flat_map(|y| (0..4_u16).map(move |x| x + y + 3))
                .collect();
            assert_eq!(values, expected);
        }
        _ => unreachable!()
    }

    // identical request, identical pixels
    let again = reader.open_full_plane(0, 3).unwrap();
    assert_eq!(again.bytes(), plane.bytes());

    let region = reader.open_plane(0, 0, Region::new(2, 1, 2, 2)).unwrap();
    match decode_plane(region.bytes(), &layout).unwrap() {
        PixelData::U16(values) => assert_eq!(values, vec![3, 4, 4, 5]),
        _ => unreachable!()
    }
    reader.close().unwrap();
}

#[test]
fn indexed_patterns_carry_a_color_table() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes("grid.pattern", descriptor());

    let reader = ctx.open_reader("grid.pattern", &ReadOptions::default()).unwrap();
    let table = reader.color_table(0, 0).unwrap();
    assert_eq!(table.len(), 256);
    assert_eq!(table.entry(0), Some([0, 255, 0]));
    assert_eq!(table.entry(2), Some([2, 253, 14]));
    assert_eq!(table.entry(256), None);
}

#[test]
fn unindexed_patterns_have_none() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes(
        "plain.pattern",
        b"#pattern\naxes = X:2, Y:2\ntype = uint8\n".to_vec()
    );

    let reader = ctx.open_reader("plain.pattern", &ReadOptions::default()).unwrap();
    assert!(reader.color_table(0, 0).is_none());
}
