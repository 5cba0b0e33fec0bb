/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! MetaImage pipeline tests: parsing, plane addressing over Z and
//! interleaved channels, region reads and the write path

use nanorand::{Rng, WyRand};
use planar_core::options::ReadOptions;
use planar_core::pixel::{ByteOrder, PixelType};
use planar_image::context::Context;
use planar_image::decode::{decode_plane, PixelData, PixelLayout};
use planar_image::errors::ImageErrors;
use planar_image::metadata::{Axis, AxisType, ImageMetadata};
use planar_image::plane::Region;

use crate::{mha_bytes, temp_path};

/// 4x3x2 big-endian u16 volume whose element values count upwards
fn volume_bytes() -> Vec<u8> {
    let data: Vec<u8> = (0..24_u16).flat_map(|v| v.to_be_bytes()).collect();
    mha_bytes(&[4, 3, 2], 1, "MET_USHORT", true, &data)
}

#[test]
fn parse_derives_the_axis_model() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes("counting.mha", volume_bytes());

    let metadata = ctx.parse("counting.mha", &ReadOptions::default()).unwrap();

    assert_eq!(metadata.width(), 4);
    assert_eq!(metadata.height(), 3);
    assert_eq!(metadata.axis_length(AxisType::Z), Some(2));
    assert_eq!(metadata.plane_count(), 2);
    assert_eq!(metadata.pixel_type(), PixelType::UInt16);
    assert_eq!(metadata.byte_order(), ByteOrder::BigEndian);
    assert_eq!(metadata.table_value("ElementType"), Some("MET_USHORT"));
}

#[test]
fn planes_come_out_in_declared_order() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes("counting.mha", volume_bytes());

    let mut reader = ctx
        .open_reader("counting.mha", &ReadOptions::default())
        .unwrap();

    let layout = PixelLayout::from_metadata(reader.metadata(0).unwrap());
    for plane in 0..2 {
        let bytes = reader.open_full_plane(0, plane).unwrap();
        match decode_plane(bytes.bytes(), &layout).unwrap() {
            PixelData::U16(values) => {
                let base = (plane * 12) as u16;
                let expected: Vec<u16> = (base..base + 12).collect();
                assert_eq!(values, expected);
            }
            _ => unreachable!()
        }
    }
    reader.close().unwrap();
    // closing twice is a no-op
    reader.close().unwrap();
}

#[test]
fn region_reads_are_exact() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes("counting.mha", volume_bytes());

    let mut reader = ctx
        .open_reader("counting.mha", &ReadOptions::default())
        .unwrap();

    let plane = reader.open_plane(0, 1, Region::new(1, 1, 2, 2)).unwrap();
    let layout = PixelLayout::from_metadata(reader.metadata(0).unwrap());
    match decode_plane(plane.bytes(), &layout).unwrap() {
        PixelData::U16(values) => assert_eq!(values, vec![17, 18, 21, 22]),
        _ => unreachable!()
    }
    reader.close().unwrap();
}

#[test]
fn interleaved_channels_become_planes() {
    // 2x2, two interleaved u8 channels: element (y, x) holds
    // (y * 2 + x) * 2 + c
    let data: Vec<u8> = (0..8_u8).collect();
    let ctx = Context::with_default_formats();
    ctx.map_bytes("dual.mha", mha_bytes(&[2, 2], 2, "MET_UCHAR", false, &data));

    let mut reader = ctx.open_reader("dual.mha", &ReadOptions::default()).unwrap();
    assert_eq!(reader.metadata(0).unwrap().plane_count(), 2);

    let first = reader.open_full_plane(0, 0).unwrap();
    assert_eq!(first.bytes(), &[0, 2, 4, 6]);
    let second = reader.open_full_plane(0, 1).unwrap();
    assert_eq!(second.bytes(), &[1, 3, 5, 7]);
    reader.close().unwrap();
}

#[test]
fn bounds_are_never_clamped() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes("counting.mha", volume_bytes());

    let mut reader = ctx
        .open_reader("counting.mha", &ReadOptions::default())
        .unwrap();

    assert!(matches!(
        reader.open_full_plane(0, 2),
        Err(ImageErrors::PlaneOutOfBounds(2, 2))
    ));
    assert!(matches!(
        reader.open_plane(0, 0, Region::new(3, 0, 2, 1)),
        Err(ImageErrors::RegionOutOfBounds { .. })
    ));
    assert!(matches!(
        reader.open_full_plane(1, 0),
        Err(ImageErrors::SeriesOutOfBounds(1, 1))
    ));
    reader.close().unwrap();
}

#[test]
fn unknown_element_type_is_an_enumeration_error() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes(
        "odd.mha",
        mha_bytes(&[2, 2], 1, "MET_QUATERNION", false, &[0; 4])
    );

    let result = ctx.parse("odd.mha", &ReadOptions::default());
    assert!(matches!(
        result,
        Err(ImageErrors::EnumerationError("ElementType", _))
    ));
}

#[test]
fn normalized_mode_canonicalizes_floats() {
    let subnormal = 1.0e-40_f32;
    let odd_nan = f32::from_bits(0x7fc0_1234);
    let mut data = Vec::new();
    for value in [subnormal, odd_nan, 1.5, -2.0] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    let ctx = Context::with_default_formats();
    ctx.map_bytes("float.mha", mha_bytes(&[4, 1], 1, "MET_FLOAT", false, &data));

    let options = ReadOptions::default().set_normalize_floats(true);
    let mut reader = ctx.open_reader("float.mha", &options).unwrap();
    assert!(reader.is_normalized());

    let layout = PixelLayout::from_metadata(reader.metadata(0).unwrap());
    let plane = reader.open_full_plane(0, 0).unwrap();
    match decode_plane(plane.bytes(), &layout).unwrap() {
        PixelData::F32(values) => {
            assert_eq!(values[0].to_bits(), 0.0_f32.to_bits());
            assert_eq!(values[1].to_bits(), f32::NAN.to_bits());
            assert_eq!(values[2], 1.5);
            assert_eq!(values[3], -2.0);
        }
        _ => unreachable!()
    }

    // normalization is explicit configuration, never a default
    reader.set_normalized(false);
    let raw = reader.open_full_plane(0, 0).unwrap();
    match decode_plane(raw.bytes(), &layout).unwrap() {
        PixelData::F32(values) => assert_eq!(values[1].to_bits(), 0x7fc0_1234),
        _ => unreachable!()
    }
    reader.close().unwrap();
}

#[test]
fn options_control_the_raw_table() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes("counting.mha", volume_bytes());

    let bare = ctx
        .parse(
            "counting.mha",
            &ReadOptions::default().set_populate_original_metadata(false)
        )
        .unwrap();
    assert!(bare.table().is_empty());

    let full = ctx.parse("counting.mha", &ReadOptions::default()).unwrap();
    assert!(!full.table().is_empty());
}

#[test]
fn write_then_read_round_trips() {
    let path = temp_path("roundtrip.mha");
    let id = path.to_string_lossy().into_owned();

    let metadata = ImageMetadata::new(
        vec![
            Axis::new(AxisType::X, 4),
            Axis::new(AxisType::Y, 3),
            Axis::new(AxisType::Z, 2)
        ],
        PixelType::UInt16,
        ByteOrder::BigEndian
    )
    .unwrap();

    let ctx = Context::with_default_formats();
    let mut writer = ctx.open_writer(&id, metadata.clone()).unwrap();

    let full = metadata.full_region();
    let first: Vec<u8> = (0..12_u16).flat_map(|v| v.to_be_bytes()).collect();
    let second: Vec<u8> = (100..112_u16).flat_map(|v| v.to_be_bytes()).collect();
    writer.save_plane(0, 0, full, &first).unwrap();
    writer.save_plane(0, 1, full, &second).unwrap();
    writer.close().unwrap();
    writer.close().unwrap();

    let mut reader = ctx.open_reader(&id, &ReadOptions::default()).unwrap();
    assert_eq!(reader.open_full_plane(0, 0).unwrap().bytes(), &first[..]);
    assert_eq!(reader.open_full_plane(0, 1).unwrap().bytes(), &second[..]);
    reader.close().unwrap();

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn partial_writes_leave_zeros() {
    let path = temp_path("partial.mha");
    let id = path.to_string_lossy().into_owned();

    let metadata = ImageMetadata::new(
        vec![Axis::new(AxisType::X, 4), Axis::new(AxisType::Y, 4)],
        PixelType::UInt8,
        ByteOrder::BigEndian
    )
    .unwrap();

    let ctx = Context::with_default_formats();
    let mut writer = ctx.open_writer(&id, metadata).unwrap();
    writer
        .save_plane(0, 0, Region::new(1, 1, 2, 2), &[9, 9, 9, 9])
        .unwrap();
    writer.close().unwrap();

    let mut reader = ctx.open_reader(&id, &ReadOptions::default()).unwrap();
    let plane = reader.open_full_plane(0, 0).unwrap();
    assert_eq!(
        plane.bytes(),
        &[0, 0, 0, 0, 0, 9, 9, 0, 0, 9, 9, 0, 0, 0, 0, 0]
    );
    reader.close().unwrap();

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn random_volumes_survive_a_round_trip() {
    let path = temp_path("random.mha");
    let id = path.to_string_lossy().into_owned();

    let metadata = ImageMetadata::new(
        vec![
            Axis::new(AxisType::X, 7),
            Axis::new(AxisType::Y, 5),
            Axis::new(AxisType::Z, 3)
        ],
        PixelType::UInt16,
        ByteOrder::LittleEndian
    )
    .unwrap();

    let mut rng = WyRand::new_seed(0x91a_aa2);
    let full = metadata.full_region();
    let plane_bytes = 7 * 5 * 2;
    let planes: Vec<Vec<u8>> = (0..3)
        .map(|_| {
            let mut bytes = vec![0_u8; plane_bytes];
            for byte in bytes.iter_mut() {
                *byte = rng.generate();
            }
            bytes
        })
        .collect();

    let ctx = Context::with_default_formats();
    let mut writer = ctx.open_writer(&id, metadata).unwrap();
    for (plane, bytes) in planes.iter().enumerate() {
        writer.save_plane(0, plane, full, bytes).unwrap();
    }
    writer.close().unwrap();

    let mut reader = ctx.open_reader(&id, &ReadOptions::default()).unwrap();
    for (plane, bytes) in planes.iter().enumerate() {
        assert_eq!(reader.open_full_plane(0, plane).unwrap().bytes(), &bytes[..]);
    }
    reader.close().unwrap();

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn writer_rejects_wrong_buffer_sizes() {
    let path = temp_path("mismatch.mha");
    let id = path.to_string_lossy().into_owned();

    let metadata = ImageMetadata::new(
        vec![Axis::new(AxisType::X, 4), Axis::new(AxisType::Y, 4)],
        PixelType::UInt8,
        ByteOrder::BigEndian
    )
    .unwrap();

    let ctx = Context::with_default_formats();
    let mut writer = ctx.open_writer(&id, metadata.clone()).unwrap();
    let result = writer.save_plane(0, 0, metadata.full_region(), &[0; 3]);
    assert!(matches!(result, Err(ImageErrors::BufferMismatch(16, 3))));
    writer.close().unwrap();

    std::fs::remove_file(&path).unwrap();
}
