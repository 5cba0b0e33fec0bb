/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! Identification tests: determinism, priority order and the
//! unsupported/corrupt distinction

use planar_core::options::ReadOptions;
use planar_image::context::Context;
use planar_image::errors::ImageErrors;
use planar_image::formats::FormatRegistry;

use crate::mha_bytes;

#[test]
fn identical_bytes_identify_identically() {
    let ctx = Context::with_default_formats();
    let bytes = mha_bytes(&[2, 2], 1, "MET_UCHAR", false, &[0; 4]);
    ctx.map_bytes("a.mha", bytes.clone());
    ctx.map_bytes("b.mha", bytes);

    let first = ctx.identify("a.mha").unwrap();
    let second = ctx.identify("a.mha").unwrap();
    let sibling = ctx.identify("b.mha").unwrap();

    assert_eq!(first.name, "MetaImage");
    assert_eq!(first.name, second.name);
    assert_eq!(first.name, sibling.name);
}

#[test]
fn magic_bytes_win_over_a_missing_suffix() {
    let ctx = Context::with_default_formats();
    // no recognizable suffix at all, the content decides
    ctx.map_bytes(
        "blob.dat",
        mha_bytes(&[2, 2], 1, "MET_UCHAR", false, &[0; 4])
    );

    assert_eq!(ctx.identify("blob.dat").unwrap().name, "MetaImage");
}

#[test]
fn unsupported_is_distinct_from_corrupt() {
    let ctx = Context::with_default_formats();

    // garbage with no matching suffix: identification itself fails
    ctx.map_bytes("noise.bin", vec![0xde, 0xad, 0xbe, 0xef]);
    assert!(matches!(
        ctx.identify("noise.bin"),
        Err(ImageErrors::UnidentifiedFormat(_))
    ));

    // garbage wearing a recognized suffix: identification succeeds by
    // suffix, the parse then fails with a format error
    ctx.map_bytes("noise.mha", vec![0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(ctx.identify("noise.mha").unwrap().name, "MetaImage");
    assert!(matches!(
        ctx.parse("noise.mha", &ReadOptions::default()),
        Err(ImageErrors::FormatErrorsOwned(_))
    ));
}

#[test]
fn registry_order_is_the_tie_break() {
    let ctx = Context::with_default_formats();

    let formats: Vec<&str> = ctx.registry().formats().iter().map(|f| f.name).collect();
    // containers come before leaf formats on purpose
    assert_eq!(formats, vec!["gzip", "MetaImage", "Portable graymap", "Pattern"]);
}

#[test]
fn independent_contexts_do_not_share_mappings() {
    let first = Context::with_default_formats();
    let second = Context::new(FormatRegistry::with_default_formats());

    first.map_bytes("only-here.pattern", b"#pattern\naxes = X:2, Y:2\ntype = uint8\n".to_vec());

    assert!(first.identify("only-here.pattern").is_ok());
    assert!(second.identify("only-here.pattern").is_err());
}

#[test]
fn unmapping_forgets_the_resource() {
    let ctx = Context::with_default_formats();
    ctx.map_bytes("gone.pattern", b"#pattern\naxes = X:2, Y:2\ntype = uint8\n".to_vec());

    assert!(ctx.identify("gone.pattern").is_ok());
    ctx.unmap("gone.pattern");
    assert!(ctx.identify("gone.pattern").is_err());
}
