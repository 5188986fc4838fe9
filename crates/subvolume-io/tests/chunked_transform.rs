//! Resampling from chunked storage matches resampling from memory.

use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use subvolume_core::{
    affine_transform, build, normalize, transform, AxisSpec, BoundingBox, TransformOptions,
};
use subvolume_io::{AccessMode, ChunkContainer, ChunkedArray, Compression, NodeKind, Registry};

fn random_array(shape: &[usize], seed: u64) -> ArrayD<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    ArrayD::from_shape_simple_fn(IxDyn(shape), || rng.gen::<f64>())
}

fn assert_allclose(actual: &ArrayD<f64>, expected: &ArrayD<f64>, context: &str) {
    assert_eq!(actual.shape(), expected.shape(), "{context}");
    for ((idx, a), e) in actual.indexed_iter().zip(expected.iter()) {
        assert!(
            (a - e).abs() <= 1e-8 + 1e-5 * e.abs(),
            "{context}: at {idx:?} got {a} expected {e}"
        );
    }
}

#[test]
fn test_3d_chunked_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tmp.n5");
    let x = random_array(&[64, 64, 64], 1);

    ChunkContainer::open(&path, AccessMode::ReadWrite)
        .unwrap()
        .create_dataset("tmp", x.view(), &[16, 16, 16], Compression::Gzip { level: 1 })
        .unwrap();

    let registry = Registry::with_defaults();
    let file = registry.open(&path, AccessMode::Read).unwrap();
    assert_eq!(file.kind("tmp").unwrap(), NodeKind::Dataset);
    let source = file.dataset("tmp").unwrap();

    let matrix = build(&[1.0, 2.0, 1.0], &[15.0, 30.0, 0.0], None, None).unwrap();
    let opts = TransformOptions::new();
    let expected = affine_transform(x.view(), &matrix, &[64, 64, 64], &opts).unwrap();

    let regions: Vec<Vec<AxisSpec>> = vec![
        vec![AxisSpec::Full, AxisSpec::Full, AxisSpec::Full],
        vec![(..32).into(), (..32).into(), (..32).into()],
        vec![(1..31).into(), (5..27).into(), (3..13).into()],
        vec![(4..19).into(), AxisSpec::Full, (22..).into()],
        vec![(1..29).into()],
        vec![AxisSpec::Full, (15..27).into(), AxisSpec::Full],
        vec![AxisSpec::Full, (1..3).into(), (4..14).into()],
    ];
    for region in &regions {
        let bb = normalize(region, &[64, 64, 64]).unwrap();
        let result = transform(source.as_ref(), &matrix, &bb, &opts).unwrap();
        assert_allclose(&result, &bb.slice_of(&expected).to_owned(), &format!("box {bb}"));
    }
    file.close().unwrap();
}

#[test]
fn test_2d_chunked_in_memory() {
    let x = random_array(&[512, 512], 2);
    let chunked = ChunkedArray::from_array(x.view(), &[64, 64]).unwrap();
    let matrix = build(&[2.0, 2.0], &[45.0], None, None).unwrap();
    let opts = TransformOptions::new();
    let expected = affine_transform(x.view(), &matrix, &[512, 512], &opts).unwrap();

    let bb = BoundingBox::new(vec![0..256, 0..256]).unwrap();
    let result = transform(&chunked, &matrix, &bb, &opts).unwrap();
    assert_allclose(&result, &bb.slice_of(&expected).to_owned(), "chunked 2d");

    // Scaling by 2 from the origin: only part of the 64 chunks is needed
    assert!(chunked.chunk_reads() < 64, "read {} chunks", chunked.chunk_reads());
}

#[test]
fn test_presmoothing_chunked() {
    let dir = tempfile::tempdir().unwrap();
    let x = random_array(&[256, 256], 3);
    let container = ChunkContainer::open(dir.path().join("smooth.zarr"), AccessMode::ReadWrite).unwrap();
    let store = container
        .create_dataset("tmp", x.view(), &[64, 64], Compression::Raw)
        .unwrap();

    let matrix = build(&[2.0, 2.0], &[45.0], None, None).unwrap();
    let opts = TransformOptions::new().with_order(1).with_sigma(1.0);
    let expected = affine_transform(x.view(), &matrix, &[256, 256], &opts).unwrap();

    for bb in [
        BoundingBox::new(vec![0..128, 0..128]).unwrap(),
        BoundingBox::new(vec![37..115, 100..250]).unwrap(),
    ] {
        let result = transform(&store, &matrix, &bb, &opts).unwrap();
        assert!(result.iter().any(|v| v.abs() > 1e-6));
        assert_allclose(&result, &bb.slice_of(&expected).to_owned(), &format!("smoothed {bb}"));
    }
}

#[test]
fn test_image_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slice.png");
    let img = image::GrayImage::from_fn(40, 30, |x, y| image::Luma([((x * 7 + y * 3) % 251) as u8]));
    img.save(&path).unwrap();

    let registry = Registry::with_defaults();
    let file = registry.open(&path, AccessMode::Read).unwrap();
    let source = file.dataset("image").unwrap();
    assert_eq!(source.shape(), &[30, 40]);

    let matrix = build(&[1.0, 1.0], &[10.0], Some(&[2.0, -3.0][..]), None).unwrap();
    let opts = TransformOptions::new().with_order(1);
    let full = source.read(&BoundingBox::full(&[30, 40])).unwrap();
    let expected = affine_transform(full.view(), &matrix, &[30, 40], &opts).unwrap();

    let bb = BoundingBox::new(vec![5..20, 10..35]).unwrap();
    let result = transform(source.as_ref(), &matrix, &bb, &opts).unwrap();
    assert_allclose(&result, &bb.slice_of(&expected).to_owned(), "image");
}
