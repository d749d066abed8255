//! Integration tests: create stores on disk, write pixels, read them back.

use ndarray::{s, Array1, Array2, Array3};
use spectral_store::{
    ModelStore, SpectraReader, SpectraStore, StoreCompression, StoreConfig, StoreError,
};
use synth_common::{GridShape, OutputLayout, Pixel, PixelRegion, Polarization};

fn layout(polarization: Polarization) -> OutputLayout {
    OutputLayout {
        polarization,
        n_lambda: 5,
        lambda_zeropoint: 6302.5,
        n_model_channels: 3,
        n_depth_samples: 4,
    }
}

fn spectrum(pixel: Pixel, channels: usize) -> Array2<f64> {
    Array2::from_shape_fn((channels, 5), |(c, l)| {
        (pixel.y * 1000 + pixel.x * 10 + c) as f64 + l as f64 * 0.25
    })
}

fn wavelength() -> Array1<f64> {
    Array1::from(vec![-20.0, -10.0, 0.0, 10.0, 20.0])
}

fn small_chunks() -> StoreConfig {
    StoreConfig {
        chunk_size: 2,
        ..Default::default()
    }
}

#[test]
fn test_spectra_roundtrip_full_polarization() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("spectra.zarr");
    let grid = GridShape::new(3, 4);

    let mut store = SpectraStore::create(
        &path,
        grid,
        grid.full_region(),
        &layout(Polarization::Full),
        &small_chunks(),
    )
    .expect("Failed to create store");

    for pixel in grid.full_region().pixels() {
        store.record_wavelength(wavelength().view()).unwrap();
        store.write_pixel(pixel, spectrum(pixel, 4).view()).unwrap();
    }
    let summary = store.close().expect("Failed to close store");
    assert_eq!(summary.pixels_written, 12);
    assert_eq!(summary.shape, vec![4, 3, 5]);
    assert_eq!(summary.chunk_shape, vec![2, 2, 5]);
    assert_eq!(summary.arrays, vec!["I", "Q", "U", "V", "lambda"]);

    let reader = SpectraReader::open(&path).expect("Failed to open store");
    assert_eq!(reader.lambda_zeropoint(), Some(6302.5));
    assert_eq!(reader.channels(), vec!["I", "Q", "U", "V"]);
    assert_eq!(reader.wavelength().unwrap(), wavelength());

    let pixel = Pixel::new(2, 3);
    let read = reader.pixel(pixel).unwrap();
    let expected = spectrum(pixel, 4).mapv(|v| v as f32);
    assert_eq!(read, expected);

    let v = reader.channel("V").unwrap();
    assert_eq!(v.dim(), (4, 3, 5));
    assert_eq!(v[[1, 2, 4]], (1000 + 20 + 3) as f32 + 1.0);
}

#[test]
fn test_intensity_only_store_has_single_channel() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spectra.zarr");
    let grid = GridShape::new(2, 2);
    let config = StoreConfig {
        compression: StoreCompression::None,
        ..Default::default()
    };

    let mut store = SpectraStore::create(
        &path,
        grid,
        grid.full_region(),
        &layout(Polarization::Intensity),
        &config,
    )
    .unwrap();

    assert!(matches!(
        store.write_pixel(Pixel::new(0, 0), spectrum(Pixel::new(0, 0), 4).view()),
        Err(StoreError::ShapeMismatch(_))
    ));

    store.record_wavelength(wavelength().view()).unwrap();
    for pixel in grid.full_region().pixels() {
        store.write_pixel(pixel, spectrum(pixel, 1).view()).unwrap();
    }
    let summary = store.close().unwrap();
    assert_eq!(summary.arrays, vec!["I", "lambda"]);
    assert_eq!(summary.compression, "none");
}

#[test]
fn test_duplicate_write_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let grid = GridShape::new(2, 2);
    let mut store = SpectraStore::create(
        dir.path().join("spectra.zarr"),
        grid,
        grid.full_region(),
        &layout(Polarization::Full),
        &small_chunks(),
    )
    .unwrap();

    let pixel = Pixel::new(1, 0);
    store.write_pixel(pixel, spectrum(pixel, 4).view()).unwrap();
    assert!(matches!(
        store.write_pixel(pixel, spectrum(pixel, 4).view()),
        Err(StoreError::DuplicateWrite(p)) if p == pixel
    ));
}

#[test]
fn test_close_with_missing_pixels_fails() {
    let dir = tempfile::tempdir().unwrap();
    let grid = GridShape::new(10, 10);
    let region = PixelRegion::new(2..5, 0..10);
    let mut store = SpectraStore::create(
        dir.path().join("spectra.zarr"),
        grid,
        region.clone(),
        &layout(Polarization::Full),
        &small_chunks(),
    )
    .unwrap();

    store.record_wavelength(wavelength().view()).unwrap();
    for pixel in region.pixels().take(29) {
        store.write_pixel(pixel, spectrum(pixel, 4).view()).unwrap();
    }

    assert!(matches!(
        store.write_pixel(Pixel::new(7, 0), spectrum(Pixel::new(7, 0), 4).view()),
        Err(StoreError::OutsideRegion(_))
    ));

    match store.close() {
        Err(StoreError::MissingPixels { missing, first }) => {
            assert_eq!(missing, 1);
            assert_eq!(first, Pixel::new(4, 9));
        }
        other => panic!("expected MissingPixels, got {:?}", other.map(|s| s.pixels_written)),
    }
}

#[test]
fn test_spectral_axis_must_agree() {
    let dir = tempfile::tempdir().unwrap();
    let grid = GridShape::new(2, 2);
    let mut store = SpectraStore::create(
        dir.path().join("spectra.zarr"),
        grid,
        grid.full_region(),
        &layout(Polarization::Full),
        &small_chunks(),
    )
    .unwrap();

    store.record_wavelength(wavelength().view()).unwrap();
    store.record_wavelength(wavelength().view()).unwrap();

    let mut shifted = wavelength();
    shifted[3] += 1e-9;
    assert!(matches!(
        store.record_wavelength(shifted.view()),
        Err(StoreError::SpectralAxisMismatch { index: 3 })
    ));
}

#[test]
fn test_close_without_spectral_axis_fails() {
    let dir = tempfile::tempdir().unwrap();
    let grid = GridShape::new(1, 1);
    let mut store = SpectraStore::create(
        dir.path().join("spectra.zarr"),
        grid,
        grid.full_region(),
        &layout(Polarization::Intensity),
        &small_chunks(),
    )
    .unwrap();
    store
        .write_pixel(Pixel::new(0, 0), spectrum(Pixel::new(0, 0), 1).view())
        .unwrap();
    assert!(matches!(store.close(), Err(StoreError::MissingSpectralAxis)));
}

#[test]
fn test_existing_output_not_clobbered() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spectra.zarr");
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(path.join("keep.txt"), b"data").unwrap();
    let grid = GridShape::new(1, 1);

    let result = SpectraStore::create(
        &path,
        grid,
        grid.full_region(),
        &layout(Polarization::Full),
        &StoreConfig::default(),
    );
    assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    assert!(path.join("keep.txt").exists());

    let config = StoreConfig {
        overwrite: true,
        ..Default::default()
    };
    assert!(SpectraStore::create(&path, grid, grid.full_region(), &layout(Polarization::Full), &config).is_ok());
    assert!(!path.join("keep.txt").exists());
}

#[test]
fn test_model_store_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.zarr");
    let grid = GridShape::new(3, 2);

    let mut store = ModelStore::create(
        &path,
        grid,
        grid.full_region(),
        &layout(Polarization::Full),
        &small_chunks(),
    )
    .unwrap();

    for pixel in grid.full_region().pixels() {
        let model = Array2::from_shape_fn((3, 4), |(c, d)| {
            (pixel.y * 100 + pixel.x * 10) as f64 + c as f64 + d as f64 * 0.5
        });
        store.write_pixel(pixel, model.view()).unwrap();
    }
    let summary = store.close().unwrap();
    assert_eq!(summary.shape, vec![2, 3, 3, 4]);

    let model = SpectraReader::read_model(&path).unwrap();
    assert_eq!(model.dim(), (2, 3, 3, 4));
    assert_eq!(model[[1, 2, 1, 3]], 120.0 + 1.0 + 1.5);
}

#[test]
fn test_row_segments_match_per_pixel_writes() {
    let dir = tempfile::tempdir().unwrap();
    let grid = GridShape::new(5, 2);
    let region = PixelRegion::new(1..5, 0..2);

    let mut store = SpectraStore::create(
        dir.path().join("segments.zarr"),
        grid,
        region.clone(),
        &layout(Polarization::Full),
        &small_chunks(),
    )
    .unwrap();
    store.record_wavelength(wavelength().view()).unwrap();

    // Each row crosses a chunk boundary at x = 2 and x = 4.
    for y in region.y.clone() {
        let pixels: Vec<Pixel> = region.x.clone().map(|x| Pixel::new(x, y)).collect();
        let mut stokes = Array3::zeros((4, pixels.len(), 5));
        for (i, &pixel) in pixels.iter().enumerate() {
            stokes.slice_mut(s![.., i, ..]).assign(&spectrum(pixel, 4));
        }
        store.write_segment(pixels[0], stokes.view()).unwrap();
    }

    assert!(matches!(
        store.write_segment(Pixel::new(3, 1), Array3::zeros((4, 1, 5)).view()),
        Err(StoreError::DuplicateWrite(_))
    ));
    let summary = store.close().unwrap();
    assert_eq!(summary.pixels_written, 8);

    let reader = SpectraReader::open(dir.path().join("segments.zarr")).unwrap();
    for pixel in region.pixels() {
        assert_eq!(reader.pixel(pixel).unwrap(), spectrum(pixel, 4).mapv(|v| v as f32));
    }
    assert!(reader.pixel(Pixel::new(0, 0)).unwrap().iter().all(|v| v.is_nan()));
}

#[test]
fn test_model_segment_is_stored_pixel_major() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.zarr");
    let grid = GridShape::new(3, 1);

    let mut store = ModelStore::create(
        &path,
        grid,
        grid.full_region(),
        &layout(Polarization::Full),
        &small_chunks(),
    )
    .unwrap();

    let model = Array3::from_shape_fn((3, 3, 4), |(c, x, d)| {
        (x * 10) as f64 + c as f64 + d as f64 * 0.5
    });
    store.write_segment(Pixel::new(0, 0), model.view()).unwrap();
    store.close().unwrap();

    let read = SpectraReader::read_model(&path).unwrap();
    assert_eq!(read.dim(), (1, 3, 3, 4));
    assert_eq!(read[[0, 2, 1, 3]], 20.0 + 1.0 + 1.5);
    assert_eq!(read[[0, 1, 2, 0]], 10.0 + 2.0);
}
