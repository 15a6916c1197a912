use super::*;

fn solid(width: u32, height: u32, px: [u8; 4]) -> Raster {
    Raster::from_rgba_image(image::RgbaImage::from_pixel(width, height, image::Rgba(px)))
}

#[test]
fn allocate_rejects_empty_and_oversized_canvases() {
    let backend = CpuBackend::new(CpuBackendOpts {
        max_canvas_pixels: 100,
        ..CpuBackendOpts::default()
    });
    let err = backend.allocate(ImageSize::new(0, 10)).unwrap_err();
    assert!(matches!(err, CompositeError::CanvasUnavailable(_)));
    let err = backend.allocate(ImageSize::new(11, 10)).unwrap_err();
    assert!(matches!(err, CompositeError::CanvasUnavailable(_)));

    let canvas = backend.allocate(ImageSize::new(10, 10)).unwrap();
    assert!(canvas.data.iter().all(|b| *b == 0));
}

#[test]
fn unscaled_opaque_draw_copies_pixels() {
    let mut dst = solid(4, 4, [0, 0, 0, 0]);
    let src = solid(4, 4, [10, 20, 30, 255]);
    draw_scaled(&mut dst, &src, Rect::new(0.0, 0.0, 4.0, 4.0), 1.0).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn aligned_scaled_draw_only_touches_dest_rect() {
    let mut dst = solid(10, 10, [0, 0, 255, 255]);
    let src = solid(4, 2, [255, 0, 0, 255]);
    draw_scaled(&mut dst, &src, Rect::new(4.0, 6.0, 8.0, 8.0), 0.9).unwrap();

    for y in 0..10 {
        for x in 0..10 {
            let inside = (4..8).contains(&x) && (6..8).contains(&y);
            let expected = if inside {
                [230, 0, 25, 255]
            } else {
                [0, 0, 255, 255]
            };
            assert_eq!(dst.pixel(x, y), Some(expected), "pixel ({x}, {y})");
        }
    }
}

#[test]
fn fractional_edges_blend_partially() {
    let mut dst = solid(4, 1, [0, 0, 0, 255]);
    let src = solid(1, 1, [255, 255, 255, 255]);
    draw_scaled(&mut dst, &src, Rect::new(1.5, 0.0, 3.0, 1.0), 1.0).unwrap();

    assert_eq!(dst.pixel(0, 0), Some([0, 0, 0, 255]));
    let half = dst.pixel(1, 0).unwrap();
    assert!((i32::from(half[0]) - 128).abs() <= 1, "{half:?}");
    assert_eq!(dst.pixel(2, 0), Some([255, 255, 255, 255]));
    assert_eq!(dst.pixel(3, 0), Some([0, 0, 0, 255]));
}

#[test]
fn downscale_averages_source_region() {
    let mut src = solid(2, 1, [0, 0, 0, 255]);
    src.data[4..8].copy_from_slice(&[200, 200, 200, 255]);
    let mut dst = solid(1, 1, [0, 0, 0, 0]);
    draw_scaled(&mut dst, &src, Rect::new(0.0, 0.0, 1.0, 1.0), 1.0).unwrap();
    assert_eq!(dst.pixel(0, 0), Some([100, 100, 100, 255]));
}

#[test]
fn draw_outside_canvas_is_noop() {
    let mut dst = solid(4, 4, [1, 2, 3, 255]);
    let before = dst.clone();
    let src = solid(2, 2, [255, 0, 0, 255]);
    draw_scaled(&mut dst, &src, Rect::new(10.0, 10.0, 12.0, 12.0), 1.0).unwrap();
    assert_eq!(dst, before);
}

#[test]
fn non_finite_rect_is_rejected() {
    let mut dst = solid(4, 4, [0, 0, 0, 255]);
    let src = solid(2, 2, [255, 0, 0, 255]);
    let err = draw_scaled(&mut dst, &src, Rect::new(0.0, 0.0, f64::NAN, 2.0), 1.0).unwrap_err();
    assert!(matches!(err, CompositeError::Validation(_)));
}

#[test]
fn encode_png_round_trips_through_image() {
    let backend = CpuBackend::default();
    let raster = solid(3, 5, [1, 2, 3, 200]);
    let png = backend.encode_png(&raster).unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (3, 5));
    assert_eq!(decoded.get_pixel(2, 4).0, [1, 2, 3, 200]);
}

#[test]
fn unscaled_copy_onto_empty_canvas_keeps_translucent_bytes() {
    let mut dst = Raster::new_transparent(2, 1).unwrap();
    let mut src = solid(2, 1, [200, 100, 50, 77]);
    src.data[4..8].copy_from_slice(&[3, 250, 9, 1]);
    draw_scaled(&mut dst, &src, Rect::new(0.0, 0.0, 2.0, 1.0), 1.0).unwrap();
    assert_eq!(dst, src);
}
