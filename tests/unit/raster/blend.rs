use super::*;

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    let src = [200, 200, 200, 200];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [255, 255, 255, 0];
    assert_eq!(over(dst, src, 1.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_at_watermark_opacity_keeps_a_tenth_of_dst() {
    let dst = [0, 0, 255, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 0.9), [230, 0, 25, 255]);
}

#[test]
fn premultiply_opaque_is_identity() {
    assert_eq!(premultiply([12, 34, 56, 255]), [12, 34, 56, 255]);
    assert_eq!(unpremultiply([12, 34, 56, 255]), [12, 34, 56, 255]);
}

#[test]
fn premultiply_then_unpremultiply_is_close() {
    let straight = [200, 100, 50, 128];
    let back = unpremultiply(premultiply(straight));
    for c in 0..3 {
        assert!((i32::from(back[c]) - i32::from(straight[c])).abs() <= 2);
    }
    assert_eq!(back[3], 128);
}

#[test]
fn unpremultiply_transparent_clears_colour() {
    let mut buf = [5, 6, 7, 0, 64, 64, 64, 128];
    unpremultiply_in_place(&mut buf);
    assert_eq!(buf, [0, 0, 0, 0, 128, 128, 128, 128]);
}
