//! Shared synthetic-frame helpers for image-based unit tests.

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Render a synthetic washer (annulus) image.
///
/// Pixels at distance `d` from `center` satisfy:
/// - `ring_pix`  if `inner_radius <= d <= outer_radius`
/// - `bg_pix`    otherwise
pub(crate) fn draw_washer_gray(
    w: u32,
    h: u32,
    center: [f32; 2],
    outer_radius: f32,
    inner_radius: f32,
    ring_pix: u8,
    bg_pix: u8,
) -> GrayImage {
    let mut img = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - center[0];
            let dy = y as f32 - center[1];
            let d = (dx * dx + dy * dy).sqrt();
            let pix = if d >= inner_radius && d <= outer_radius {
                ring_pix
            } else {
                bg_pix
            };
            img.put_pixel(x, y, Luma([pix]));
        }
    }
    img
}

/// Stamp a filled disk onto an existing grayscale image.
pub(crate) fn stamp_disk(img: &mut GrayImage, center: [f32; 2], radius: f32, pix: u8) {
    let (w, h) = img.dimensions();
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - center[0];
            let dy = y as f32 - center[1];
            if (dx * dx + dy * dy).sqrt() <= radius {
                img.put_pixel(x, y, Luma([pix]));
            }
        }
    }
}

/// Expand a grayscale frame into the RGB frame the station boundary expects.
pub(crate) fn rgb_from_gray(gray: &GrayImage) -> RgbImage {
    let (w, h) = gray.dimensions();
    let mut rgb = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let v = gray.get_pixel(x, y)[0];
            rgb.put_pixel(x, y, Rgb([v, v, v]));
        }
    }
    rgb
}

/// Bright washer on dark background, as an RGB frame.
pub(crate) fn washer_frame(
    w: u32,
    h: u32,
    center: [f32; 2],
    outer_radius: f32,
    inner_radius: f32,
) -> RgbImage {
    rgb_from_gray(&draw_washer_gray(
        w,
        h,
        center,
        outer_radius,
        inner_radius,
        230,
        20,
    ))
}
