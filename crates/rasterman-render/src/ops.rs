//! Per-pixel filter operations on RGBA buffers.
//!
//! Each operation consumes its input and returns the filtered image. Alpha
//! is preserved everywhere.

use image::{imageops, RgbaImage};

use crate::color::Color;

/// Add `value * 255` to each color channel.
pub fn brightness(image: RgbaImage, value: f32) -> RgbaImage {
    imageops::brighten(&image, (value * 255.0).round() as i32)
}

/// Contrast in `-1.0..=1.0`, pivoting around mid-gray.
pub fn contrast(mut image: RgbaImage, value: f32) -> RgbaImage {
    let c = (value * 255.0).clamp(-255.0, 255.0);
    // The classic 259-based contrast curve; 0 maps to a factor of 1.
    let factor = 259.0 * (c + 255.0) / (255.0 * (259.0 - c));

    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let adjust = |v: u8| (factor * (v as f32 - 128.0) + 128.0).round().clamp(0.0, 255.0) as u8;
        pixel.0 = [adjust(r), adjust(g), adjust(b), a];
    }
    image
}

/// Saturation in `-1.0..=1.0`; `-1.0` removes all color.
pub fn saturation(mut image: RgbaImage, value: f32) -> RgbaImage {
    let factor = 1.0 + value;
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let (nr, ng, nb) = hsv_to_rgb(h, (s * factor).clamp(0.0, 1.0), v);
        pixel.0 = [nr, ng, nb, a];
    }
    image
}

/// Rotate hue by `degrees`.
pub fn hue_rotate(mut image: RgbaImage, degrees: f32) -> RgbaImage {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let (nr, ng, nb) = hsv_to_rgb((h + degrees).rem_euclid(360.0), s, v);
        pixel.0 = [nr, ng, nb, a];
    }
    image
}

/// Gaussian blur; `amount` in `0.0..=1.0` scales with the image size.
pub fn blur(image: RgbaImage, amount: f32) -> RgbaImage {
    let longest = image.width().max(image.height()) as f32;
    let sigma = amount * longest * 0.02;
    if sigma < 0.1 {
        return image;
    }
    imageops::blur(&image, sigma)
}

/// Replace each `size` x `size` block with its average color.
pub fn pixelate(mut image: RgbaImage, size: u32) -> RgbaImage {
    if size <= 1 {
        return image;
    }
    let (width, height) = image.dimensions();

    for by in (0..height).step_by(size as usize) {
        for bx in (0..width).step_by(size as usize) {
            let x_end = (bx + size).min(width);
            let y_end = (by + size).min(height);

            let mut sum = [0u64; 4];
            for y in by..y_end {
                for x in bx..x_end {
                    for (acc, channel) in sum.iter_mut().zip(image.get_pixel(x, y).0) {
                        *acc += channel as u64;
                    }
                }
            }
            let count = ((x_end - bx) * (y_end - by)) as u64;
            let avg = sum.map(|total| (total / count) as u8);

            for y in by..y_end {
                for x in bx..x_end {
                    image.get_pixel_mut(x, y).0 = avg;
                }
            }
        }
    }
    image
}

/// Multiply color channels by `color`.
pub fn tint(mut image: RgbaImage, color: Color) -> RgbaImage {
    let mul = |v: u8, t: u8| ((v as u16 * t as u16 + 127) / 255) as u8;
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        pixel.0 = [mul(r, color.r), mul(g, color.g), mul(b, color.b), a];
    }
    image
}

/// Rec. 709 luminance grayscale.
pub fn grayscale(mut image: RgbaImage) -> RgbaImage {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let l = (0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32)
            .round()
            .clamp(0.0, 255.0) as u8;
        pixel.0 = [l, l, l, a];
    }
    image
}

/// Invert color channels.
pub fn invert(mut image: RgbaImage) -> RgbaImage {
    imageops::invert(&mut image);
    image
}

/// Convert RGB (0-255) to HSV (h: 0-360, s: 0-1, v: 0-1).
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let rf = r as f32 / 255.0;
    let gf = g as f32 / 255.0;
    let bf = b as f32 / 255.0;

    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { delta / max } else { 0.0 };
    let h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * ((gf - bf) / delta).rem_euclid(6.0)
    } else if max == gf {
        60.0 * (((bf - rf) / delta) + 2.0)
    } else {
        60.0 * (((rf - gf) / delta) + 4.0)
    };

    (h, s, max)
}

/// Convert HSV (h: 0-360, s: 0-1, v: 0-1) to RGB (0-255).
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_u8 = |f: f32| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r), to_u8(g), to_u8(b))
}
