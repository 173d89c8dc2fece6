//! Conversion between interleaved RGB and RGBA sample buffers.
//!
//! Both directions are index-preserving: the pixel at `(x, y)` of the input
//! lands at `(x, y)` of the output. Callers guarantee the buffers hold
//! `info.pixel_count()` pixels.

use super::{ImageInfo, RGBA_CHANNELS, RGB_CHANNELS};

/// Alpha written by [`to_rgba`].
pub const OPAQUE: u8 = 255;

pub fn to_rgba(rgb: &[u8], info: &ImageInfo) -> Vec<u8> {
    let mut rgba = vec![0; info.pixel_count() * RGBA_CHANNELS];

    for y in 0..info.height {
        for x in 0..info.width {
            let offset = info.image_offset(x, y);
            let src = offset * RGB_CHANNELS;
            let dst = offset * RGBA_CHANNELS;

            rgba[dst] = rgb[src];
            rgba[dst + 1] = rgb[src + 1];
            rgba[dst + 2] = rgb[src + 2];
            rgba[dst + 3] = OPAQUE;
        }
    }

    rgba
}

/// Drops the alpha channel.
pub fn to_rgb(rgba: &[u8], info: &ImageInfo) -> Vec<u8> {
    let mut rgb = vec![0; info.pixel_count() * RGB_CHANNELS];

    for y in 0..info.height {
        for x in 0..info.width {
            let offset = info.image_offset(x, y);
            let src = offset * RGBA_CHANNELS;
            let dst = offset * RGB_CHANNELS;

            rgb[dst] = rgba[src];
            rgb[dst + 1] = rgba[src + 1];
            rgb[dst + 2] = rgba[src + 2];
        }
    }

    rgb
}
