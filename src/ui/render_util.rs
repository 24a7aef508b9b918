use super::{Arc, ImageBuffer, ImageFrame, RenderImage, Rgba};

/// Wraps an RGBA buffer into a GPUI texture, optionally flipping it
/// horizontally for selfie-mode display.
pub(super) fn rgba_to_render_image(
    data: &[u8],
    width: u32,
    height: u32,
    mirror: bool,
) -> Option<Arc<RenderImage>> {
    let mut pixels = data.to_vec();
    if mirror {
        mirror_horizontal(&mut pixels, width);
    }

    // GPUI expects BGRA; convert in place to avoid the async asset pipeline.
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }

    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, pixels)?;
    Some(Arc::new(RenderImage::new(vec![ImageFrame::new(buffer)])))
}

fn mirror_horizontal(pixels: &mut [u8], width: u32) {
    let stride = width as usize * 4;
    if stride == 0 {
        return;
    }
    for row in pixels.chunks_exact_mut(stride) {
        let mut left = 0usize;
        let mut right = width as usize - 1;
        while left < right {
            for channel in 0..4 {
                row.swap(left * 4 + channel, right * 4 + channel);
            }
            left += 1;
            right -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mirror_horizontal;

    #[test]
    fn mirror_swaps_row_ends() {
        let mut pixels = vec![
            1, 1, 1, 255, 2, 2, 2, 255, 3, 3, 3, 255, // one 3px row
        ];
        mirror_horizontal(&mut pixels, 3);
        assert_eq!(&pixels[0..4], &[3, 3, 3, 255]);
        assert_eq!(&pixels[4..8], &[2, 2, 2, 255]);
        assert_eq!(&pixels[8..12], &[1, 1, 1, 255]);
    }
}
