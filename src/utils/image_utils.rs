//! Quicklook image helpers
//!
//! Turns band samples read from a container into an 8-bit RGB image with
//! the `image` crate.

use image::{ImageBuffer, Rgb, RgbImage};

use crate::errors::{SpotError, SpotResult};

/// Reduces machine-order samples to 8 bits
///
/// Two-byte samples keep their high byte.
pub fn to_8bit(samples: &[u8], sample_bytes: u32) -> Vec<u8> {
    if sample_bytes == 2 {
        samples
            .chunks_exact(2)
            .map(|pair| (u16::from_ne_bytes([pair[0], pair[1]]) >> 8) as u8)
            .collect()
    } else {
        samples.to_vec()
    }
}

/// Builds an RGB image from three 8-bit planes of `width * height` samples
pub fn compose_rgb(width: u32, height: u32, red: &[u8], green: &[u8], blue: &[u8]) -> SpotResult<RgbImage> {
    let len = width as usize * height as usize;
    if red.len() != len || green.len() != len || blue.len() != len {
        return Err(SpotError::InvalidWindow(format!(
            "planes of {}/{}/{} samples for a {}x{} image",
            red.len(),
            green.len(),
            blue.len(),
            width,
            height
        )));
    }
    Ok(ImageBuffer::from_fn(width, height, |x, y| {
        let i = (y * width + x) as usize;
        Rgb([red[i], green[i], blue[i]])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_8bit() {
        let samples: Vec<u8> = [0x1234u16, 0xFF00].iter().flat_map(|v| v.to_ne_bytes()).collect();
        assert_eq!(to_8bit(&samples, 2), vec![0x12, 0xFF]);
        assert_eq!(to_8bit(&[1, 2, 3], 1), vec![1, 2, 3]);
    }

    #[test]
    fn test_compose_rgb() {
        let image = compose_rgb(2, 1, &[1, 2], &[3, 4], &[5, 6]).unwrap();
        assert_eq!(image.get_pixel(1, 0), &Rgb([2, 4, 6]));
        assert!(compose_rgb(2, 2, &[1, 2], &[3, 4], &[5, 6]).is_err());
    }
}
