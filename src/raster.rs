//! Conversions between `ndarray` rasters and `image` buffers.

use image::{ImageBuffer, Luma, RgbImage, imageops::FilterType};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

use crate::error::{Error, Result};

/// Heatmap laid out as (height, width).
pub type Heatmap = Array2<f32>;

/// Check that `image` is a non-empty (height, width, 3) raster and return its size.
pub fn image_size(image: &ArrayView3<'_, u8>) -> Result<(usize, usize)> {
    let (height, width, channels) = image.dim();
    if height == 0 || width == 0 || channels != 3 {
        return Err(Error::InvalidImage {
            shape: image.shape().to_vec(),
        });
    }
    Ok((height, width))
}

pub(crate) fn to_rgb_image(image: &ArrayView3<'_, u8>) -> Result<RgbImage> {
    let (height, width) = image_size(image)?;
    let pixels: Vec<u8> = image.iter().copied().collect();
    RgbImage::from_raw(width as u32, height as u32, pixels).ok_or_else(|| Error::InvalidImage {
        shape: image.shape().to_vec(),
    })
}

pub(crate) fn from_rgb_image(image: RgbImage) -> Result<Array3<u8>> {
    let (width, height) = image.dimensions();
    Ok(Array3::from_shape_vec(
        (height as usize, width as usize, 3),
        image.into_raw(),
    )?)
}

/// Resize an image raster with bilinear filtering.
pub fn resize_image(image: &ArrayView3<'_, u8>, height: usize, width: usize) -> Result<Array3<u8>> {
    let rgb = to_rgb_image(image)?;
    let resized = image::imageops::resize(&rgb, width as u32, height as u32, FilterType::Triangle);
    from_rgb_image(resized)
}

/// Resize a heatmap with bilinear filtering.
pub fn resize_heatmap(map: &ArrayView2<'_, f32>, height: usize, width: usize) -> Result<Heatmap> {
    let (h, w) = map.dim();
    if (h, w) == (height, width) {
        return Ok(map.to_owned());
    }
    let values: Vec<f32> = map.iter().copied().collect();
    let buffer: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_raw(w as u32, h as u32, values)
        .ok_or_else(|| Error::InvalidImage {
            shape: vec![h, w],
        })?;
    let resized =
        image::imageops::resize(&buffer, width as u32, height as u32, FilterType::Triangle);
    Ok(Array2::from_shape_vec((height, width), resized.into_raw())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_size_rejects_malformed() {
        let four_channels = Array3::<u8>::zeros((4, 4, 4));
        assert!(matches!(
            image_size(&four_channels.view()),
            Err(Error::InvalidImage { .. })
        ));
        let empty = Array3::<u8>::zeros((0, 4, 3));
        assert!(image_size(&empty.view()).is_err());
    }

    #[test]
    fn test_rgb_image_keeps_pixel_layout() {
        let mut image = Array3::<u8>::zeros((2, 3, 3));
        image[[1, 2, 0]] = 10;
        image[[1, 2, 2]] = 30;
        let rgb = to_rgb_image(&image.view()).unwrap();
        assert_eq!(rgb.get_pixel(2, 1).0, [10, 0, 30]);
        assert_eq!(from_rgb_image(rgb).unwrap(), image);
    }

    #[test]
    fn test_resize_heatmap_shape_and_range() {
        let map = Array2::from_shape_fn((4, 5), |(y, x)| (y * 5 + x) as f32 / 19.0);
        let resized = resize_heatmap(&map.view(), 40, 64).unwrap();
        assert_eq!(resized.dim(), (40, 64));
        assert!(resized.iter().all(|v| (-1e-4..=1.0 + 1e-4).contains(v)));
    }

    #[test]
    fn test_resize_constant_heatmap_stays_constant() {
        let map = Array2::from_elem((3, 3), 0.5f32);
        let resized = resize_heatmap(&map.view(), 7, 11).unwrap();
        assert!(resized.iter().all(|v| (v - 0.5).abs() < 1e-5));
    }
}
