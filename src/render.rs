//! Heatmap overlays for inspecting explanations.

use std::path::Path;

use image::{Rgb, RgbImage};
use ndarray::ArrayView2;

use crate::config::PixelFormat;
use crate::error::{Error, Result};
use crate::explainer::ExplanationResult;
use crate::model::BoundingBox;
use crate::raster;

const DEFAULT_ALPHA: f32 = 0.5;
const BOX_COLOR: [u8; 3] = [0, 255, 0];

/// Map a value in [0, 1] onto the jet colormap.
pub fn jet(value: f32) -> [u8; 3] {
    let v = value.clamp(0.0, 1.0);
    let channel =
        |offset: f32| ((1.5 - (4.0 * v - offset).abs()).clamp(0.0, 1.0) * 255.0).round() as u8;
    [channel(3.0), channel(2.0), channel(1.0)]
}

/// Blends a jet-coloured heatmap over the explained image.
#[derive(Debug, Clone, Copy)]
pub struct HeatmapOverlay {
    /// Heatmap opacity in [0, 1].
    alpha: f32,
    /// Outline the explained instance's box.
    draw_box: bool,
}

impl Default for HeatmapOverlay {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            draw_box: true,
        }
    }
}

impl HeatmapOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn with_box(mut self, draw_box: bool) -> Self {
        self.draw_box = draw_box;
        self
    }

    /// Render `result` as an RGB image. `format` is the channel order of
    /// `result.image`; `target_instance` selects the box to outline.
    pub fn render(
        &self,
        result: &ExplanationResult,
        format: PixelFormat,
        target_instance: usize,
    ) -> Result<RgbImage> {
        let mut canvas = raster::to_rgb_image(&result.image.view())?;
        if format == PixelFormat::Bgr {
            for pixel in canvas.pixels_mut() {
                pixel.0.swap(0, 2);
            }
        }

        self.blend(&mut canvas, &result.cam.view())?;

        if self.draw_box {
            let bbox = result.output.get(target_instance)?.bbox;
            draw_outline(&mut canvas, &bbox, BOX_COLOR);
        }
        Ok(canvas)
    }

    /// Render `result` and write it to `path`; the format follows the extension.
    pub fn save(
        &self,
        result: &ExplanationResult,
        format: PixelFormat,
        target_instance: usize,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        self.render(result, format, target_instance)?
            .save(path.as_ref())?;
        Ok(())
    }

    fn blend(&self, canvas: &mut RgbImage, cam: &ArrayView2<'_, f32>) -> Result<()> {
        let (height, width) = cam.dim();
        if (width as u32, height as u32) != canvas.dimensions() {
            return Err(Error::InvalidImage {
                shape: vec![height, width],
            });
        }
        for (x, y, pixel) in canvas.enumerate_pixels_mut() {
            let heat = jet(cam[[y as usize, x as usize]]);
            for (c, h) in pixel.0.iter_mut().zip(heat) {
                *c = ((1.0 - self.alpha) * *c as f32 + self.alpha * h as f32).round() as u8;
            }
        }
        Ok(())
    }
}

fn draw_outline(canvas: &mut RgbImage, bbox: &BoundingBox, color: [u8; 3]) {
    let (width, height) = canvas.dimensions();
    let Some((x_min, y_min, x_max, y_max)) = bbox.pixel_bounds(height as usize, width as usize)
    else {
        return;
    };
    for x in x_min..=x_max {
        canvas.put_pixel(x, y_min, Rgb(color));
        canvas.put_pixel(x, y_max, Rgb(color));
    }
    for y in y_min..=y_max {
        canvas.put_pixel(x_min, y, Rgb(color));
        canvas.put_pixel(x_max, y, Rgb(color));
    }
}
