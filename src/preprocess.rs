//! Image preprocessing into the detector's input tensor.

use ndarray::{Array3, ArrayView3};
use tracing::debug;

use crate::config::InputConfig;
use crate::error::Result;
use crate::raster;

/// Resize so the shorter edge matches `short_edge_length`, capping the longer
/// edge at `max_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeShortestEdge {
    short_edge_length: u32,
    max_size: u32,
}

impl ResizeShortestEdge {
    pub fn new(short_edge_length: u32, max_size: u32) -> Self {
        Self {
            short_edge_length,
            max_size,
        }
    }

    /// Test-time resize policy of a detector input config.
    pub fn from_config(config: &InputConfig) -> Self {
        Self::new(config.min_size_test, config.max_size_test)
    }

    /// Output (height, width) for an input of `height` x `width`.
    pub fn output_shape(&self, height: usize, width: usize) -> (usize, usize) {
        let (h, w) = (height as f64, width as f64);
        let size = self.short_edge_length as f64;
        let scale = size / h.min(w);
        let (mut new_h, mut new_w) = if h < w {
            (size, scale * w)
        } else {
            (scale * h, size)
        };

        let max_size = self.max_size as f64;
        let longest = new_h.max(new_w);
        if longest > max_size {
            let scale = max_size / longest;
            new_h *= scale;
            new_w *= scale;
        }

        ((new_h + 0.5) as usize, (new_w + 0.5) as usize)
    }

    pub fn apply_image(&self, image: &ArrayView3<'_, u8>) -> Result<Array3<u8>> {
        let (height, width) = raster::image_size(image)?;
        let (new_h, new_w) = self.output_shape(height, width);
        raster::resize_image(image, new_h, new_w)
    }
}

/// Channel-first `f32` image tensor fed to the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Array3<f32>,
    requires_grad: bool,
}

impl InputTensor {
    /// Convert an (H, W, C) raster into a (C, H, W) tensor.
    pub fn from_hwc(image: &ArrayView3<'_, u8>) -> Self {
        let data = image
            .mapv(f32::from)
            .permuted_axes([2, 0, 1])
            .as_standard_layout()
            .into_owned();
        Self {
            data,
            requires_grad: false,
        }
    }

    /// Mark the tensor as a gradient source for the backward pass.
    pub fn requires_grad_(mut self, requires_grad: bool) -> Self {
        self.requires_grad = requires_grad;
        self
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// (channels, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }
}

/// Model input: the resized tensor plus the size detections are reported in.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub image: InputTensor,
    pub height: usize,
    pub width: usize,
}

/// Per-call working state between preprocessing and explanation.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub image: Array3<u8>,
    pub height: usize,
    pub width: usize,
    pub input: ModelInput,
}

/// Validate, resize and convert `image` into a gradient-tracking model input.
pub fn prepare(image: &ArrayView3<'_, u8>, resize: &ResizeShortestEdge) -> Result<PreparedImage> {
    let (height, width) = raster::image_size(image)?;
    let resized = resize.apply_image(image)?;
    let tensor = InputTensor::from_hwc(&resized.view()).requires_grad_(true);
    debug!(
        height,
        width,
        input_height = tensor.dim().1,
        input_width = tensor.dim().2,
        "preprocessed image"
    );

    Ok(PreparedImage {
        image: image.to_owned(),
        height,
        width,
        input: ModelInput {
            image: tensor,
            height,
            width,
        },
    })
}
