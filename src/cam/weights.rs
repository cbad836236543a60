//! Channel weighting schemes for class activation maps.

use ndarray::{Array1, ArrayView3, Axis};

/// Turns the activations and gradients captured at a layer into one weight
/// per channel.
pub trait ChannelWeighting {
    /// Short name used in logs.
    const NAME: &'static str;

    /// Weights of shape (C,) for activations/gradients of shape (C, h, w).
    fn channel_weights(
        activations: ArrayView3<'_, f32>,
        gradients: ArrayView3<'_, f32>,
    ) -> Array1<f32>;
}

/// Grad-CAM: global average of the gradients over each channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanGradient;

impl ChannelWeighting for MeanGradient {
    const NAME: &'static str = "grad-cam";

    fn channel_weights(
        _activations: ArrayView3<'_, f32>,
        gradients: ArrayView3<'_, f32>,
    ) -> Array1<f32> {
        let (channels, h, w) = gradients.dim();
        let n = (h * w).max(1) as f32;
        let sums = gradients.sum_axis(Axis(2)).sum_axis(Axis(1));
        debug_assert_eq!(sums.len(), channels);
        sums / n
    }
}

/// Grad-CAM++: positive gradients weighted by their normalised indicator.
///
/// Better at covering several occurrences of the same class in one image.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositiveGradient;

impl ChannelWeighting for PositiveGradient {
    const NAME: &'static str = "grad-cam++";

    fn channel_weights(
        _activations: ArrayView3<'_, f32>,
        gradients: ArrayView3<'_, f32>,
    ) -> Array1<f32> {
        let positive = gradients.mapv(|g| g.max(0.0));
        Array1::from_iter(positive.outer_iter().map(|channel| {
            let norm = channel.sum();
            if norm <= 0.0 {
                return 0.0;
            }
            // alpha = 1[g > 0] / sum(g), weight = sum(g * alpha)
            channel
                .iter()
                .filter(|&&g| g > 0.0)
                .map(|&g| g / norm)
                .sum()
        }))
    }
}
