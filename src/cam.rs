//! Class activation mapping for detected instances.
//!
//! [`GradCam`] and [`GradCamPlusPlus`] share the same protocol and only differ
//! in how channels are weighted: run the model with hooks on a layer,
//! backpropagate the score of one detected instance, combine the captured
//! activations with per-channel weights, then rectify and normalise the map.

mod grad_cam;
mod weights;

pub use grad_cam::{GradCam, GradCamBase, GradCamPlusPlus};
pub use weights::{ChannelWeighting, MeanGradient, PositiveGradient};

use ndarray::{Array2, ArrayView1, ArrayView3, Axis};

use crate::error::Result;
use crate::model::{GradModel, HookGuard, Instances};
use crate::preprocess::ModelInput;
use crate::raster::Heatmap;

/// Output of one explanation algorithm call.
#[derive(Debug, Clone)]
pub struct CamOutput {
    /// Heatmap resized to the original image (height, width).
    pub cam: Heatmap,
    /// Normalised heatmap at the hooked layer's resolution.
    pub cam_orig: Heatmap,
    /// Detections of the forward pass that was explained.
    pub output: Instances,
}

/// An explanation algorithm bound to a model layer.
///
/// Hooks are acquired as a scoped [`HookGuard`] and must stay alive for the
/// duration of [`compute`](CamAlgorithm::compute).
pub trait CamAlgorithm {
    type Model: GradModel + ?Sized;

    fn layer_name(&self) -> &str;

    /// Register the hooks this algorithm reads from.
    fn acquire(&self) -> Result<HookGuard<'_, Self::Model>>;

    /// Explain `target_instance` of the detections `input` produces.
    fn compute(
        &self,
        hooks: &HookGuard<'_, Self::Model>,
        input: &ModelInput,
        target_instance: usize,
    ) -> Result<CamOutput>;
}

/// ReLU of the channel-weighted sum of activations, shaped (h, w).
pub fn weighted_activation_map(
    activations: ArrayView3<'_, f32>,
    weights: ArrayView1<'_, f32>,
) -> Array2<f32> {
    let (_, h, w) = activations.dim();
    let mut cam = Array2::<f32>::zeros((h, w));
    for (channel, &weight) in activations.axis_iter(Axis(0)).zip(weights.iter()) {
        cam.scaled_add(weight, &channel);
    }
    cam.mapv_inplace(|v| v.max(0.0));
    cam
}

/// Rescale `map` to [0, 1]. A flat map becomes all zeros.
pub fn normalize(mut map: Array2<f32>) -> Array2<f32> {
    let min = map.iter().copied().fold(f32::INFINITY, f32::min);
    map.mapv_inplace(|v| v - min);
    let max = map.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        map.mapv_inplace(|v| v / max);
    } else {
        map.fill(0.0);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, array};

    #[test]
    fn test_weighted_activation_map() {
        let mut activations = Array3::<f32>::zeros((2, 1, 3));
        activations
            .index_axis_mut(Axis(0), 0)
            .assign(&array![[1.0, 2.0, 3.0]]);
        activations
            .index_axis_mut(Axis(0), 1)
            .assign(&array![[4.0, 0.0, 0.0]]);

        let cam = weighted_activation_map(activations.view(), array![1.0, -1.0].view());
        // [1 - 4, 2, 3] rectified
        assert_eq!(cam, array![[0.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_normalize() {
        let map = normalize(array![[1.0, 3.0], [2.0, 5.0]]);
        assert_eq!(map, array![[0.0, 0.5], [0.25, 1.0]]);
    }

    #[test]
    fn test_normalize_small_magnitudes() {
        let map = normalize(array![[0.0, 1e-8], [0.0, 2e-8]]);
        assert_eq!(map, array![[0.0, 0.5], [0.0, 1.0]]);
    }

    #[test]
    fn test_normalize_flat_map() {
        let map = normalize(Array2::from_elem((2, 2), 7.0));
        assert!(map.iter().all(|&v| v == 0.0));
    }
}
