//! Burn autodiff backend for Grad-CAM.
//!
//! This module provides a `BurnGradModel` that implements `GradModel` for
//! detection models built with the Burn framework. Burn has no forward hooks,
//! so the model is split at the explained layer: `forward_to` runs up to the
//! layer, the activation is detached and marked as a gradient leaf, and
//! `forward_from` finishes the pass. The leaf's gradient after
//! `score.backward()` is what a backward hook would have captured.
//!
//! # Example
//!
//! ```ignore
//! use burn::backend::{Autodiff, NdArray};
//! use det_gradcam::{BurnGradModel, SplitModel};
//!
//! // Implement SplitModel for your detection model
//! struct MyRcnn { /* ... */ }
//!
//! impl SplitModel<Autodiff<NdArray>> for MyRcnn {
//!     // ...
//! }
//!
//! let model = BurnGradModel::new(MyRcnn::load("model.bin"), Default::default());
//! ```

use std::cell::RefCell;

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use ndarray::Array3;
use thiserror::Error;

use super::{BoundingBox, GradModel, HookHandle, Instance, Instances, LayerCapture};
use crate::preprocess::ModelInput;

/// Error type for Burn model failures.
#[derive(Debug, Error)]
pub enum BurnModelError {
    #[error("layer `{0}` is not a split point of the model")]
    UnknownLayer(String),
    #[error("hook {0} is not registered")]
    UnknownHook(u64),
    #[error("backward called before a hooked forward pass")]
    NoForwardPass,
    #[error("no gradient reached layer `{0}`")]
    MissingGradient(String),
    #[error("tensor conversion failed: {0}")]
    Conversion(String),
    #[error("instance {index} out of range for {len} detections")]
    InstanceOutOfRange { index: usize, len: usize },
    #[error(
        "detections are inconsistent: {boxes} boxes, {scores} scores, {classes} classes"
    )]
    InconsistentDetections {
        boxes: usize,
        scores: usize,
        classes: usize,
    },
}

/// Detections returned by a Burn model, still attached to the autodiff graph.
#[derive(Debug, Clone)]
pub struct BurnDetections<B: Backend> {
    /// Boxes in XYXY format, shape [n, 4], in output image coordinates.
    pub boxes: Tensor<B, 2>,
    /// Confidence scores, shape [n].
    pub scores: Tensor<B, 1>,
    pub classes: Vec<usize>,
}

/// Trait for Burn detection models that can stop and resume at named layers.
///
/// Implement this trait for your specific model architecture.
pub trait SplitModel<B: AutodiffBackend> {
    /// Names of the layers the model can be split at.
    fn layer_names(&self) -> Vec<String>;

    /// Run the model on `input` ([1, C, H, W]) up to and including `layer`.
    fn forward_to(&self, input: Tensor<B, 4>, layer: &str) -> Tensor<B, 4>;

    /// Resume from the output of `layer`, reporting boxes in `height` x `width`.
    fn forward_from(
        &self,
        activation: Tensor<B, 4>,
        layer: &str,
        height: usize,
        width: usize,
    ) -> BurnDetections<B>;

    /// Full forward pass.
    fn forward(&self, input: Tensor<B, 4>, height: usize, width: usize) -> BurnDetections<B>;
}

struct HookState<B: AutodiffBackend> {
    handle: HookHandle,
    layer: String,
    activation: Option<Tensor<B, 4>>,
    scores: Option<Tensor<B, 1>>,
}

/// Burn-based detection model implementing `GradModel`.
pub struct BurnGradModel<B: AutodiffBackend, M: SplitModel<B>> {
    model: M,
    device: B::Device,
    hook: RefCell<Option<HookState<B>>>,
}

impl<B: AutodiffBackend, M: SplitModel<B>> BurnGradModel<B, M> {
    pub fn new(model: M, device: B::Device) -> Self {
        Self {
            model,
            device,
            hook: RefCell::new(None),
        }
    }

    pub fn inner(&self) -> &M {
        &self.model
    }

    fn input_tensor(&self, input: &ModelInput) -> Tensor<B, 4> {
        let (channels, height, width) = input.image.dim();
        let data: Vec<f32> = input.image.data().iter().copied().collect();
        let tensor = Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
            1,
            channels,
            height,
            width,
        ]);
        if input.image.requires_grad() {
            tensor.require_grad()
        } else {
            tensor
        }
    }
}

fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>, BurnModelError> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| BurnModelError::Conversion(format!("{e:?}")))
}

fn to_array3<B: Backend>(tensor: Tensor<B, 4>) -> Result<Array3<f32>, BurnModelError> {
    let [_, c, h, w] = tensor.dims();
    Array3::from_shape_vec((c, h, w), to_vec(tensor)?)
        .map_err(|e| BurnModelError::Conversion(e.to_string()))
}

fn to_instances<B: Backend>(
    detections: &BurnDetections<B>,
    height: usize,
    width: usize,
) -> Result<Instances, BurnModelError> {
    let boxes = to_vec(detections.boxes.clone())?;
    let scores = to_vec(detections.scores.clone())?;
    if boxes.len() != scores.len() * 4 || scores.len() != detections.classes.len() {
        return Err(BurnModelError::InconsistentDetections {
            boxes: boxes.len() / 4,
            scores: scores.len(),
            classes: detections.classes.len(),
        });
    }

    let mut instances = Instances::new((height, width));
    instances.extend(
        boxes
            .chunks_exact(4)
            .zip(scores)
            .zip(&detections.classes)
            .map(|((b, score), &class_id)| Instance {
                bbox: BoundingBox::new(b[0], b[1], b[2], b[3]),
                score,
                class_id,
            }),
    );
    Ok(instances)
}

impl<B: AutodiffBackend, M: SplitModel<B>> GradModel for BurnGradModel<B, M> {
    type Error = BurnModelError;

    fn has_layer(&self, name: &str) -> bool {
        self.model.layer_names().iter().any(|layer| layer == name)
    }

    fn register_hooks(&self, layer_name: &str) -> Result<HookHandle, Self::Error> {
        if !self.has_layer(layer_name) {
            return Err(BurnModelError::UnknownLayer(layer_name.to_string()));
        }
        let handle = HookHandle::next();
        *self.hook.borrow_mut() = Some(HookState {
            handle,
            layer: layer_name.to_string(),
            activation: None,
            scores: None,
        });
        Ok(handle)
    }

    fn remove_hooks(&self, handle: HookHandle) {
        let mut hook = self.hook.borrow_mut();
        if hook.as_ref().is_some_and(|state| state.handle == handle) {
            *hook = None;
        }
    }

    fn forward(&self, input: &ModelInput) -> Result<Instances, Self::Error> {
        let x = self.input_tensor(input);
        let mut hook = self.hook.borrow_mut();
        let detections = match hook.as_mut() {
            Some(state) => {
                let activation = self.model.forward_to(x, &state.layer).detach().require_grad();
                let detections = self.model.forward_from(
                    activation.clone(),
                    &state.layer,
                    input.height,
                    input.width,
                );
                state.activation = Some(activation);
                state.scores = Some(detections.scores.clone());
                detections
            }
            None => self.model.forward(x, input.height, input.width),
        };
        to_instances(&detections, input.height, input.width)
    }

    fn backward(
        &self,
        handle: HookHandle,
        target_instance: usize,
    ) -> Result<LayerCapture, Self::Error> {
        let hook = self.hook.borrow();
        let state = hook
            .as_ref()
            .filter(|state| state.handle == handle)
            .ok_or(BurnModelError::UnknownHook(handle.id()))?;
        let (Some(activation), Some(scores)) = (state.activation.clone(), state.scores.clone())
        else {
            return Err(BurnModelError::NoForwardPass);
        };

        let [len] = scores.dims();
        if target_instance >= len {
            return Err(BurnModelError::InstanceOutOfRange {
                index: target_instance,
                len,
            });
        }
        let score = scores.slice([target_instance..target_instance + 1]).sum();
        let grads = score.backward();
        let gradient = activation
            .grad(&grads)
            .ok_or_else(|| BurnModelError::MissingGradient(state.layer.clone()))?;

        let activations = to_array3(activation.inner())?;
        let gradients = to_array3(gradient)?;
        LayerCapture::new(activations, gradients)
            .map_err(|e| BurnModelError::Conversion(e.to_string()))
    }
}
