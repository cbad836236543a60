//! Hook registrations on a model layer and what they capture.

use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array3;
use tracing::{debug, trace};

use super::GradModel;
use crate::error::{Error, Result};

/// Global hook ID counter for unique handle generation.
static HOOK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifier of one hook registration on a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(u64);

impl HookHandle {
    /// Allocate a handle that is unique for the lifetime of the process.
    pub fn next() -> Self {
        Self(HOOK_ID_COUNTER.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Activations and gradients captured at a layer, each shaped (C, h, w).
#[derive(Debug, Clone, PartialEq)]
pub struct LayerCapture {
    activations: Array3<f32>,
    gradients: Array3<f32>,
}

impl LayerCapture {
    pub fn new(activations: Array3<f32>, gradients: Array3<f32>) -> Result<Self> {
        if activations.dim() != gradients.dim() {
            let (ac, ah, aw) = activations.dim();
            let (gc, gh, gw) = gradients.dim();
            return Err(Error::CaptureShape {
                activations: [ac, ah, aw],
                gradients: [gc, gh, gw],
            });
        }
        Ok(Self {
            activations,
            gradients,
        })
    }

    pub fn activations(&self) -> &Array3<f32> {
        &self.activations
    }

    pub fn gradients(&self) -> &Array3<f32> {
        &self.gradients
    }

    /// Feature-map resolution (h, w) of the captured layer.
    pub fn resolution(&self) -> (usize, usize) {
        let (_, h, w) = self.activations.dim();
        (h, w)
    }
}

/// Hooks registered on a model layer, removed again when the guard drops.
pub struct HookGuard<'m, M: GradModel + ?Sized> {
    model: &'m M,
    handle: HookHandle,
    layer_name: String,
}

impl<'m, M: GradModel + ?Sized> HookGuard<'m, M> {
    /// Register hooks on `layer_name`, failing when the model has no such layer.
    pub fn register(model: &'m M, layer_name: &str) -> Result<Self> {
        if !model.has_layer(layer_name) {
            return Err(Error::LayerNotFound(layer_name.to_string()));
        }
        let handle = model.register_hooks(layer_name).map_err(Error::model)?;
        debug!(layer = layer_name, hook = handle.id(), "registered gradient hooks");
        Ok(Self {
            model,
            handle,
            layer_name: layer_name.to_string(),
        })
    }

    pub fn handle(&self) -> HookHandle {
        self.handle
    }

    pub fn layer_name(&self) -> &str {
        &self.layer_name
    }

    pub fn model(&self) -> &'m M {
        self.model
    }
}

impl<M: GradModel + ?Sized> Drop for HookGuard<'_, M> {
    fn drop(&mut self) {
        self.model.remove_hooks(self.handle);
        trace!(layer = %self.layer_name, hook = self.handle.id(), "removed gradient hooks");
    }
}
