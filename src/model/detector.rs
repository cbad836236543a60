//! Trait for detection models that expose layer activations and gradients.

use super::{HookHandle, Instances, LayerCapture};
use crate::preprocess::ModelInput;

/// Trait for detection models usable with Grad-CAM.
///
/// The model owns the gradient-capture mechanism: `register_hooks` starts
/// recording the activations of a named layer on every `forward`, and
/// `backward` backpropagates one instance score from the most recent forward
/// pass and returns what the hooks captured. Methods take `&self`, so
/// implementations keep hook state behind interior mutability. A model with
/// `RefCell` state is `!Sync`, which keeps concurrent explanations on one
/// model out unless the implementation isolates hooks itself.
///
/// # Example
///
/// ```ignore
/// use det_gradcam::{GradModel, HookHandle, Instances, LayerCapture, ModelInput};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl GradModel for MyDetector {
///     type Error = std::io::Error;
///
///     fn has_layer(&self, name: &str) -> bool {
///         name == "backbone.res5"
///     }
///     // ...
/// }
/// ```
pub trait GradModel {
    /// Error type for model failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether `name` resolves to a submodule of the model.
    fn has_layer(&self, name: &str) -> bool;

    /// Start capturing activations and gradients at `layer_name`.
    fn register_hooks(&self, layer_name: &str) -> Result<HookHandle, Self::Error>;

    /// Stop capturing for `handle`. Unknown handles are ignored.
    fn remove_hooks(&self, handle: HookHandle);

    /// Run inference, reporting boxes in `input.height` x `input.width`.
    fn forward(&self, input: &ModelInput) -> Result<Instances, Self::Error>;

    /// Backpropagate the score of `target_instance` from the last forward pass
    /// and return the activations and gradients captured for `handle`.
    fn backward(&self, handle: HookHandle, target_instance: usize)
    -> Result<LayerCapture, Self::Error>;
}
