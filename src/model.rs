//! Model seam: detections, hook registrations and the detector trait.
//!
//! This module defines what the explainer needs from a detection model and
//! the data it exchanges with one. Inference backends (Burn, or any model with
//! its own hook mechanism) plug in by implementing [`GradModel`].

mod boxes;
mod detector;
mod hooks;
mod instances;

pub use boxes::BoundingBox;
pub use detector::GradModel;
pub use hooks::{HookGuard, HookHandle, LayerCapture};
pub use instances::{Instance, InstanceBuilder, Instances};

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnDetections, BurnGradModel, BurnModelError, SplitModel};
