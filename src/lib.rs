//! Grad-CAM and Grad-CAM++ explanations for object detection models.
//!
//! [`ImageExplainer`] resizes an image to the detector's input bounds, runs an
//! explanation algorithm against one detected instance at a named layer, and
//! returns the heatmap together with the detections and the instance's class
//! name.
//!
//! ```ignore
//! use det_gradcam::{ExplainerConfig, GradCam, ImageExplainer};
//!
//! let explainer = ImageExplainer::new(ExplainerConfig::default(), &model);
//! let (result, raw_cam) = explainer.explain(image.view(), 0, "backbone.res5", GradCam::new)?;
//! println!("{}: {:?}", result.label, result.cam.dim());
//! ```

pub mod cam;
pub mod config;
pub mod error;
pub mod explainer;
pub mod metadata;
pub mod model;
pub mod preprocess;
pub mod raster;
pub mod render;

pub use cam::{CamAlgorithm, CamOutput, GradCam, GradCamPlusPlus};
pub use config::{ExplainerConfig, PixelFormat};
pub use error::{Error, Result};
pub use explainer::{ExplanationResult, ImageExplainer};
pub use metadata::{Metadata, MetadataCatalog};
pub use model::{
    BoundingBox, GradModel, HookGuard, HookHandle, Instance, InstanceBuilder, Instances,
    LayerCapture,
};
pub use preprocess::{InputTensor, ModelInput, ResizeShortestEdge};
pub use raster::Heatmap;
pub use render::HeatmapOverlay;

#[cfg(feature = "burn-backend")]
pub use model::{BurnDetections, BurnGradModel, BurnModelError, SplitModel};
