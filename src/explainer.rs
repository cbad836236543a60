//! ImageExplainer: Grad-CAM explanations for the detections of one image.

use ndarray::{Array3, ArrayView3};
use serde::Serialize;
use tracing::info;

use crate::cam::{CamAlgorithm, CamOutput};
use crate::config::ExplainerConfig;
use crate::error::Result;
use crate::metadata::MetadataCatalog;
use crate::model::{GradModel, Instances};
use crate::preprocess::{self, PreparedImage, ResizeShortestEdge};
use crate::raster::Heatmap;

/// Explanation of one detected instance.
#[derive(Debug, Clone, Serialize)]
pub struct ExplanationResult {
    /// Original input image, (height, width, 3).
    pub image: Array3<u8>,
    /// Class activation map resized to the original image, (height, width).
    pub cam: Heatmap,
    /// Detections produced by the model.
    pub output: Instances,
    /// Class name of the explained instance.
    pub label: String,
}

/// Connects a detection model to a Grad-CAM style explanation algorithm.
///
/// The explainer borrows the model and never mutates it outside the hooks an
/// algorithm registers for the duration of one [`explain`](Self::explain)
/// call. Hook state lives on the model, so explaining concurrently with one
/// model requires external synchronization: use one explainer/model pair per
/// worker.
pub struct ImageExplainer<'m, M: GradModel + ?Sized> {
    config: ExplainerConfig,
    model: &'m M,
    catalog: MetadataCatalog,
    resize: ResizeShortestEdge,
}

impl<'m, M: GradModel + ?Sized> ImageExplainer<'m, M> {
    /// Create an explainer that names classes with the built-in COCO catalog.
    pub fn new(config: ExplainerConfig, model: &'m M) -> Self {
        let resize = ResizeShortestEdge::from_config(&config.input);
        Self {
            config,
            model,
            catalog: MetadataCatalog::builtin(),
            resize,
        }
    }

    /// Replace the metadata catalog used to resolve labels.
    pub fn with_catalog(mut self, catalog: MetadataCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &ExplainerConfig {
        &self.config
    }

    pub fn model(&self) -> &'m M {
        self.model
    }

    pub fn catalog(&self) -> &MetadataCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut MetadataCatalog {
        &mut self.catalog
    }

    pub(crate) fn preprocess(&self, image: &ArrayView3<'_, u8>) -> Result<PreparedImage> {
        preprocess::prepare(image, &self.resize)
    }

    /// Explain why the model detected `target_instance` in `image`.
    ///
    /// `algorithm` builds the explanation algorithm for the model and
    /// `layer_name`; pass `GradCam::new` or `GradCamPlusPlus::new`. Grad-CAM++
    /// tends to do better when the image holds several objects of the same
    /// class.
    ///
    /// Returns the explanation and the raw heatmap at the layer's resolution.
    ///
    /// # Errors
    /// - [`Error::InvalidImage`](crate::Error::InvalidImage) for a malformed image
    /// - [`Error::LayerNotFound`](crate::Error::LayerNotFound) for an unknown layer
    /// - [`Error::InstanceOutOfRange`](crate::Error::InstanceOutOfRange) when
    ///   `target_instance` exceeds the detections
    /// - [`Error::DatasetNotRegistered`](crate::Error::DatasetNotRegistered) when
    ///   the training dataset has no metadata
    pub fn explain<A, F>(
        &self,
        image: ArrayView3<'_, u8>,
        target_instance: usize,
        layer_name: &str,
        algorithm: F,
    ) -> Result<(ExplanationResult, Heatmap)>
    where
        A: CamAlgorithm<Model = M>,
        F: FnOnce(&'m M, &str) -> A,
    {
        let prepared = self.preprocess(&image)?;
        let method = algorithm(self.model, layer_name);

        // Hooks are released when `hooks` drops, on success and on error.
        let CamOutput {
            cam,
            cam_orig,
            output,
        } = {
            let hooks = method.acquire()?;
            method.compute(&hooks, &prepared.input, target_instance)?
        };

        let label = self.label_for(&output, target_instance)?;
        info!(
            layer = layer_name,
            target_instance,
            label = %label,
            detections = output.len(),
            "explained detection"
        );

        Ok((
            ExplanationResult {
                image: prepared.image,
                cam,
                output,
                label,
            },
            cam_orig,
        ))
    }

    /// Class name of `target_instance` in the configured training dataset.
    fn label_for(&self, output: &Instances, target_instance: usize) -> Result<String> {
        let class_id = output.pred_class(target_instance)?;
        let metadata = self.catalog.get(self.config.train_dataset()?)?;
        Ok(metadata.class_name(class_id)?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cam::GradCam;
    use crate::error::Error;
    use crate::metadata::Metadata;
    use crate::model::{HookHandle, InstanceBuilder, LayerCapture};
    use crate::preprocess::ModelInput;

    #[derive(Debug, thiserror::Error)]
    #[error("mock failure")]
    struct MockError;

    /// Reports one instance of class `class_id` with a uniform capture.
    struct MockModel {
        class_id: usize,
    }

    impl GradModel for MockModel {
        type Error = MockError;

        fn has_layer(&self, name: &str) -> bool {
            name == "backbone.res5"
        }

        fn register_hooks(&self, _layer_name: &str) -> Result<HookHandle, MockError> {
            Ok(HookHandle::next())
        }

        fn remove_hooks(&self, _handle: HookHandle) {}

        fn forward(&self, input: &ModelInput) -> Result<Instances, MockError> {
            let mut instances = Instances::new((input.height, input.width));
            instances.push(
                InstanceBuilder::new()
                    .xyxy(0.0, 0.0, input.width as f32, input.height as f32)
                    .score(0.99)
                    .class_id(self.class_id)
                    .build(),
            );
            Ok(instances)
        }

        fn backward(&self, _handle: HookHandle, _target: usize) -> Result<LayerCapture, MockError> {
            let activations = Array3::from_shape_fn((1, 2, 3), |(_, y, x)| (y * 3 + x) as f32);
            LayerCapture::new(activations, Array3::ones((1, 2, 3))).map_err(|_| MockError)
        }
    }

    #[test]
    fn test_preprocess_uses_config_bounds() {
        let model = MockModel { class_id: 0 };
        let mut config = ExplainerConfig::default();
        config.input.min_size_test = 32;
        config.input.max_size_test = 40;
        let explainer = ImageExplainer::new(config, &model);

        let image = Array3::<u8>::zeros((30, 60, 3));
        let prepared = explainer.preprocess(&image.view()).unwrap();
        assert_eq!(prepared.input.image.dim(), (3, 20, 40));
        assert_eq!((prepared.input.height, prepared.input.width), (30, 60));
    }

    #[test]
    fn test_explain_assembles_result() {
        let model = MockModel { class_id: 2 };
        let explainer = ImageExplainer::new(ExplainerConfig::default(), &model);
        let image = Array3::<u8>::from_elem((24, 32, 3), 128);

        let (result, raw) = explainer
            .explain(image.view(), 0, "backbone.res5", GradCam::new)
            .unwrap();

        assert_eq!(result.image, image);
        assert_eq!(result.cam.dim(), (24, 32));
        assert_eq!(raw.dim(), (2, 3));
        assert_eq!(raw[[1, 2]], 1.0);
        assert_eq!(result.label, "car");
        assert_eq!(result.output.len(), 1);
    }

    #[test]
    fn test_custom_catalog() {
        let model = MockModel { class_id: 0 };
        let mut config = ExplainerConfig::default();
        config.datasets.train = vec!["balloon_train".to_string()];
        let mut catalog = MetadataCatalog::new();
        catalog
            .register(Metadata::new("balloon_train", ["balloon"]))
            .unwrap();
        let explainer = ImageExplainer::new(config, &model).with_catalog(catalog);

        let image = Array3::<u8>::zeros((8, 8, 3));
        let (result, _) = explainer
            .explain(image.view(), 0, "backbone.res5", GradCam::new)
            .unwrap();
        assert_eq!(result.label, "balloon");
    }

    #[test]
    fn test_unregistered_dataset() {
        let model = MockModel { class_id: 0 };
        let mut config = ExplainerConfig::default();
        config.datasets.train = vec!["unknown_train".to_string()];
        let explainer = ImageExplainer::new(config, &model);

        let image = Array3::<u8>::zeros((8, 8, 3));
        let err = explainer
            .explain(image.view(), 0, "backbone.res5", GradCam::new)
            .unwrap_err();
        assert!(matches!(err, Error::DatasetNotRegistered(name) if name == "unknown_train"));
    }

    #[test]
    fn test_class_outside_dataset() {
        let model = MockModel { class_id: 80 };
        let explainer = ImageExplainer::new(ExplainerConfig::default(), &model);
        let image = Array3::<u8>::zeros((8, 8, 3));
        let err = explainer
            .explain(image.view(), 0, "backbone.res5", GradCam::new)
            .unwrap_err();
        assert!(matches!(err, Error::ClassOutOfRange { class_id: 80, .. }));
    }
}
