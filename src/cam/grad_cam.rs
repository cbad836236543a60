use std::marker::PhantomData;

use tracing::debug;

use super::{CamAlgorithm, CamOutput, ChannelWeighting, MeanGradient, PositiveGradient};
use crate::error::{Error, Result};
use crate::model::{GradModel, HookGuard};
use crate::preprocess::ModelInput;
use crate::raster;

/// Gradient-weighted class activation mapping over one model layer,
/// parameterised by its channel weighting.
pub struct GradCamBase<'m, M: GradModel + ?Sized, W> {
    model: &'m M,
    layer_name: String,
    _weighting: PhantomData<W>,
}

/// Grad-CAM (Selvaraju et al.).
pub type GradCam<'m, M> = GradCamBase<'m, M, MeanGradient>;

/// Grad-CAM++ (Chattopadhyay et al.).
pub type GradCamPlusPlus<'m, M> = GradCamBase<'m, M, PositiveGradient>;

impl<'m, M: GradModel + ?Sized, W: ChannelWeighting> GradCamBase<'m, M, W> {
    pub fn new(model: &'m M, layer_name: &str) -> Self {
        Self {
            model,
            layer_name: layer_name.to_string(),
            _weighting: PhantomData,
        }
    }

    pub fn model(&self) -> &'m M {
        self.model
    }
}

impl<'m, M: GradModel + ?Sized, W: ChannelWeighting> CamAlgorithm for GradCamBase<'m, M, W> {
    type Model = M;

    fn layer_name(&self) -> &str {
        &self.layer_name
    }

    fn acquire(&self) -> Result<HookGuard<'_, M>> {
        HookGuard::register(self.model, &self.layer_name)
    }

    fn compute(
        &self,
        hooks: &HookGuard<'_, M>,
        input: &ModelInput,
        target_instance: usize,
    ) -> Result<CamOutput> {
        let output = self.model.forward(input).map_err(Error::model)?;
        if target_instance >= output.len() {
            return Err(Error::InstanceOutOfRange {
                index: target_instance,
                len: output.len(),
            });
        }

        let capture = self
            .model
            .backward(hooks.handle(), target_instance)
            .map_err(Error::model)?;
        let weights = W::channel_weights(capture.activations().view(), capture.gradients().view());
        let cam_orig = super::normalize(super::weighted_activation_map(
            capture.activations().view(),
            weights.view(),
        ));
        let cam = raster::resize_heatmap(&cam_orig.view(), input.height, input.width)?;

        debug!(
            method = W::NAME,
            layer = %self.layer_name,
            target_instance,
            feature_height = cam_orig.nrows(),
            feature_width = cam_orig.ncols(),
            "computed class activation map"
        );

        Ok(CamOutput {
            cam,
            cam_orig,
            output,
        })
    }
}
