//! Error type shared by every stage of an explanation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by preprocessing, the explanation algorithms and label lookup.
#[derive(Debug, Error)]
pub enum Error {
    /// The image is not a non-empty (height, width, 3) raster.
    #[error("invalid image shape {shape:?}: expected (height, width, 3) with non-zero extents")]
    InvalidImage { shape: Vec<usize> },

    /// The model has no submodule with the requested name.
    #[error("layer `{0}` not found in model")]
    LayerNotFound(String),

    /// The target instance index exceeds the number of detections.
    #[error("target instance {index} out of range for {len} detected instances")]
    InstanceOutOfRange { index: usize, len: usize },

    #[error("dataset `{0}` is not registered in the metadata catalog")]
    DatasetNotRegistered(String),

    #[error("dataset `{0}` is already registered in the metadata catalog")]
    DatasetAlreadyRegistered(String),

    #[error("class id {class_id} out of range for dataset `{dataset}` with {len} classes")]
    ClassOutOfRange {
        dataset: String,
        class_id: usize,
        len: usize,
    },

    #[error("configuration lists no training dataset")]
    NoTrainDataset,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Activations and gradients captured at a layer disagree in shape.
    #[error("layer capture shape mismatch: activations {activations:?}, gradients {gradients:?}")]
    CaptureShape {
        activations: [usize; 3],
        gradients: [usize; 3],
    },

    /// Error reported by the wrapped detection model.
    #[error("model error: {0}")]
    Model(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Box a model-specific error.
    pub fn model<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Model(Box::new(err))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
