//! Explainer configuration: detector input bounds and dataset identifiers.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration read by [`ImageExplainer`](crate::ImageExplainer).
///
/// Mirrors the subset of a detector config the explainer needs:
///
/// ```toml
/// [input]
/// min_size_test = 800
/// max_size_test = 1333
/// format = "BGR"
///
/// [datasets]
/// train = ["coco_2017_train"]
/// test = ["coco_2017_val"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExplainerConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub datasets: DatasetsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Target length of the shorter image edge at test time.
    pub min_size_test: u32,
    /// Upper bound on the longer image edge at test time.
    pub max_size_test: u32,
    /// Channel order of the images handed to the model.
    pub format: PixelFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetsConfig {
    pub train: Vec<String>,
    pub test: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PixelFormat {
    #[default]
    #[serde(rename = "BGR")]
    Bgr,
    #[serde(rename = "RGB")]
    Rgb,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            min_size_test: 800,
            max_size_test: 1333,
            format: PixelFormat::Bgr,
        }
    }
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            train: vec!["coco_2017_train".to_string()],
            test: vec!["coco_2017_val".to_string()],
        }
    }
}

impl ExplainerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.min_size_test == 0 {
            return Err(Error::InvalidConfig(
                "input.min_size_test must be positive".to_string(),
            ));
        }
        if self.input.max_size_test == 0 {
            return Err(Error::InvalidConfig(
                "input.max_size_test must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The first training dataset, whose metadata names the predicted classes.
    pub fn train_dataset(&self) -> Result<&str> {
        self.datasets
            .train
            .first()
            .map(String::as_str)
            .ok_or(Error::NoTrainDataset)
    }
}
