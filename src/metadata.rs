//! Dataset metadata: class names indexed by class id.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Thing classes of the COCO detection datasets, in contiguous-id order.
pub const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Datasets whose metadata [`MetadataCatalog::builtin`] registers.
pub const COCO_DATASETS: [&str; 4] = [
    "coco_2017_train",
    "coco_2017_val",
    "coco_2014_train",
    "coco_2014_val",
];

/// Metadata of one registered dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    name: String,
    thing_classes: Vec<String>,
}

impl Metadata {
    pub fn new<I, S>(name: impl Into<String>, thing_classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            thing_classes: thing_classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thing_classes(&self) -> &[String] {
        &self.thing_classes
    }

    /// Class name for a predicted class id.
    pub fn class_name(&self, class_id: usize) -> Result<&str> {
        self.thing_classes
            .get(class_id)
            .map(String::as_str)
            .ok_or_else(|| Error::ClassOutOfRange {
                dataset: self.name.clone(),
                class_id,
                len: self.thing_classes.len(),
            })
    }
}

/// Registry of dataset metadata keyed by dataset name.
#[derive(Debug, Clone, Default)]
pub struct MetadataCatalog {
    entries: HashMap<String, Metadata>,
}

impl MetadataCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog with the COCO detection datasets registered.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for name in COCO_DATASETS {
            catalog
                .entries
                .insert(name.to_string(), Metadata::new(name, COCO_CLASSES));
        }
        catalog
    }

    /// Register `metadata` under its name. A name can be registered once.
    pub fn register(&mut self, metadata: Metadata) -> Result<()> {
        if self.entries.contains_key(metadata.name()) {
            return Err(Error::DatasetAlreadyRegistered(metadata.name().to_string()));
        }
        self.entries.insert(metadata.name().to_string(), metadata);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Metadata> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::DatasetNotRegistered(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Option<Metadata> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered dataset names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_coco() {
        let catalog = MetadataCatalog::builtin();
        let meta = catalog.get("coco_2017_train").unwrap();
        assert_eq!(meta.thing_classes().len(), 80);
        assert_eq!(meta.class_name(0).unwrap(), "person");
        assert_eq!(meta.class_name(79).unwrap(), "toothbrush");
        assert_eq!(catalog.names().len(), COCO_DATASETS.len());
    }

    #[test]
    fn test_register_and_lookup() {
        let mut catalog = MetadataCatalog::new();
        catalog
            .register(Metadata::new("balloon_train", ["balloon"]))
            .unwrap();
        assert!(catalog.contains("balloon_train"));
        assert_eq!(
            catalog.get("balloon_train").unwrap().class_name(0).unwrap(),
            "balloon"
        );

        let err = catalog
            .register(Metadata::new("balloon_train", ["other"]))
            .unwrap_err();
        assert!(matches!(err, Error::DatasetAlreadyRegistered(_)));

        assert!(catalog.remove("balloon_train").is_some());
        assert!(matches!(
            catalog.get("balloon_train"),
            Err(Error::DatasetNotRegistered(_))
        ));
    }

    #[test]
    fn test_class_out_of_range() {
        let meta = Metadata::new("balloon_train", ["balloon"]);
        assert!(matches!(
            meta.class_name(1),
            Err(Error::ClassOutOfRange { class_id: 1, len: 1, .. })
        ));
    }
}
