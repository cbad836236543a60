//! Detections produced by a model for one image.

use serde::Serialize;

use super::BoundingBox;
use crate::error::{Error, Result};

/// A single detected instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Instance {
    pub bbox: BoundingBox,
    pub score: f32,
    pub class_id: usize,
}

/// Builder for creating `Instance` objects from various box layouts.
#[derive(Debug, Clone, Default)]
pub struct InstanceBuilder {
    bbox: BoundingBox,
    score: f32,
    class_id: usize,
}

impl InstanceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in XYXY format (x1, y1, x2, y2).
    pub fn xyxy(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = BoundingBox::new(x1, y1, x2, y2);
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = BoundingBox::from_xywh(cx, cy, w, h);
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bbox = BoundingBox::from_tlwh(x, y, w, h);
        self
    }

    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn class_id(mut self, class_id: usize) -> Self {
        self.class_id = class_id;
        self
    }

    pub fn build(self) -> Instance {
        Instance {
            bbox: self.bbox,
            score: self.score,
            class_id: self.class_id,
        }
    }
}

/// Per-instance boxes, scores and predicted classes, column-wise.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Instances {
    /// (height, width) of the image the boxes refer to.
    pub image_size: (usize, usize),
    pub pred_boxes: Vec<BoundingBox>,
    pub scores: Vec<f32>,
    pub pred_classes: Vec<usize>,
}

impl Instances {
    pub fn new(image_size: (usize, usize)) -> Self {
        Self {
            image_size,
            ..Self::default()
        }
    }

    pub fn push(&mut self, instance: Instance) {
        self.pred_boxes.push(instance.bbox);
        self.scores.push(instance.score);
        self.pred_classes.push(instance.class_id);
    }

    /// Number of complete instances, i.e. the shortest column.
    pub fn len(&self) -> usize {
        self.scores
            .len()
            .min(self.pred_boxes.len())
            .min(self.pred_classes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Instance at `index`, failing when the index exceeds the detections.
    pub fn get(&self, index: usize) -> Result<Instance> {
        match (
            self.pred_boxes.get(index),
            self.scores.get(index),
            self.pred_classes.get(index),
        ) {
            (Some(&bbox), Some(&score), Some(&class_id)) => Ok(Instance {
                bbox,
                score,
                class_id,
            }),
            _ => Err(self.out_of_range(index)),
        }
    }

    /// Predicted class of the instance at `index`.
    pub fn pred_class(&self, index: usize) -> Result<usize> {
        Ok(self.get(index)?.class_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = Instance> + '_ {
        self.pred_boxes
            .iter()
            .zip(&self.scores)
            .zip(&self.pred_classes)
            .map(|((&bbox, &score), &class_id)| Instance {
                bbox,
                score,
                class_id,
            })
    }

    fn out_of_range(&self, index: usize) -> Error {
        Error::InstanceOutOfRange {
            index,
            len: self.len(),
        }
    }
}

impl Extend<Instance> for Instances {
    fn extend<T: IntoIterator<Item = Instance>>(&mut self, iter: T) {
        for instance in iter {
            self.push(instance);
        }
    }
}
