use crate::catalog::CanonicalItem;
use crate::resolver::Resolution;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Axis-aligned box in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Finite coordinates with `x1 <= x2` and `y1 <= y2`.
    pub fn is_well_formed(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x1 <= self.x2
            && self.y1 <= self.y2
    }

    /// Coordinates scaled into `[0, 1]` by the image dimensions.
    pub fn normalized(&self, image: ImageSize) -> [f32; 4] {
        let w = image.width as f32;
        let h = image.height as f32;
        [self.x1 / w, self.y1 / h, self.x2 / w, self.y2 / h]
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_array()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// One box as emitted by the detection model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    #[serde(rename = "class")]
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl RawDetection {
    pub fn new(class_id: usize, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }
}

/// Maps model class indices to the model's label strings.
pub trait LabelLookup {
    fn label(&self, class_id: usize) -> Option<&str>;
}

impl LabelLookup for [String] {
    fn label(&self, class_id: usize) -> Option<&str> {
        self.get(class_id).map(String::as_str)
    }
}

impl LabelLookup for [&str] {
    fn label(&self, class_id: usize) -> Option<&str> {
        self.get(class_id).copied()
    }
}

impl LabelLookup for Vec<String> {
    fn label(&self, class_id: usize) -> Option<&str> {
        self.as_slice().label(class_id)
    }
}

impl LabelLookup for HashMap<usize, String> {
    fn label(&self, class_id: usize) -> Option<&str> {
        self.get(&class_id).map(String::as_str)
    }
}

impl LabelLookup for BTreeMap<usize, String> {
    fn label(&self, class_id: usize) -> Option<&str> {
        self.get(&class_id).map(String::as_str)
    }
}

/// Class names as a model ships them: either a list or an index-keyed table.
///
/// Table keys stay strings because JSON object keys are strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabels {
    List(Vec<String>),
    Table(BTreeMap<String, String>),
}

impl LabelLookup for ClassLabels {
    fn label(&self, class_id: usize) -> Option<&str> {
        match self {
            ClassLabels::List(labels) => labels.label(class_id),
            ClassLabels::Table(labels) => labels.get(&class_id.to_string()).map(String::as_str),
        }
    }
}

/// One frame of model output as handed over by the inference layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    pub classes: ClassLabels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSize>,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

/// A raw detection with its model label and resolution attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDetection {
    pub raw: RawDetection,
    pub label: String,
    pub resolution: Resolution,
}

impl ResolvedDetection {
    pub fn item(&self) -> Option<&CanonicalItem> {
        self.resolution.item()
    }
}

/// Per-box record emitted to clients.
///
/// `mapped_label` is empty when the model label is not a pantry item; the raw
/// label is never substituted for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub label: String,
    pub mapped_label: String,
    pub confidence: f32,
    pub bbox: [f32; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_normalized: Option<[f32; 4]>,
}

/// Aggregated output for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
pub struct FrameResult {
    pub ingredients: Vec<CanonicalItem>,
    pub detections: Vec<DetectionRecord>,
}

impl FrameResult {
    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty() && self.detections.is_empty()
    }

    pub fn ingredient_names(&self) -> Vec<&str> {
        self.ingredients.iter().map(CanonicalItem::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bbox_validation() {
        assert!(BoundingBox::new(0.0, 0.0, 10.0, 10.0).is_well_formed());
        assert!(BoundingBox::new(5.0, 5.0, 5.0, 5.0).is_well_formed());
        assert!(!BoundingBox::new(10.0, 0.0, 5.0, 10.0).is_well_formed());
        assert!(!BoundingBox::new(0.0, 10.0, 5.0, 5.0).is_well_formed());
        assert!(!BoundingBox::new(0.0, 0.0, f32::NAN, 5.0).is_well_formed());
    }

    #[test]
    fn bbox_normalizes_by_image_size() {
        let bbox = BoundingBox::new(64.0, 48.0, 320.0, 240.0);
        let normalized = bbox.normalized(ImageSize::new(640, 480));
        assert_eq!(normalized, [0.1, 0.1, 0.5, 0.5]);
    }

    #[test]
    fn raw_detection_reads_model_json() {
        let detection: RawDetection =
            serde_json::from_value(json!({"class": 3, "confidence": 0.5, "bbox": [1, 2, 3, 4]}))
                .unwrap();
        assert_eq!(detection.class_id, 3);
        assert_eq!(detection.bbox, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn class_labels_accept_list_or_table() {
        let list: ClassLabels = serde_json::from_value(json!(["egg", "corn"])).unwrap();
        assert_eq!(list.label(1), Some("corn"));
        assert_eq!(list.label(2), None);

        let table: ClassLabels = serde_json::from_value(json!({"0": "egg", "7": "corn"})).unwrap();
        assert_eq!(table.label(7), Some("corn"));
        assert_eq!(table.label(1), None);
    }

    #[test]
    fn frame_input_defaults() {
        let input: FrameInput = serde_json::from_value(json!({"classes": ["egg"]})).unwrap();
        assert!(input.image.is_none());
        assert!(input.detections.is_empty());
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = DetectionRecord {
            label: "jalapeno".into(),
            mapped_label: "Jalapenos".into(),
            confidence: 0.5,
            bbox: [1.0, 2.0, 3.0, 4.0],
            bbox_normalized: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["mappedLabel"], "Jalapenos");
        assert!(value.get("bboxNormalized").is_none());
        assert!(value.get("mapped_label").is_none());
    }
}
