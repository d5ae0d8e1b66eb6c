use crate::catalog::CanonicalItem;
use crate::frame::{
    DetectionRecord, FrameResult, ImageSize, LabelLookup, RawDetection, ResolvedDetection,
};
use crate::resolver::Resolver;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Threshold and precision defaults for each deployment profile.
pub mod defaults {
    pub const PANTRY_THRESHOLD: f32 = 0.35;
    pub const PANTRY_PRECISION: u32 = 4;
    pub const LEGACY_THRESHOLD: f32 = 0.25;
    pub const LEGACY_PRECISION: u32 = 2;
    /// Largest number of decimals a confidence may be rounded to.
    pub const MAX_PRECISION: u32 = 6;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("detection #{index} has class {class_id}, which has no label")]
    UnknownClass { index: usize, class_id: usize },
    #[error("detection #{index} has confidence {confidence}, expected a value in [0, 1]")]
    InvalidConfidence { index: usize, confidence: f32 },
    #[error("detection #{index} has a malformed bounding box {bbox:?}")]
    InvalidBoundingBox { index: usize, bbox: [f32; 4] },
    #[error("image size {width}x{height} cannot normalize bounding boxes")]
    InvalidImageSize { width: u32, height: u32 },
}

/// Order in which a frame's ingredients are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngredientOrder {
    /// Lexicographic by item name; reproducible across runs.
    Sorted,
    /// Order in which detections first produced each item.
    Discovery,
}

/// The two output disciplines this pipeline has shipped with.
///
/// `Pantry` sorts ingredients and keeps four decimals of confidence at a 0.35
/// threshold. `Legacy` keeps discovery order and two decimals at 0.25.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Pantry,
    Legacy,
}

impl Profile {
    pub fn options(self) -> AggregateOptions {
        match self {
            Profile::Pantry => AggregateOptions {
                confidence_threshold: defaults::PANTRY_THRESHOLD,
                confidence_precision: defaults::PANTRY_PRECISION,
                ingredient_order: IngredientOrder::Sorted,
                normalized_boxes: true,
            },
            Profile::Legacy => AggregateOptions {
                confidence_threshold: defaults::LEGACY_THRESHOLD,
                confidence_precision: defaults::LEGACY_PRECISION,
                ingredient_order: IngredientOrder::Discovery,
                normalized_boxes: true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateOptions {
    /// Detections below this confidence are dropped.
    pub confidence_threshold: f32,
    /// Decimal places kept in emitted confidences.
    pub confidence_precision: u32,
    pub ingredient_order: IngredientOrder,
    /// Emit `bboxNormalized` when the image size is known.
    pub normalized_boxes: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Profile::default().options()
    }
}

impl AggregateOptions {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.confidence_precision = precision;
        self
    }

    pub fn with_order(mut self, order: IngredientOrder) -> Self {
        self.ingredient_order = order;
        self
    }

    pub fn with_normalized_boxes(mut self, enabled: bool) -> Self {
        self.normalized_boxes = enabled;
        self
    }
}

/// Round half away from zero to `precision` decimals.
pub fn round_confidence(confidence: f32, precision: u32) -> f32 {
    let scale = 10f64.powi(precision.min(defaults::MAX_PRECISION) as i32);
    ((confidence as f64 * scale).round() / scale) as f32
}

/// Turns one frame of raw model output into a [`FrameResult`].
///
/// Holds no per-frame state; one aggregator can serve any number of frames
/// concurrently.
#[derive(Debug, Clone)]
pub struct Aggregator {
    resolver: Arc<Resolver>,
    options: AggregateOptions,
}

impl Aggregator {
    pub fn new(resolver: Arc<Resolver>, options: AggregateOptions) -> Self {
        Self { resolver, options }
    }

    /// Validate a frame, drop low-confidence boxes and resolve the rest,
    /// keeping the model's order.
    pub fn resolve_frame<L>(
        &self,
        detections: &[RawDetection],
        labels: &L,
    ) -> Result<Vec<ResolvedDetection>, AggregateError>
    where
        L: LabelLookup + ?Sized,
    {
        let mut resolved = Vec::new();
        for (index, detection) in detections.iter().enumerate() {
            check_detection(index, detection)?;
            if detection.confidence < self.options.confidence_threshold {
                log::trace!(
                    "dropping detection #{} (class {} at {:.4})",
                    index,
                    detection.class_id,
                    detection.confidence
                );
                continue;
            }
            let label = labels
                .label(detection.class_id)
                .ok_or(AggregateError::UnknownClass {
                    index,
                    class_id: detection.class_id,
                })?;
            resolved.push(ResolvedDetection {
                raw: *detection,
                label: label.to_string(),
                resolution: self.resolver.resolve(label),
            });
        }
        Ok(resolved)
    }

    pub fn aggregate<L>(
        &self,
        detections: &[RawDetection],
        labels: &L,
        image: Option<ImageSize>,
    ) -> Result<FrameResult, AggregateError>
    where
        L: LabelLookup + ?Sized,
    {
        let image = match image {
            Some(size) if self.options.normalized_boxes => {
                if size.width == 0 || size.height == 0 {
                    return Err(AggregateError::InvalidImageSize {
                        width: size.width,
                        height: size.height,
                    });
                }
                Some(size)
            }
            _ => None,
        };

        let resolved = self.resolve_frame(detections, labels)?;
        let ingredients = collect_ingredients(&resolved, self.options.ingredient_order);
        let detections = resolved
            .into_iter()
            .map(|detection| self.record(detection, image))
            .collect();

        let result = FrameResult {
            ingredients,
            detections,
        };
        log::debug!(
            "frame aggregated: {} ingredients from {} detections",
            result.ingredients.len(),
            result.detections.len()
        );
        Ok(result)
    }

    fn record(&self, detection: ResolvedDetection, image: Option<ImageSize>) -> DetectionRecord {
        let bbox = detection.raw.bbox;
        DetectionRecord {
            mapped_label: detection
                .resolution
                .into_item()
                .map(|item| item.to_string())
                .unwrap_or_default(),
            label: detection.label,
            confidence: round_confidence(
                detection.raw.confidence,
                self.options.confidence_precision,
            ),
            bbox: bbox.to_array(),
            bbox_normalized: image.map(|size| bbox.normalized(size)),
        }
    }
}

/// Confidence and box checks run on every detection, kept or not.
fn check_detection(index: usize, detection: &RawDetection) -> Result<(), AggregateError> {
    if !(0.0..=1.0).contains(&detection.confidence) {
        return Err(AggregateError::InvalidConfidence {
            index,
            confidence: detection.confidence,
        });
    }
    if !detection.bbox.is_well_formed() {
        return Err(AggregateError::InvalidBoundingBox {
            index,
            bbox: detection.bbox.to_array(),
        });
    }
    Ok(())
}

fn collect_ingredients(
    detections: &[ResolvedDetection],
    order: IngredientOrder,
) -> Vec<CanonicalItem> {
    let items = detections.iter().filter_map(ResolvedDetection::item);
    match order {
        IngredientOrder::Sorted => items
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
        IngredientOrder::Discovery => {
            let mut seen = HashSet::new();
            items
                .filter(|item| seen.insert(item.as_str()))
                .cloned()
                .collect()
        }
    }
}

/// Aggregate one frame with the default profile and an explicit threshold.
pub fn aggregate<L>(
    detections: &[RawDetection],
    confidence_threshold: f32,
    labels: &L,
    resolver: Arc<Resolver>,
) -> Result<FrameResult, AggregateError>
where
    L: LabelLookup + ?Sized,
{
    let options = AggregateOptions::default().with_threshold(confidence_threshold);
    Aggregator::new(resolver, options).aggregate(detections, labels, None)
}
