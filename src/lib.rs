//! Resolve raw object-detection labels onto a fixed pantry vocabulary and
//! aggregate each frame's detections into a deduplicated ingredient list.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod frame;
pub mod resolver;
pub mod schema;

pub use aggregate::{AggregateError, AggregateOptions, Aggregator, IngredientOrder, Profile};
pub use catalog::{AliasTable, CanonicalItem, Catalog, CatalogError, Vocabulary};
pub use frame::{BoundingBox, FrameInput, FrameResult, ImageSize, LabelLookup, RawDetection};
pub use resolver::{MatchKind, Resolution, Resolver};
