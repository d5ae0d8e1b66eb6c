use crate::frame::FrameResult;
use schemars::schema::RootSchema;

/// Version of the `FrameResult` JSON shape.
pub const SCHEMA_VERSION: &str = "1.0.0";

pub fn frame_result_schema() -> RootSchema {
    schemars::schema_for!(FrameResult)
}
