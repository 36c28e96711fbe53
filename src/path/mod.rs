pub mod curve;
pub mod sampler;

pub use curve::{Curve, CurveBuilder, CurveKind};
pub use sampler::{SampledPath, SpacedSampler};
