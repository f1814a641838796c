// Domain rules - Geometry, frame sampling and quality policies

pub mod geometry;
pub mod planner;
pub mod policy;
pub mod sampling;

pub use geometry::{round_to_even, GeometryResolver};
pub use planner::JobPlanner;
pub use policy::QualityPolicy;
pub use sampling::FrameSampler;
