// Domain layer - Core compression decisions

pub mod model;
pub mod rules;
