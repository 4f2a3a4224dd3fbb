// Domain layer - Core business types

pub mod model;
