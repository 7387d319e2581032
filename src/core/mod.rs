pub mod error;
pub mod geometry;
pub mod model;
pub mod report;
