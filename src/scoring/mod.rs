//! The darts scoring core: visit accumulation and the score engine.

pub mod engine;
pub mod visit;
