//! Data-access layer: store contract, backends, and serialized entities.

pub mod match_store;
pub mod models;
pub mod storage;
