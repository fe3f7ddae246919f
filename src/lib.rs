//! Library crate for x01-back, exposing modules for binaries and integration tests.

mod config;
pub mod dao;
mod dto;
mod error;
pub mod routes;
pub mod scoring;
pub mod services;
pub mod state;
pub mod sync;
