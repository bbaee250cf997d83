// src/lib.rs
pub mod analysis;
pub mod config;
pub mod discover;
pub mod plot;
pub mod report;
