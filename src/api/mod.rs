// src/api/mod.rs
pub mod client;

pub use client::{parse_envelope, ApiClient, ExportPayload};
