//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, codec, persistence and projection per user intent.
//! - Keep renderer/input layers decoupled from storage and format details.

pub mod export_sink;
pub mod ports;
pub mod reconcile;
pub mod session;
