//! Renderer-facing projections.

pub mod projector;
