//! Workflow modules grouped by functional area.

pub mod scheduling;
