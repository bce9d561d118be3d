//! Course-shift allocation and conflict engine.
//!
//! The scheduling workflows cover capacity-aware allocation with a
//! one-shift-per-course-and-type rule, room and schedule conflict detection,
//! a change-request state machine with retryable side effects, and pull-based
//! notification feeds. Everything runs over a pluggable collection store so
//! the same engine serves tests, the demo walkthrough, and the HTTP service.

pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod workflows;
