//! Workflow modules grouped by platform capability.

pub mod submissions;
