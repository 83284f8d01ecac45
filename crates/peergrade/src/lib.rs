//! Core library for the peergrade platform: submission intake, heuristic
//! scoring, AI feedback generation with a deterministic fallback, and peer
//! review coordination.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
