//! Domain model module declarations.

pub mod job;
pub mod progress;
pub mod step;
