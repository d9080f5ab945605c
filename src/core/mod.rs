//! Core data types: the samples to build and the targets to build them for.

pub mod sample;
pub mod triple;

pub use sample::SampleTarget;
pub use triple::CrossTargetSpec;
