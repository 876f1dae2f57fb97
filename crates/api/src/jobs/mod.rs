//! Background jobs.

mod sampler;

pub use sampler::{LocationSampler, Sample, SamplerHandle};
