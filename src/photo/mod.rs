//! Photo listing and administration.

pub mod sampler;
mod service;

pub use sampler::{PhotoSampler, Reservoir, Sample, SampleMeta, SampleRequest, DEFAULT_MAX_SCAN};
pub use service::{duplicate_file_name, PhotoService, PhotoTransfer, DEFAULT_MAX_PHOTO_SIZE};
