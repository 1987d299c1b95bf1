//! Getting samples off disk without stalling the UI: a decoder thread fed by
//! a queue, plus the directory scan that builds a default registry.

mod sample_loader;

pub use sample_loader::{LoadResult, SampleLoader, index_audio_in_dir};
