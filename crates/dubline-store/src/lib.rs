#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod error;
pub mod file;
pub mod memory;
pub mod rest;

pub use error::StoreError;
pub use file::{FileTranscriptSource, JsonlResultSink};
pub use memory::{MemoryResultSink, MemoryTranscriptSource};
pub use rest::{RestConfig, RestResultSink, RestTranscriptSource};
