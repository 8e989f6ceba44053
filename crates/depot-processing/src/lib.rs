//! Depot upload processing
//!
//! The acceptance pipeline for new uploads and the resolver that serves them back.
//! Leaf components (hashing, policies, image inspection, remote fetching) are usable on
//! their own; `UploadPipeline` and `UploadResolver` compose them over a `Storage`
//! backend and an `UploadRepository`.

pub mod addresser;
pub mod error;
pub mod fetch;
pub mod filename;
pub mod inspector;
pub mod pipeline;
pub mod policy;
pub mod resolver;
pub mod signal;

pub use addresser::{ContentAddresser, Sha1Digest};
pub use error::{ResolveError, UploadError};
pub use fetch::{FetchedFile, HttpFetcher, RemoteFetcher};
pub use inspector::ImageInspector;
pub use pipeline::UploadPipeline;
pub use policy::{ExtensionPolicy, ExtensionRule, PolicyContext, SizeCategory, SizePolicy};
pub use resolver::{LookupKey, ResolvedUpload, ShortUrlLookup, UploadResolver};
pub use signal::{ChannelSignal, JobSignal, NoopSignal, ThumbnailSignal};
