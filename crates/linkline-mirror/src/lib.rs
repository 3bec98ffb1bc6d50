//! linkline-mirror: keep a local mirror of the export bucket in sync
//!
//! The bucket holds one directory per run, `{agency}/{version}/...`. A sync
//! lists every object under the configured prefix, downloads the missing
//! ones with a small worker pool and reports which runs arrived complete.

mod bucket;
mod error;
mod source;
mod sync;

pub use bucket::{
    BucketAuth, BucketSettings, CredentialSettings, S3Bucket, normalize_prefix, parse_bucket_url,
};
pub use error::MirrorError;
pub use source::{LocalDir, ObjectSource, RemoteObject};
pub use sync::{SyncOptions, SyncReport, sync};
