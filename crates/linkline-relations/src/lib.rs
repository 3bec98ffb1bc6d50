//! JSON-to-relational normalization of dataset-linkage exports.
//!
//! A batch of line-delimited JSON documents is loaded into a [`RecordStore`],
//! projected into nine fixed-schema relations by [`RelationLoader`],
//! validated against the run's metadata and handed to a [`Destination`].

mod error;
pub mod export;
pub mod layout;
mod load;
mod loader;
mod metadata;
pub mod project;
mod relation;
mod relations;
pub mod schema;
mod store;
mod table;
pub mod validate;
pub mod values;

pub use error::{IngestError, Result};
pub use export::to_record_batch;
pub use layout::{RunLabel, RunLayout, force_reload_requests};
pub use load::{Destination, LoadOptions, LoadSummary, WriteMode, load};
pub use loader::RelationLoader;
pub use metadata::{RunMetadata, YearCount};
pub use project::Source;
pub use relation::{Relation, RelationDescriptor};
pub use relations::BuildContext;
pub use store::{Document, RecordStore};
pub use table::{ColumnType, RowKey, Table, TableBuilder, cell_text};
pub use validate::{ValidationReport, YearMismatch};
