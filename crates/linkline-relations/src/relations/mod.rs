//! Per-relation recipes

pub(crate) mod affiliations;
pub(crate) mod authors;
pub(crate) mod classifications;
pub(crate) mod datasets;
pub(crate) mod dyads;
pub(crate) mod publications;
pub(crate) mod topics;

use crate::metadata::RunMetadata;
use crate::store::RecordStore;

/// Inputs every recipe may read.
pub struct BuildContext<'a> {
    pub store: &'a RecordStore,
    pub metadata: Option<&'a RunMetadata>,
}
