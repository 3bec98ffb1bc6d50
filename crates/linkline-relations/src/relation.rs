//! The nine relations and their static descriptors

use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::metadata::RunMetadata;
use crate::project::Source;
use crate::relations::{
    BuildContext, affiliations, authors, classifications, datasets, dyads, publications, topics,
};
use crate::schema::{enforce, enforce_or_empty};
use crate::store::RecordStore;
use crate::table::Table;

/// A normalized output relation. Declaration order is the load/export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    Publications,
    Dyads,
    Authors,
    Affiliations,
    Topics,
    TopicClusters,
    Asjcs,
    Ufcs,
    Datasets,
}

impl Relation {
    pub const ALL: [Relation; 9] = [
        Self::Publications,
        Self::Dyads,
        Self::Authors,
        Self::Affiliations,
        Self::Topics,
        Self::TopicClusters,
        Self::Asjcs,
        Self::Ufcs,
        Self::Datasets,
    ];

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn descriptor(self) -> &'static RelationDescriptor {
        match self {
            Self::Publications => &publications::DESCRIPTOR,
            Self::Dyads => &dyads::DESCRIPTOR,
            Self::Authors => &authors::DESCRIPTOR,
            Self::Affiliations => &affiliations::DESCRIPTOR,
            Self::Topics => &topics::TOPICS,
            Self::TopicClusters => &topics::TOPIC_CLUSTERS,
            Self::Asjcs => &classifications::ASJCS,
            Self::Ufcs => &classifications::UFCS,
            Self::Datasets => &datasets::DESCRIPTOR,
        }
    }

    /// Declared output columns, optional first.
    pub fn columns(self) -> Vec<&'static str> {
        let descriptor = self.descriptor();
        descriptor.optional.iter().chain(descriptor.required).copied().collect()
    }

    /// Whether rows reference a parent document (every relation but `datasets`).
    pub fn is_keyed(self) -> bool {
        !matches!(self.descriptor().source, Source::Metadata)
    }

    /// Compute this relation from scratch.
    pub fn build(self, store: &RecordStore, metadata: Option<&RunMetadata>) -> Result<Table> {
        let ctx = BuildContext { store, metadata };
        (self.descriptor().build)(&ctx)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|r| r.name()).collect();
                format!("unknown relation '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Static description of how a relation is produced.
pub struct RelationDescriptor {
    pub name: &'static str,
    pub source: Source,
    pub optional: &'static [&'static str],
    pub required: &'static [&'static str],
    /// An empty result is valid and gets every declared column; otherwise a
    /// required column missing from the whole batch fails the relation.
    pub empty_allowed: bool,
    pub(crate) build: fn(&BuildContext<'_>) -> Result<Table>,
}

impl RelationDescriptor {
    /// Conform a projected table to this relation's columns.
    pub fn enforce(&self, table: Table) -> Result<Table> {
        if self.empty_allowed {
            enforce_or_empty(self.name, table, self.optional, self.required)
        } else {
            enforce(self.name, table, self.optional, self.required)
        }
    }
}

impl fmt::Debug for RelationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationDescriptor")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("optional", &self.optional)
            .field("required", &self.required)
            .field("empty_allowed", &self.empty_allowed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for relation in Relation::ALL {
            assert_eq!(relation.name().parse::<Relation>().unwrap(), relation);
        }
        assert!("journals".parse::<Relation>().is_err());
    }

    #[test]
    fn declared_columns() {
        assert_eq!(
            Relation::Dyads.columns(),
            vec!["snippet", "fuzzy_score", "is_fuzzy", "model", "score", "alias", "alias_id"]
        );
        assert_eq!(
            Relation::Datasets.columns(),
            vec!["alias", "alias_id", "parent_alias_id", "alias_type"]
        );
        assert_eq!(Relation::Publications.columns().last(), Some(&"publication_year"));
    }

    #[test]
    fn only_datasets_is_unkeyed() {
        let unkeyed: Vec<_> = Relation::ALL.into_iter().filter(|r| !r.is_keyed()).collect();
        assert_eq!(unkeyed, vec![Relation::Datasets]);
    }
}
