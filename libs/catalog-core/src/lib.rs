//! Shared contracts for the catalog discovery and ingestion pipeline:
//! the persisted/transient data model (§3), the error taxonomy (§7), and
//! the metadata/codec layer (§4.I).

pub mod codec;
pub mod error;
pub mod model;

pub use codec::{CanonicalValue, Codec, CodecRegistry};
pub use error::{CoreError, CoreResult, RetryClass};
pub use model::{
    Agency, CatalogItem, Dataset, Domain, Host, LogicalType, NormalizedColumn,
    NormalizedDatasetMetadata, PortalCatalogEntry, PortalSource, Region, ResumeState, ResumeToken,
};
