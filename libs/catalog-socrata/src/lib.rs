//! Socrata Open Data portal driver (§4.C): discovery iteration, catalog
//! search, v2/v3 row fetching, and metadata normalization for a single
//! Socrata host, composed behind the `catalog-adapter` contracts.

pub mod auth;
pub mod catalog;
pub mod discovery;
pub mod driver;
pub mod metadata;
pub mod rows;
pub mod soql;
pub mod transport;

pub use auth::{V3AuthResolver, V3KeyPair};
pub use catalog::SocrataCatalogLister;
pub use discovery::SocrataDiscoveryDriver;
pub use driver::SocrataDriver;
pub use metadata::{map_logical_type, SocrataMetadataFetcher};
pub use rows::SocrataRowFetcher;
pub use soql::{build_soql, AllowedFields, SoqlInput, SoqlOperator, SoqlPredicate};
pub use transport::SocrataTransport;
