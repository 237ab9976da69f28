//! modelmeta Meta - Resource metadata registries and fetch pipeline
//!
//! Two kinds of metadata are kept per resource: the [`ResourceDescription`]
//! (schema of attributes, operations and children) and the
//! [`SecurityContext`] (what the current user may read, write and execute).
//! Both live in bounded [`Registry`] instances keyed by resolved address
//! templates.
//!
//! [`MetadataProcessor`] checks the registries, fetches what is missing in
//! batched composite requests and parses the responses with [`RrdParser`]:
//!
//! ```text
//! templates ─► check ─► plan ─► batch ─► execute ─► parse ─► update ─► compose
//!                 │                                                      ▲
//!                 └──────────────── all present ─────────────────────────┘
//! ```

pub mod description;
pub mod error;
pub mod metadata;
pub mod parser;
pub mod processor;
pub mod registry;
pub mod security;
pub mod status;

pub use description::ResourceDescription;
pub use error::{MetaError, MetaResult, ParseError};
pub use metadata::Metadata;
pub use parser::{RrdEntry, RrdParser, RrdResult};
pub use processor::{MetadataProcessor, ProcessorStats};
pub use registry::{MetadataEntry, Registry, ResourceDescriptionRegistry, SecurityContextRegistry};
pub use security::SecurityContext;
pub use status::RepositoryStatus;
