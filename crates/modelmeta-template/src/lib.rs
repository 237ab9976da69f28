//! modelmeta Template - Addressing resources in the management tree
//!
//! An [`AddressTemplate`] names one node or a wildcarded set of nodes in the
//! management tree. Segments may carry placeholders such as
//! `{selected-host}` which a [`StatementContext`] fills in from the current
//! selection. [`TemplateResolver`]s rewrite templates segment by segment
//! according to a policy and compose with [`TemplateResolver::and_then`].
//!
//! ```text
//! /{selected-host}/server={selected-server}/subsystem=logging
//!        │                        │
//!        ▼                        ▼
//! /host=primary/server=server-one/subsystem=logging
//! ```

pub mod context;
pub mod error;
pub mod placeholder;
pub mod resolver;
pub mod segment;
pub mod template;

pub use context::StatementContext;
pub use error::{TemplateError, TemplateResult};
pub use placeholder::Placeholder;
pub use resolver::{
    AndThen, ResourceDescriptionResolver, SecurityContextResolver, SegmentResolution,
    StatementContextResolver, StrictResolver, TemplateResolver, WildcardResolver,
};
pub use segment::{Segment, WILDCARD};
pub use template::AddressTemplate;
