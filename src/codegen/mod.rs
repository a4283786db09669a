//! Header generation.
//!
//! ```text
//! descriptors ──────────────► attributes ─┐
//! schema files ─► exclusion ─► registry ──┼─► output (assemble, format, commit)
//! node id table ────────────► nodeids ────┘
//! ```
//!
//! Every stage is a pure function of its inputs except `output`, the only
//! module that touches the filesystem, and `nodeids`, which may fetch over
//! HTTP.

pub mod attributes;
pub mod descriptor;
pub mod exclusion;
pub mod generate;
pub mod nodeids;
pub mod output;
pub mod registry;
pub mod schema;
pub mod target;

pub use attributes::{AttributeRenderer, ConnectionParam};
pub use descriptor::{ATTRIBUTES, AttributeDescriptor, DescriptorTable};
pub use exclusion::ExclusionSet;
pub use generate::{GenerationReport, GeneratorInputs, TargetReport, TargetStatus, generate};
pub use nodeids::{NodeIdRenderer, NodeIdSource, NodeIdTable};
pub use output::{FormatterCommand, HeaderSkeleton, HeaderTransaction};
pub use registry::{RegistryEntry, RegistryPlan, RegistryRenderer};
pub use schema::{SchemaFile, SchemaSource};
pub use target::Target;
