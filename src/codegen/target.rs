//! Generated headers and their fixed frames.

use crate::codegen::nodeids::NODE_IDS_PREAMBLE;
use crate::codegen::output::{DiagnosticSuppression, HeaderSkeleton};
use crate::codegen::schema::SchemaSource;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    ValueEnum,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// Attribute read/write accessors.
    Attributes,
    /// Native type registrations.
    TypeRegistry,
    /// Legacy native type converter registrations.
    TypeConverter,
    /// Node id enumerations.
    NodeIds,
}

impl Target {
    pub const DEFAULTS: &'static [Target] = &[Target::Attributes, Target::TypeRegistry, Target::NodeIds];

    /// Header path relative to the output root.
    pub fn relative_path(self) -> PathBuf {
        match self {
            Target::Attributes => PathBuf::from("services/attribute_highlevel.hpp"),
            Target::TypeRegistry => PathBuf::from("ua/typeregistry.hpp"),
            Target::TypeConverter => PathBuf::from("TypeConverterNative.h"),
            Target::NodeIds => PathBuf::from("ua/nodeids.hpp"),
        }
    }

    pub fn skeleton(self) -> HeaderSkeleton {
        match self {
            Target::Attributes => HeaderSkeleton::new("opcua::services")
                .include("\"open62541pp/services/attribute.hpp\""),
            Target::TypeRegistry => HeaderSkeleton::new("opcua")
                .include("\"open62541pp/detail/open62541/common.h\"")
                .include("\"open62541pp/typeregistry.hpp\"")
                .fenced(),
            Target::TypeConverter => HeaderSkeleton::new("opcua")
                .include("\"open62541pp/TypeConverter.h\"")
                .include("\"open62541pp/open62541.h\"")
                .fenced(),
            Target::NodeIds => HeaderSkeleton::new("opcua")
                .include("<cstdint>")
                .suppress(DiagnosticSuppression::gcc_shadow())
                .preamble(NODE_IDS_PREAMBLE)
                .fenced(),
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

fn datatypes(area: &str) -> PathBuf {
    PathBuf::from(format!("datatypes_{area}.txt"))
}

/// Schema files feeding the type registry, guarded areas last.
pub fn default_type_registry_schemas() -> Vec<SchemaSource> {
    let guards = [
        ("dataaccess", "UA_ENABLE_DA"),
        ("historizing", "UA_ENABLE_HISTORIZING"),
        ("pubsub", "UA_ENABLE_PUBSUB"),
        ("typedescription", "UA_ENABLE_TYPEDESCRIPTION"),
    ];
    [
        "dataaccess",
        "diagnostics",
        "discovery",
        "events",
        "historizing",
        "method",
        "minimal",
        "pubsub",
        "query",
        "subscriptions",
        "transport",
        "typedescription",
    ]
    .into_iter()
    .map(|area| match guards.iter().find(|(name, _)| *name == area) {
        Some((_, guard)) => SchemaSource::guarded(datatypes(area), *guard),
        None => SchemaSource::new(datatypes(area)),
    })
    .collect()
}

/// Schema files feeding the legacy type converter; no guards.
pub fn default_type_converter_schemas() -> Vec<SchemaSource> {
    [
        "minimal",
        "method",
        "subscriptions",
        "events",
        "historizing",
        "discovery",
        "query",
        "pubsub",
        "dataaccess",
    ]
    .into_iter()
    .map(|area| SchemaSource::new(datatypes(area)))
    .collect()
}
