//! Identifiers that are defined elsewhere and must never be registered.

use crate::codegen::schema::SchemaFile;
use std::collections::BTreeSet;

/// Builtin scalar types of the stack.
pub const BUILTIN_TYPES: &[&str] = &[
    "Boolean",
    "SByte",
    "Byte",
    "Int16",
    "UInt16",
    "Int32",
    "UInt32",
    "Int64",
    "UInt64",
    "Float",
    "Double",
    "String",
    "DateTime",
    "Guid",
    "ByteString",
    "XmlElement",
    "NodeId",
    "ExpandedNodeId",
    "StatusCode",
    "QualifiedName",
    "LocalizedText",
    "ExtensionObject",
    "DataValue",
    "Variant",
    "DiagnosticInfo",
];

/// Aliases of builtin types (alias target in the trailing comment).
pub const TYPE_ALIASES: &[&str] = &[
    "Duration",                      // Double
    "UtcTime",                       // Int64
    "LocaleId",                      // String
    "DiscoveryConfiguration",        // void*
    "FilterOperand",                 // void*
    "DataSetFieldContentMask",       // UInt32
    "DataSetFieldFlags",             // UInt16
    "JsonDataSetMessageContentMask", // UInt32
    "JsonNetworkMessageContentMask", // UInt32
    "UadpDataSetMessageContentMask", // UInt32
    "UadpNetworkMessageContentMask", // UInt32
    "PermissionType",                // UInt32
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    names: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Builtin types plus aliases.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_TYPES.iter().chain(TYPE_ALIASES).copied())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Copy of `file` without excluded identifiers; order is preserved.
    pub fn apply(&self, file: &SchemaFile) -> SchemaFile {
        let identifiers = file
            .identifiers
            .iter()
            .filter(|name| !self.contains(name))
            .cloned()
            .collect::<Vec<_>>();

        let removed = file.identifiers.len() - identifiers.len();
        if removed > 0 {
            tracing::debug!(path = %file.path.display(), removed, "excluded known identifiers");
        }

        SchemaFile {
            path: file.path.clone(),
            guard: file.guard.clone(),
            identifiers,
        }
    }

    pub fn apply_all(&self, files: &[SchemaFile]) -> Vec<SchemaFile> {
        files.iter().map(|file| self.apply(file)).collect()
    }
}
