//! Attribute descriptor table.
//!
//! The table is authored by hand and its order is the documentation order of
//! the generated accessors, so it is never sorted.

use crate::error::{GenError, GenResult};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashSet;

/// One node attribute for which accessors are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttributeDescriptor {
    /// Attribute name, e.g. `BrowseName`. Also the `AttributeId` enumerator.
    pub name: &'static str,
    /// Type returned by the read accessor.
    pub value_type: &'static str,
    /// Non-owning type accepted by the write accessor instead of `value_type`.
    pub view_type: Option<&'static str>,
    /// Pass by value instead of by const reference.
    pub copy: bool,
    pub writeable: bool,
    /// Extra sentence appended to the accessor documentation.
    pub detail: Option<&'static str>,
}

impl AttributeDescriptor {
    pub const fn new(name: &'static str, value_type: &'static str) -> Self {
        Self {
            name,
            value_type,
            view_type: None,
            copy: false,
            writeable: true,
            detail: None,
        }
    }

    pub const fn copied(mut self) -> Self {
        self.copy = true;
        self
    }

    pub const fn read_only(mut self) -> Self {
        self.writeable = false;
        self
    }

    pub const fn with_view(mut self, view_type: &'static str) -> Self {
        self.view_type = Some(view_type);
        self
    }

    pub const fn with_detail(mut self, detail: &'static str) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn read_type(&self) -> &'static str {
        self.value_type
    }

    /// View type if any, otherwise the value type by value (`copy`) or by
    /// const reference.
    pub fn write_param_type(&self) -> Cow<'static, str> {
        match self.view_type {
            Some(view) => Cow::Borrowed(view),
            None if self.copy => Cow::Borrowed(self.value_type),
            None => Cow::Owned(format!("const {}&", self.value_type)),
        }
    }

    /// `BrowseName` -> `browseName`.
    pub fn param_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Payload handed to the completion token of the async read.
    pub fn read_completion_type(&self) -> String {
        if self.copy {
            format!("Result<{}>", self.value_type)
        } else {
            format!("Result<{}>&", self.value_type)
        }
    }
}

/// A validated, ordered view over a descriptor slice.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorTable<'a> {
    descriptors: &'a [AttributeDescriptor],
}

impl<'a> DescriptorTable<'a> {
    pub fn new(descriptors: &'a [AttributeDescriptor]) -> GenResult<Self> {
        if descriptors.is_empty() {
            return Err(GenError::config("attribute descriptor table is empty"));
        }

        let mut seen = HashSet::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.iter().enumerate() {
            let problem = if !is_identifier(descriptor.name) {
                Some("name is not an identifier")
            } else if descriptor.value_type.trim().is_empty() {
                Some("value type is empty")
            } else if descriptor.view_type.is_some_and(|view| view.trim().is_empty()) {
                Some("view type is empty")
            } else if !seen.insert(descriptor.name) {
                Some("duplicate name")
            } else {
                None
            };

            if let Some(problem) = problem {
                return Err(GenError::config(format!(
                    "attribute descriptor #{index} ({:?}): {problem}",
                    descriptor.name
                )));
            }
        }

        Ok(Self { descriptors })
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a AttributeDescriptor> + 'a {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// C identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[rustfmt::skip]
pub const ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor::new("NodeId", "NodeId").read_only(),
    AttributeDescriptor::new("NodeClass", "NodeClass").copied().read_only(),
    AttributeDescriptor::new("BrowseName", "QualifiedName"),
    AttributeDescriptor::new("DisplayName", "LocalizedText"),
    AttributeDescriptor::new("Description", "LocalizedText"),
    AttributeDescriptor::new("WriteMask", "Bitmask<WriteMask>").copied(),
    AttributeDescriptor::new("UserWriteMask", "Bitmask<WriteMask>").copied(),
    AttributeDescriptor::new("IsAbstract", "bool").copied()
        .with_detail("Only defined for type nodes (ObjectType, VariableType, ReferenceType, DataType)."),
    AttributeDescriptor::new("Symmetric", "bool").copied()
        .with_detail("Only defined for ReferenceType nodes."),
    AttributeDescriptor::new("InverseName", "LocalizedText")
        .with_detail("Only defined for ReferenceType nodes."),
    AttributeDescriptor::new("ContainsNoLoops", "bool")
        .with_detail("Only defined for View nodes."),
    AttributeDescriptor::new("EventNotifier", "Bitmask<EventNotifier>").copied(),
    AttributeDescriptor::new("Value", "Variant"),
    AttributeDescriptor::new("DataType", "NodeId"),
    AttributeDescriptor::new("ValueRank", "ValueRank").copied(),
    AttributeDescriptor::new("ArrayDimensions", "std::vector<uint32_t>").with_view("Span<const uint32_t>"),
    AttributeDescriptor::new("AccessLevel", "Bitmask<AccessLevel>").copied(),
    AttributeDescriptor::new("UserAccessLevel", "Bitmask<AccessLevel>").copied(),
    AttributeDescriptor::new("MinimumSamplingInterval", "double").copied(),
    AttributeDescriptor::new("Historizing", "bool").copied(),
    AttributeDescriptor::new("Executable", "bool").copied()
        .with_detail("Only defined for Method nodes."),
    AttributeDescriptor::new("UserExecutable", "bool").copied()
        .with_detail("Only defined for Method nodes."),
    AttributeDescriptor::new("DataTypeDefinition", "Variant").read_only()
        .with_detail("Only defined for DataType nodes."),
];
