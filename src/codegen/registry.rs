//! Native type registration lines.
//!
//! Ordering: the union of all unguarded files forms one block that comes
//! first, followed by one block per guarded file in configured order.
//! Identifiers are sorted within each block, so the physical line order of a
//! schema file never shows up in the output. A guarded block keeps its
//! `#ifdef`/`#endif` pair even when nothing survives exclusion; toggling a
//! feature then never adds or removes lines outside the block body.

use crate::codegen::exclusion::ExclusionSet;
use crate::codegen::schema::SchemaFile;
use crate::error::GenResult;
use crate::template::FragmentRenderer;
use serde::Serialize;
use std::collections::BTreeSet;

const BLOCK_TEMPLATE: &str = r#"
{% if guard %}#ifdef {{ guard }}
{% endif %}{% for entry in entries %}#ifdef {{ entry.index_symbol }}
{{ macro_name }}({{ entry.type_name }}, {{ entry.index_symbol }})
#endif
{% endfor %}{% if guard %}#endif  // {{ guard }}{% endif %}
"#;

pub const TYPE_REGISTRY_MACRO: &str = "UAPP_TYPEREGISTRY_NATIVE";
pub const TYPE_CONVERTER_MACRO: &str = "UAPP_TYPECONVERTER_NATIVE";

/// `Foo` -> `UA_Foo` registered under `UA_TYPES_FOO`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub type_name: String,
    pub index_symbol: String,
}

impl RegistryEntry {
    pub fn from_identifier(identifier: &str) -> Self {
        Self {
            type_name: format!("UA_{identifier}"),
            index_symbol: format!("UA_TYPES_{}", identifier.to_ascii_uppercase()),
        }
    }
}

/// One contiguous group of registrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryBlock {
    pub guard: Option<String>,
    pub identifiers: Vec<String>,
}

/// Grouped, sorted registrations ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistryPlan {
    pub blocks: Vec<RegistryBlock>,
}

impl RegistryPlan {
    /// Build the plan from loaded schema files.
    ///
    /// Excluded identifiers are dropped here as well, so the plan is correct
    /// even for files that never went through [`ExclusionSet::apply`].
    pub fn build(files: &[SchemaFile], exclusions: &ExclusionSet) -> Self {
        let retained = |file: &SchemaFile| -> BTreeSet<String> {
            file.identifiers
                .iter()
                .filter(|name| !exclusions.contains(name))
                .cloned()
                .collect()
        };

        let mut blocks = Vec::new();

        let unguarded: BTreeSet<String> = files
            .iter()
            .filter(|file| !file.is_guarded())
            .flat_map(|file| retained(file))
            .collect();
        if !unguarded.is_empty() {
            blocks.push(RegistryBlock {
                guard: None,
                identifiers: unguarded.into_iter().collect(),
            });
        }

        for file in files.iter().filter(|file| file.is_guarded()) {
            blocks.push(RegistryBlock {
                guard: file.guard.clone(),
                identifiers: retained(file).into_iter().collect(),
            });
        }

        Self { blocks }
    }

    pub fn entry_count(&self) -> usize {
        self.blocks.iter().map(|block| block.identifiers.len()).sum()
    }
}

#[derive(Serialize)]
struct BlockContext<'a> {
    guard: &'a str,
    macro_name: &'a str,
    entries: Vec<RegistryEntry>,
}

pub struct RegistryRenderer {
    renderer: FragmentRenderer,
    macro_name: &'static str,
}

impl RegistryRenderer {
    pub fn new(macro_name: &'static str) -> GenResult<Self> {
        Ok(Self {
            renderer: FragmentRenderer::new(&[("block", BLOCK_TEMPLATE)])?,
            macro_name,
        })
    }

    pub fn type_registry() -> GenResult<Self> {
        Self::new(TYPE_REGISTRY_MACRO)
    }

    pub fn type_converter() -> GenResult<Self> {
        Self::new(TYPE_CONVERTER_MACRO)
    }

    /// One fragment per block.
    pub fn render(&self, plan: &RegistryPlan) -> GenResult<Vec<String>> {
        let fragments = plan
            .blocks
            .iter()
            .map(|block| {
                let context = BlockContext {
                    guard: block.guard.as_deref().unwrap_or_default(),
                    macro_name: self.macro_name,
                    entries: block
                        .identifiers
                        .iter()
                        .map(|name| RegistryEntry::from_identifier(name))
                        .collect(),
                };
                self.renderer.render("block", &context)
            })
            .collect::<GenResult<Vec<_>>>()?;

        tracing::debug!(
            macro_name = self.macro_name,
            blocks = plan.blocks.len(),
            entries = plan.entry_count(),
            "rendered registry blocks"
        );
        Ok(fragments)
    }
}
