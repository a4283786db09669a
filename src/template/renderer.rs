//! Fragment rendering on top of Tera.
//!
//! Each generator target owns a handful of small raw templates (one per
//! emitted construct). A [`FragmentRenderer`] registers them once and renders
//! them from any `Serialize` context. Autoescaping is disabled: the output is
//! C++ source, not markup.

use crate::error::{GenError, GenResult};
use serde::Serialize;
use tera::{Context, Tera};

pub struct FragmentRenderer {
    tera: Tera,
}

impl FragmentRenderer {
    /// Register `(name, source)` templates.
    pub fn new(templates: &[(&str, &str)]) -> GenResult<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        tera.add_raw_templates(templates.iter().copied())
            .map_err(|source| GenError::Template {
                name: templates
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", "),
                source,
            })?;
        Ok(Self { tera })
    }

    /// Render `name` with the fields of `context` as template variables.
    ///
    /// Surrounding newlines are trimmed so that the assembler alone decides
    /// how fragments are separated.
    pub fn render<C: Serialize>(&self, name: &str, context: &C) -> GenResult<String> {
        let context = Context::from_serialize(context).map_err(|source| GenError::Template {
            name: name.to_string(),
            source,
        })?;
        let output = self
            .tera
            .render(name, &context)
            .map_err(|source| GenError::Template {
                name: name.to_string(),
                source,
            })?;
        Ok(output.trim_matches('\n').to_string())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|registered| registered == name)
    }
}
