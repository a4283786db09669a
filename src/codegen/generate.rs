//! End-to-end generation run.
//!
//! Stages run in sequence: render every selected target (including the node
//! id fetch), stage and format every header, then commit. Any failure before
//! the commit leaves the output tree exactly as it was.

use crate::codegen::attributes::AttributeRenderer;
use crate::codegen::descriptor::{ATTRIBUTES, AttributeDescriptor, DescriptorTable};
use crate::codegen::exclusion::ExclusionSet;
use crate::codegen::nodeids::{NodeIdRenderer, NodeIdTable};
use crate::codegen::output::{HeaderRecord, HeaderTransaction};
use crate::codegen::registry::{RegistryPlan, RegistryRenderer};
use crate::codegen::schema::{SchemaSource, load_schema_files};
use crate::codegen::target::Target;
use crate::config::{GenerateConfig, WriteMode};
use crate::error::GenResult;
use crate::logging::stage_span;
use serde::Serialize;
use std::path::PathBuf;
use strum::Display;
use tracing::Instrument;

/// Constant tables the generator reads; never mutated.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorInputs<'a> {
    pub descriptors: &'a [AttributeDescriptor],
    pub exclusions: &'a ExclusionSet,
}

impl<'a> GeneratorInputs<'a> {
    /// Embedded descriptor table with the given exclusions.
    pub fn with_exclusions(exclusions: &'a ExclusionSet) -> Self {
        Self {
            descriptors: ATTRIBUTES,
            exclusions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TargetStatus {
    Written,
    Unchanged,
    /// Check mode: on-disk header differs.
    Stale,
    /// Check mode: on-disk header matches.
    UpToDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub target: Target,
    pub path: PathBuf,
    pub digest: String,
    pub status: TargetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub mode: WriteMode,
    pub targets: Vec<TargetReport>,
}

impl GenerationReport {
    pub fn stale(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets
            .iter()
            .filter(|report| report.status == TargetStatus::Stale)
    }

    pub fn is_stale(&self) -> bool {
        self.stale().next().is_some()
    }

    pub fn status_of(&self, target: Target) -> Option<TargetStatus> {
        self.targets
            .iter()
            .find(|report| report.target == target)
            .map(|report| report.status)
    }
}

/// Render, format and write (or check) every configured target.
pub async fn generate(
    config: &GenerateConfig,
    inputs: &GeneratorInputs<'_>,
) -> GenResult<GenerationReport> {
    config.validate()?;

    let mut rendered = Vec::with_capacity(config.targets.len());
    for &target in &config.targets {
        let fragments = render_target(config, inputs, target)
            .instrument(stage_span("render", target.as_str()))
            .await?;
        let content = target.skeleton().assemble(&fragments);
        rendered.push((target, content));
    }

    let mut transaction = match config.mode {
        WriteMode::Write => HeaderTransaction::new(config.formatter.clone()),
        WriteMode::Check => HeaderTransaction::dry_run(config.formatter.clone()),
    };
    for (target, content) in &rendered {
        let _span = stage_span("stage", target.as_str()).entered();
        transaction.stage(&config.target_path(*target), content)?;
    }

    let (records, statuses) = match config.mode {
        WriteMode::Write => (
            transaction.commit()?,
            (TargetStatus::Written, TargetStatus::Unchanged),
        ),
        WriteMode::Check => (
            transaction.discard(),
            (TargetStatus::Stale, TargetStatus::UpToDate),
        ),
    };

    let targets = rendered
        .iter()
        .map(|(target, _)| *target)
        .zip(records)
        .map(|(target, record)| report_for(target, record, config.mode, statuses))
        .collect::<Vec<_>>();

    for report in &targets {
        tracing::info!(
            header = report.target.as_str(),
            path = %report.path.display(),
            status = %report.status,
            digest = %report.digest,
            "header processed"
        );
    }

    Ok(GenerationReport {
        mode: config.mode,
        targets,
    })
}

fn report_for(
    target: Target,
    record: HeaderRecord,
    mode: WriteMode,
    (changed, same): (TargetStatus, TargetStatus),
) -> TargetReport {
    let diff = (mode == WriteMode::Check && !record.unchanged).then(|| record.diff());
    TargetReport {
        target,
        status: if record.unchanged { same } else { changed },
        digest: record.digest,
        path: record.target,
        diff,
    }
}

/// Body fragments of one target.
pub async fn render_target(
    config: &GenerateConfig,
    inputs: &GeneratorInputs<'_>,
    target: Target,
) -> GenResult<Vec<String>> {
    match target {
        Target::Attributes => {
            let table = DescriptorTable::new(inputs.descriptors)?;
            AttributeRenderer::new()?.render(&table)
        }
        Target::TypeRegistry => {
            let plan = registry_plan(config, &config.type_registry_schemas, inputs.exclusions)?;
            RegistryRenderer::type_registry()?.render(&plan)
        }
        Target::TypeConverter => {
            let plan = registry_plan(config, &config.type_converter_schemas, inputs.exclusions)?;
            RegistryRenderer::type_converter()?.render(&plan)
        }
        Target::NodeIds => {
            tracing::info!(source = %config.node_ids.describe(), "loading node id table");
            let content = config.node_ids.fetch().await?;
            let table = NodeIdTable::parse(&content)?;
            tracing::debug!(rows = table.row_count(), "parsed node id table");
            NodeIdRenderer::new()?.render(&table)
        }
    }
}

fn registry_plan(
    config: &GenerateConfig,
    sources: &[SchemaSource],
    exclusions: &ExclusionSet,
) -> GenResult<RegistryPlan> {
    let resolved: Vec<SchemaSource> = sources
        .iter()
        .map(|source| source.resolve(&config.schema_dir))
        .collect();
    let files = exclusions.apply_all(&load_schema_files(&resolved)?);
    Ok(RegistryPlan::build(&files, exclusions))
}
