use crate::codegen::nodeids::{DEFAULT_NODE_IDS_URL, DEFAULT_USER_AGENT, NodeIdSource};
use crate::codegen::output::FormatterCommand;
use crate::codegen::schema::SchemaSource;
use crate::codegen::target::{Target, default_type_converter_schemas, default_type_registry_schemas};
use crate::error::{GenError, GenResult};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_ROOT: &str = "include/open62541pp";
pub const DEFAULT_SCHEMA_DIR: &str = "3rdparty/open62541/tools/schema";
pub const DEFAULT_FORMATTER: &str = "clang-format -i";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Replace changed headers.
    Write,
    /// Compare against the headers on disk; write nothing.
    Check,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "opcua-headergen",
    about = "Generate the open62541pp C++ headers from schema data",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        env = "OPCUA_HEADERGEN_CONFIG",
        value_name = "FILE",
        help = "Path to a configuration file (YAML, JSON or TOML)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase log verbosity (-v debug, -vv trace)",
        global = true
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Regenerate the headers
    Generate(GenerateArgs),
    /// Rewrite doc comments and strip export macros in third-party C headers
    StripComments(StripCommentsArgs),
    /// Run the example server/client pairs
    RunExamples(RunExamplesArgs),
    /// Replace deprecated include paths
    UpdateIncludes(UpdateIncludesArgs),
    /// Run the formatter over the project sources
    FormatSources(FormatSourcesArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct GenerateArgs {
    #[arg(
        long,
        env = "OPCUA_HEADERGEN_OUTPUT_ROOT",
        value_name = "DIR",
        help = "Directory the header paths are relative to"
    )]
    pub output_root: Option<PathBuf>,

    #[arg(
        long,
        env = "OPCUA_HEADERGEN_SCHEMA_DIR",
        value_name = "DIR",
        help = "Directory relative schema file paths resolve against"
    )]
    pub schema_dir: Option<PathBuf>,

    #[arg(
        long = "target",
        env = "OPCUA_HEADERGEN_TARGETS",
        value_enum,
        value_name = "TARGET",
        value_delimiter = ',',
        help = "Headers to generate (default: attributes,type-registry,node-ids)"
    )]
    pub targets: Option<Vec<Target>>,

    #[arg(
        long,
        env = "OPCUA_HEADERGEN_NODE_IDS_URL",
        value_name = "URL",
        help = "Where to fetch the node id table from"
    )]
    pub node_ids_url: Option<String>,

    #[arg(
        long,
        env = "OPCUA_HEADERGEN_NODE_IDS_FILE",
        value_name = "FILE",
        conflicts_with = "node_ids_url",
        help = "Read the node id table from a local file instead"
    )]
    pub node_ids_file: Option<PathBuf>,

    #[arg(
        long,
        env = "OPCUA_HEADERGEN_USER_AGENT",
        value_name = "AGENT",
        help = "User-Agent sent when fetching the node id table"
    )]
    pub user_agent: Option<String>,

    #[arg(
        long,
        env = "OPCUA_HEADERGEN_FORMATTER",
        value_name = "COMMAND",
        help = "Formatter run in place on every generated header"
    )]
    pub formatter: Option<String>,

    #[arg(long, help = "Do not run the formatter")]
    pub no_format: bool,

    #[arg(long, help = "Report stale headers instead of writing them")]
    pub check: bool,

    #[arg(long, help = "Print the generation report as JSON")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StripCommentsArgs {
    #[arg(value_name = "DIR", help = "Directory whose .h files are rewritten")]
    pub dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct RunExamplesArgs {
    #[arg(value_name = "BIN_DIR", help = "Directory containing the example executables")]
    pub bin_dir: PathBuf,

    #[arg(long, default_value_t = 1.0, value_name = "SECS")]
    pub wait_server: f64,

    #[arg(long, default_value_t = 3.0, value_name = "SECS")]
    pub wait_client: f64,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateIncludesArgs {
    #[arg(
        long,
        default_value = "CMakeLists.txt",
        value_name = "FILE",
        help = "CMake file declaring deprecated_header(<old> <new>) entries"
    )]
    pub cmake_lists: PathBuf,

    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct FormatSourcesArgs {
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub root: PathBuf,

    #[arg(
        long,
        env = "OPCUA_HEADERGEN_FORMATTER",
        value_name = "COMMAND",
        default_value = DEFAULT_FORMATTER
    )]
    pub formatter: String,
}

/// Fully resolved generator configuration.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub output_root: PathBuf,
    pub schema_dir: PathBuf,
    pub targets: Vec<Target>,
    pub node_ids: NodeIdSource,
    /// `None` when formatting is disabled.
    pub formatter: Option<FormatterCommand>,
    pub mode: WriteMode,
    pub type_registry_schemas: Vec<SchemaSource>,
    pub type_converter_schemas: Vec<SchemaSource>,
}

impl GenerateConfig {
    /// Defaults rooted at `output_root`, formatting disabled.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            schema_dir: PathBuf::from(DEFAULT_SCHEMA_DIR),
            targets: Target::DEFAULTS.to_vec(),
            node_ids: NodeIdSource::Url {
                url: DEFAULT_NODE_IDS_URL.to_string(),
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            formatter: None,
            mode: WriteMode::Write,
            type_registry_schemas: default_type_registry_schemas(),
            type_converter_schemas: default_type_converter_schemas(),
        }
    }

    /// Merge CLI (and environment) over the configuration file over defaults.
    pub fn from_args(args: GenerateArgs, config_file: Option<&Path>) -> Result<Self> {
        let GenerateArgs {
            output_root: cli_output_root,
            schema_dir: cli_schema_dir,
            targets: cli_targets,
            node_ids_url: cli_node_ids_url,
            node_ids_file: cli_node_ids_file,
            user_agent: cli_user_agent,
            formatter: cli_formatter,
            no_format,
            check,
            json: _,
        } = args;

        let file_config = match config_file {
            Some(path) => load_config_file(path)?,
            None => PartialConfig::default(),
        };

        let PartialConfig {
            output_root: file_output_root,
            schema_dir: file_schema_dir,
            targets: file_targets,
            node_ids_url: file_node_ids_url,
            node_ids_file: file_node_ids_file,
            user_agent: file_user_agent,
            formatter: file_formatter,
            format: file_format,
            type_registry_schemas: file_registry_schemas,
            type_converter_schemas: file_converter_schemas,
        } = file_config;

        let output_root = cli_output_root
            .or(file_output_root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT));

        let schema_dir = cli_schema_dir
            .or(file_schema_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_DIR));

        let mut targets = cli_targets
            .or(file_targets)
            .unwrap_or_else(|| Target::DEFAULTS.to_vec());
        targets.sort();
        targets.dedup();

        anyhow::ensure!(!targets.is_empty(), "at least one target must be selected");

        // A CLI source of either kind overrides both file settings.
        let cli_source = cli_node_ids_url.is_some() || cli_node_ids_file.is_some();
        let (url, file) = if cli_source {
            (cli_node_ids_url, cli_node_ids_file)
        } else {
            (file_node_ids_url, file_node_ids_file)
        };
        anyhow::ensure!(
            url.is_none() || file.is_none(),
            "node id table source is ambiguous: both a URL and a file are configured"
        );
        let node_ids = match file {
            Some(path) => NodeIdSource::File(path),
            None => NodeIdSource::Url {
                url: url.unwrap_or_else(|| DEFAULT_NODE_IDS_URL.to_string()),
                user_agent: cli_user_agent
                    .or(file_user_agent)
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            },
        };

        let format_enabled = !no_format && file_format.unwrap_or(true);
        let formatter = if format_enabled {
            let command = cli_formatter
                .or(file_formatter)
                .unwrap_or_else(|| DEFAULT_FORMATTER.to_string());
            Some(FormatterCommand::parse(&command)?)
        } else {
            None
        };

        let config = Self {
            output_root,
            schema_dir,
            targets,
            node_ids,
            formatter,
            mode: if check {
                WriteMode::Check
            } else {
                WriteMode::Write
            },
            type_registry_schemas: file_registry_schemas
                .unwrap_or_else(default_type_registry_schemas),
            type_converter_schemas: file_converter_schemas
                .unwrap_or_else(default_type_converter_schemas),
        };
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on settings that would only surface mid-run.
    pub fn validate(&self) -> GenResult<()> {
        if self.targets.is_empty() {
            return Err(GenError::config("no targets selected"));
        }
        if self.output_root.is_file() {
            return Err(GenError::config(format!(
                "output root {} is a file",
                self.output_root.display()
            )));
        }
        for target in [Target::TypeRegistry, Target::TypeConverter] {
            if !self.targets.contains(&target) {
                continue;
            }
            let sources = self.schemas_for(target);
            if sources.is_empty() {
                return Err(GenError::config(format!("no schema files configured for {target}")));
            }
            for source in sources {
                source.validate()?;
            }
        }
        if let NodeIdSource::Url { url, .. } = &self.node_ids {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(GenError::config(format!(
                    "node id URL must be http(s), got {url:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn target_path(&self, target: Target) -> PathBuf {
        self.output_root.join(target.relative_path())
    }

    pub fn schemas_for(&self, target: Target) -> &[SchemaSource] {
        match target {
            Target::TypeRegistry => &self.type_registry_schemas,
            Target::TypeConverter => &self.type_converter_schemas,
            Target::Attributes | Target::NodeIds => &[],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    output_root: Option<PathBuf>,
    schema_dir: Option<PathBuf>,
    targets: Option<Vec<Target>>,
    node_ids_url: Option<String>,
    node_ids_file: Option<PathBuf>,
    user_agent: Option<String>,
    formatter: Option<String>,
    format: Option<bool>,
    type_registry_schemas: Option<Vec<SchemaSource>>,
    type_converter_schemas: Option<Vec<SchemaSource>>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        "toml" => toml::from_str(&contents)
            .with_context(|| format!("failed to parse TOML config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
