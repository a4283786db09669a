//! End-to-end generation runs against a temporary output tree.

use assert_matches::assert_matches;
use opcua_headergen::codegen::output::FormatterCommand;
use opcua_headergen::codegen::{NodeIdSource, SchemaSource, Target, TargetStatus};
use opcua_headergen::{
    ErrorKind, ExclusionSet, GenError, GenerateConfig, GeneratorInputs, WriteMode, generate,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const NODE_IDS: &str = "Boolean,1,DataType\nHasComponent,47,ReferenceType\nServer,2253,Object\n";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let schema = dir.path().join("schema");
        fs::create_dir_all(&schema).unwrap();
        fs::write(schema.join("datatypes_minimal.txt"), "ReadRequest\nDouble\nArgument\n").unwrap();
        fs::write(schema.join("datatypes_pubsub.txt"), "PubSubState\nDuration\n").unwrap();
        fs::write(dir.path().join("NodeIds.csv"), NODE_IDS).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn out(&self) -> std::path::PathBuf {
        self.root().join("include/open62541pp")
    }

    fn config(&self) -> GenerateConfig {
        let mut config = GenerateConfig::new(self.out());
        config.schema_dir = self.root().join("schema");
        config.node_ids = NodeIdSource::File(self.root().join("NodeIds.csv"));
        config.targets = vec![Target::Attributes, Target::TypeRegistry, Target::TypeConverter, Target::NodeIds];
        config.type_registry_schemas = vec![
            SchemaSource::new("datatypes_minimal.txt"),
            SchemaSource::guarded("datatypes_pubsub.txt", "UA_ENABLE_PUBSUB"),
        ];
        config.type_converter_schemas = vec![SchemaSource::new("datatypes_minimal.txt")];
        config
    }

    fn read(&self, target: Target) -> String {
        fs::read_to_string(self.out().join(target.relative_path())).unwrap()
    }
}

async fn run(config: &GenerateConfig) -> Result<opcua_headergen::GenerationReport, GenError> {
    let exclusions = ExclusionSet::builtin();
    generate(config, &GeneratorInputs::with_exclusions(&exclusions)).await
}

// ============================================================================
// Writing
// ============================================================================

#[tokio::test]
async fn test_generates_every_target() {
    let fixture = Fixture::new();
    let report = run(&fixture.config()).await.unwrap();

    assert_eq!(report.targets.len(), 4);
    assert!(report.targets.iter().all(|t| t.status == TargetStatus::Written));
    assert!(report.targets.iter().all(|t| t.digest.len() == 64));

    let registry = fixture.read(Target::TypeRegistry);
    assert!(registry.contains("#include \"open62541pp/typeregistry.hpp\""));
    assert!(registry.contains("UAPP_TYPEREGISTRY_NATIVE(UA_Argument, UA_TYPES_ARGUMENT)"));
    assert!(registry.contains("#ifdef UA_ENABLE_PUBSUB\n#ifdef UA_TYPES_PUBSUBSTATE\n"));
    assert!(!registry.contains("UA_Double,"));
    assert!(!registry.contains("UA_Duration,"));

    let converter = fixture.read(Target::TypeConverter);
    assert!(converter.contains("UAPP_TYPECONVERTER_NATIVE(UA_ReadRequest, UA_TYPES_READREQUEST)"));

    let node_ids = fixture.read(Target::NodeIds);
    assert!(node_ids.contains("#pragma GCC diagnostic ignored \"-Wshadow\""));
    assert!(node_ids.contains("enum class ObjectId : uint32_t {\n    Server = 2253,\n};"));
    assert!(node_ids.ends_with("#pragma GCC diagnostic pop\n#endif\n"));

    let attributes = fixture.read(Target::Attributes);
    assert!(attributes.contains("namespace opcua::services {"));
    assert!(attributes.contains("readDataTypeDefinition("));
    assert!(!attributes.contains("writeDataTypeDefinition("));
}

#[tokio::test]
async fn test_second_run_is_unchanged_and_byte_identical() {
    let fixture = Fixture::new();
    let config = fixture.config();
    run(&config).await.unwrap();
    let first: Vec<String> = config.targets.iter().map(|t| fixture.read(*t)).collect();

    let report = run(&config).await.unwrap();
    let second: Vec<String> = config.targets.iter().map(|t| fixture.read(*t)).collect();

    assert_eq!(first, second);
    assert!(report.targets.iter().all(|t| t.status == TargetStatus::Unchanged));
}

#[tokio::test]
async fn test_output_root_contains_only_headers() {
    let fixture = Fixture::new();
    run(&fixture.config()).await.unwrap();

    let mut files: Vec<_> = walkdir::WalkDir::new(fixture.out())
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().strip_prefix(fixture.out()).unwrap().to_path_buf())
        .collect();
    files.sort();
    let mut expected: Vec<_> = fixture.config().targets.iter().map(|t| t.relative_path()).collect();
    expected.sort();
    assert_eq!(files, expected);
}

// ============================================================================
// Failure leaves the tree untouched
// ============================================================================

#[tokio::test]
async fn test_missing_schema_file_names_path_and_writes_nothing() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.type_registry_schemas.push(SchemaSource::new("datatypes_absent.txt"));

    let err = run(&config).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaRead);
    assert!(err.to_string().contains("datatypes_absent.txt"));
    assert!(!fixture.out().exists());
}

#[tokio::test]
async fn test_malformed_node_id_row_writes_nothing() {
    let fixture = Fixture::new();
    fs::write(fixture.root().join("NodeIds.csv"), "Good,1,Object\nBad,x,Object\n").unwrap();

    let err = run(&fixture.config()).await.unwrap_err();
    assert_matches!(err, GenError::MalformedRow { row: 2, .. });
    assert!(!fixture.out().join("services/attribute_highlevel.hpp").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_formatter_leaves_existing_headers() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    run(&config).await.unwrap();
    let before = fixture.read(Target::NodeIds);

    fs::write(fixture.root().join("NodeIds.csv"), "Other,5,Method\n").unwrap();
    config.formatter = Some(FormatterCommand {
        program: "false".to_string(),
        args: Vec::new(),
    });

    let err = run(&config).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Formatter);
    assert_eq!(fixture.read(Target::NodeIds), before);

    let leftovers = fs::read_dir(fixture.out().join("ua"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".headergen-"))
        .count();
    assert_eq!(leftovers, 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_formatter_on_fresh_tree_creates_no_directories() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.formatter = Some(FormatterCommand {
        program: "false".to_string(),
        args: Vec::new(),
    });

    let err = run(&config).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Formatter);
    assert!(!fixture.root().join("include").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_formatter_runs_on_staged_hpp_file() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.targets = vec![Target::NodeIds];
    config.formatter = Some(FormatterCommand {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            "case \"$0\" in *.hpp) printf '// formatted\\n' >> \"$0\" ;; *) exit 3 ;; esac".to_string(),
        ],
    });

    let report = run(&config).await.unwrap();
    assert_eq!(report.status_of(Target::NodeIds), Some(TargetStatus::Written));
    assert!(fixture.read(Target::NodeIds).ends_with("#endif\n// formatted\n"));

    let report = run(&config).await.unwrap();
    assert_eq!(report.status_of(Target::NodeIds), Some(TargetStatus::Unchanged));
}

// ============================================================================
// Check mode
// ============================================================================

#[tokio::test]
async fn test_check_mode_reports_stale_without_writing() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    run(&config).await.unwrap();

    config.mode = WriteMode::Check;
    let report = run(&config).await.unwrap();
    assert!(!report.is_stale());
    assert!(report.targets.iter().all(|t| t.status == TargetStatus::UpToDate));

    fs::write(fixture.root().join("NodeIds.csv"), "Renamed,2253,Object\n").unwrap();
    let report = run(&config).await.unwrap();
    assert!(report.is_stale());
    assert_eq!(report.status_of(Target::NodeIds), Some(TargetStatus::Stale));
    assert_eq!(report.status_of(Target::Attributes), Some(TargetStatus::UpToDate));

    let stale = report.stale().next().unwrap();
    let diff = stale.diff.as_deref().unwrap();
    assert!(diff.contains("-    Server = 2253,"));
    assert!(diff.contains("+    Renamed = 2253,"));
    assert!(fixture.read(Target::NodeIds).contains("Server = 2253"));
}

/// Appends a marker when a `.clang-format` exists above the formatted file.
#[cfg(unix)]
fn style_sensitive_formatter() -> FormatterCommand {
    FormatterCommand {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            concat!(
                "d=$(dirname \"$0\"); ",
                "while :; do ",
                "if [ -f \"$d/.clang-format\" ]; then printf '// styled\\n' >> \"$0\"; break; fi; ",
                "[ \"$d\" = / ] && break; d=$(dirname \"$d\"); ",
                "done"
            )
            .to_string(),
        ],
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_check_mode_formats_with_project_style() {
    let fixture = Fixture::new();
    fs::write(fixture.root().join(".clang-format"), "BasedOnStyle: LLVM\n").unwrap();
    let mut config = fixture.config();
    config.formatter = Some(style_sensitive_formatter());

    let report = run(&config).await.unwrap();
    assert_eq!(report.status_of(Target::NodeIds), Some(TargetStatus::Written));
    assert!(fixture.read(Target::NodeIds).ends_with("// styled\n"));

    config.mode = WriteMode::Check;
    let report = run(&config).await.unwrap();
    assert!(!report.is_stale());
    assert!(report.targets.iter().all(|t| t.status == TargetStatus::UpToDate));
}

#[tokio::test]
async fn test_check_mode_on_empty_tree_is_stale() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.mode = WriteMode::Check;

    let report = run(&config).await.unwrap();
    assert_eq!(report.stale().count(), 4);
    assert!(!fixture.out().exists());
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.targets = vec![Target::Attributes];
    let report = run(&config).await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["mode"], "write");
    assert_eq!(json["targets"][0]["target"], "attributes");
    assert_eq!(json["targets"][0]["status"], "written");
    assert!(json["targets"][0].get("diff").is_none());
}
