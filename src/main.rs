use anyhow::Context;
use clap::Parser;
use opcua_headergen::codegen::FormatterCommand;
use opcua_headergen::config::{
    FormatSourcesArgs, RunExamplesArgs, StripCommentsArgs, UpdateIncludesArgs,
};
use opcua_headergen::logging::tool_span;
use opcua_headergen::tools::{self, EXAMPLE_PAIRS, RunnerTimings};
use opcua_headergen::{
    CliArgs, Command, ExclusionSet, GenerateArgs, GenerateConfig, GeneratorInputs, LoggingConfig,
    generate, init_logging,
};
use std::path::Path;
use std::time::Duration;
use tracing::Instrument;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let CliArgs {
        config,
        verbose,
        command,
    } = CliArgs::parse();

    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let _guard = init_logging(LoggingConfig::from_env().with_default_filter(default_filter))?;

    match command {
        Command::Generate(args) => run_generate(args, config.as_deref()).await,
        Command::StripComments(args) => run_strip_comments(args),
        Command::RunExamples(args) => {
            run_examples(args).instrument(tool_span("run-examples")).await
        }
        Command::UpdateIncludes(args) => run_update_includes(args),
        Command::FormatSources(args) => run_format_sources(args),
    }
}

async fn run_generate(args: GenerateArgs, config_file: Option<&Path>) -> anyhow::Result<()> {
    let json = args.json;
    let config = GenerateConfig::from_args(args, config_file)?;
    let exclusions = ExclusionSet::builtin();
    let inputs = GeneratorInputs::with_exclusions(&exclusions);

    let report = generate(&config, &inputs).await.inspect_err(|error| {
        tracing::error!(kind = %error.kind(), %error, "generation failed");
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for target in &report.targets {
            println!("{:<10} {}", target.status, target.path.display());
            if let Some(diff) = &target.diff {
                print!("{diff}");
            }
        }
    }

    let stale = report.stale().count();
    anyhow::ensure!(
        stale == 0,
        "{stale} generated header(s) out of date; rerun without --check"
    );
    Ok(())
}

fn run_strip_comments(args: StripCommentsArgs) -> anyhow::Result<()> {
    let _span = tool_span("strip-comments").entered();
    let report = tools::strip_comments(&args.dir)?;
    for path in &report.rewritten {
        println!("{}", path.display());
    }
    Ok(())
}

async fn run_examples(args: RunExamplesArgs) -> anyhow::Result<()> {
    let timings = RunnerTimings {
        wait_server: Duration::try_from_secs_f64(args.wait_server)
            .context("invalid --wait-server")?,
        wait_client: Duration::try_from_secs_f64(args.wait_client)
            .context("invalid --wait-client")?,
        ..RunnerTimings::default()
    };

    let mut stdout = std::io::stdout();
    let outcomes = tools::run_examples(&args.bin_dir, EXAMPLE_PAIRS, &timings, &mut stdout).await?;
    anyhow::ensure!(
        !outcomes.iter().any(|outcome| outcome.failed()),
        "example run failed"
    );
    Ok(())
}

fn run_update_includes(args: UpdateIncludesArgs) -> anyhow::Result<()> {
    let _span = tool_span("update-includes").entered();
    let deprecations = tools::load_deprecations(&args.cmake_lists)?;
    for (old, new) in &deprecations {
        println!("- {old:40} -> {new}");
    }
    for path in tools::update_includes(&deprecations, &args.files)? {
        println!("updated {}", path.display());
    }
    Ok(())
}

fn run_format_sources(args: FormatSourcesArgs) -> anyhow::Result<()> {
    let _span = tool_span("format-sources").entered();
    let formatter = FormatterCommand::parse(&args.formatter)?;
    for path in tools::format_sources(&args.root, &formatter)? {
        println!("{}", path.display());
    }
    Ok(())
}
