//! Maintenance tools shipped alongside the generator.
//!
//! None of these take part in header generation; they are plain text and
//! process utilities exposed as subcommands.

pub mod format_sources;
pub mod run_examples;
pub mod strip_comments;
pub mod update_includes;

pub use format_sources::format_sources;
pub use run_examples::{EXAMPLE_PAIRS, ExamplePair, PairOutcome, RunnerTimings, run_examples};
pub use strip_comments::{StripReport, strip_comments};
pub use update_includes::{load_deprecations, update_includes};
