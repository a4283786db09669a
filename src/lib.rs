pub mod codegen;
pub mod config;
pub mod error;
pub mod logging;
pub mod template;
pub mod tools;

pub use codegen::{
    ATTRIBUTES, ExclusionSet, GenerationReport, GeneratorInputs, Target, TargetStatus, generate,
};
pub use config::{CliArgs, Command, GenerateArgs, GenerateConfig, WriteMode};
pub use error::{ErrorKind, GenError, GenResult};
pub use logging::{LoggingConfig, init_logging};
