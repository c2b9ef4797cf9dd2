//! Docker backend for styx runners.
//!
//! Each [`DockerExecution`] maps its registered inputs into numbered slots
//! under `/styx_input`, writes the tool's command line into `run.sh` inside
//! its output directory, and runs that script in a throw-away container with
//! the output directory bound at `/styx_output`. Container output is streamed
//! line by line to caller-supplied sinks or, by default, to `tracing`.
//!
//! ```no_run
//! use std::path::Path;
//! use styx_defs::{Execution, Metadata, Runner};
//! use styx_docker::{DockerRunner, DockerRunnerConfig};
//!
//! # fn main() -> Result<(), styx_docker::StyxDockerError> {
//! let mut runner = DockerRunner::new(DockerRunnerConfig::default());
//! let metadata = Metadata::new("skullstrip").with_container_image_tag("bet:7.4");
//! let mut execution = runner.start_execution(&metadata)?;
//!
//! let input = execution.input_file(Path::new("/data/t1.nii.gz"), false, false);
//! let output = execution.output_file("out.nii.gz", false);
//! execution.run(&["bet".into(), input, "out.nii.gz".into()], None, None)?;
//! println!("{}", output.display());
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod execution;
pub mod mount;
pub mod pump;
pub mod runner;
pub mod shell;

pub use command::{docker_command_args, DockerPolicy};
pub use config::DockerRunnerConfig;
pub use error::{CommandFailure, ConfigError, StyxDockerError};
pub use execution::DockerExecution;
pub use mount::{docker_mount, InputMount, INPUT_ROOT, OUTPUT_ROOT};
pub use runner::DockerRunner;
pub use shell::{shell_escape, shell_join};
