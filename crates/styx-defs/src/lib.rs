//! # Styx runner contracts
//!
//! Backend-neutral abstractions used by generated tool wrappers to execute a
//! single command invocation. A [`Runner`] hands out one [`Execution`] per
//! logical invocation; the wrapper registers inputs, resolves outputs and
//! finally calls [`Execution::run`] with the tool's argument vector.
//!
//! ```rust
//! use styx_defs::Metadata;
//!
//! let metadata = Metadata::new("skullstrip").with_container_image_tag("bet:7.4");
//! assert_eq!(metadata.container_image_tag.as_deref(), Some("bet:7.4"));
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Receives one line of process output at a time, without its terminator.
pub type LineSink<'a> = Box<dyn FnMut(&str) + Send + 'a>;

/// Static description of the tool being invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub container_image_tag: Option<String>,
}

impl Metadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container_image_tag: None,
        }
    }

    pub fn with_container_image_tag(mut self, tag: impl Into<String>) -> Self {
        self.container_image_tag = Some(tag.into());
        self
    }
}

/// One in-flight tool invocation.
pub trait Execution {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Make a host file available to the tool and return the path the tool
    /// should use to refer to it.
    ///
    /// With `resolve_parent` the whole parent directory is made available so
    /// that sibling files stay reachable. `mutable` grants write access.
    fn input_file(&mut self, host_file: &Path, resolve_parent: bool, mutable: bool) -> String;

    /// Host path at which the tool's output `local_file` will appear.
    ///
    /// `optional` only documents intent; no filesystem check happens here.
    fn output_file(&self, local_file: &str, optional: bool) -> PathBuf;

    /// Run the tool. Blocks until the process has exited and all output has
    /// been delivered to the sinks. `None` selects the backend's default sink.
    fn run(
        &mut self,
        cargs: &[String],
        handle_stdout: Option<LineSink<'_>>,
        handle_stderr: Option<LineSink<'_>>,
    ) -> Result<(), Self::Error>;
}

/// Factory for executions.
pub trait Runner {
    type Execution: Execution;
    type Error: std::error::Error + Send + Sync + 'static;

    fn start_execution(&mut self, metadata: &Metadata) -> Result<Self::Execution, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_deserializes_without_image_tag() {
        let metadata: Metadata = serde_json::from_str(r#"{"name": "bet"}"#).unwrap();
        assert_eq!(metadata.name, "bet");
        assert!(metadata.container_image_tag.is_none());
    }

    #[test]
    fn metadata_uses_camel_case_keys() {
        let metadata = Metadata::new("bet").with_container_image_tag("bet:7.4");
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["containerImageTag"], "bet:7.4");
    }
}
