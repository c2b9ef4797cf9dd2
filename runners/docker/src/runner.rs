use crate::command::DockerPolicy;
use crate::config::DockerRunnerConfig;
use crate::error::StyxDockerError;
use crate::execution::DockerExecution;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use styx_defs::{Metadata, Runner};
use tracing::debug;
use uuid::Uuid;

/// Hands out one [`DockerExecution`] per tool invocation.
///
/// Not meant to be shared between threads: starting an execution mutates
/// the execution counter.
#[derive(Debug)]
pub struct DockerRunner {
    policy: Arc<DockerPolicy>,
    image_overrides: HashMap<String, String>,
    data_dir: PathBuf,
    instance_id: String,
    execution_counter: u64,
}

impl Default for DockerRunner {
    fn default() -> Self {
        Self::new(DockerRunnerConfig::default())
    }
}

impl DockerRunner {
    pub fn new(config: DockerRunnerConfig) -> Self {
        let instance_id = Uuid::new_v4().simple().to_string()[..16].to_string();
        debug!(
            "Created docker runner {} (data dir {})",
            instance_id,
            config.data_dir.display()
        );
        Self {
            policy: Arc::new(DockerPolicy {
                docker_executable: config.docker_executable,
                docker_user_id: config.docker_user_id,
                environ: config.environ,
            }),
            image_overrides: config.image_overrides,
            data_dir: config.data_dir,
            instance_id,
            execution_counter: 0,
        }
    }

    /// Random id that keeps output directories of different runners apart.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Number of executions started so far.
    pub fn execution_counter(&self) -> u64 {
        self.execution_counter
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn policy(&self) -> &DockerPolicy {
        &self.policy
    }

    pub fn resolve_image<'a>(&'a self, tag: &'a str) -> &'a str {
        self.image_overrides
            .get(tag)
            .map(String::as_str)
            .unwrap_or(tag)
    }
}

impl Runner for DockerRunner {
    type Execution = DockerExecution;
    type Error = StyxDockerError;

    fn start_execution(&mut self, metadata: &Metadata) -> Result<DockerExecution, StyxDockerError> {
        let tag = metadata
            .container_image_tag
            .as_deref()
            .filter(|tag| !tag.trim().is_empty())
            .ok_or_else(|| StyxDockerError::MissingImageTag {
                name: metadata.name.clone(),
            })?;
        let container_tag = self.resolve_image(tag).to_string();

        let index = self.execution_counter;
        self.execution_counter += 1;

        let output_dir = self
            .data_dir
            .join(format!("{}-{}-{}", self.instance_id, index, metadata.name));

        Ok(DockerExecution::new(
            Arc::clone(&self.policy),
            metadata.clone(),
            container_tag,
            output_dir,
        ))
    }
}
