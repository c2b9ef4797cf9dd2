use crate::command::{docker_command_args, DockerPolicy, RUN_SCRIPT};
use crate::error::{CommandFailure, StyxDockerError};
use crate::mount::{InputMount, INPUT_ROOT, OUTPUT_ROOT};
use crate::pump;
use crate::shell::shell_join;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use styx_defs::{Execution, LineSink, Metadata};
use tracing::{debug, info};

/// One container invocation created by [`crate::DockerRunner`].
#[derive(Debug)]
pub struct DockerExecution {
    policy: Arc<DockerPolicy>,
    metadata: Metadata,
    container_tag: String,
    output_dir: PathBuf,
    input_mounts: Vec<InputMount>,
    input_file_next_id: u64,
}

impl DockerExecution {
    pub(crate) fn new(
        policy: Arc<DockerPolicy>,
        metadata: Metadata,
        container_tag: String,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            policy,
            metadata,
            container_tag,
            output_dir,
            input_mounts: Vec::new(),
            input_file_next_id: 0,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Image actually passed to the engine, after overrides.
    pub fn container_tag(&self) -> &str {
        &self.container_tag
    }

    pub fn input_mounts(&self) -> &[InputMount] {
        &self.input_mounts
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn write_run_script(&self, cargs: &[String]) -> io::Result<PathBuf> {
        let path = self.output_dir.join(RUN_SCRIPT);
        fs::write(&path, format!("#!/bin/bash\n{}\n", shell_join(cargs)))?;
        Ok(path)
    }

    /// Engine command line for the current set of mounts. Relative host paths
    /// are resolved against the current directory.
    pub fn docker_args(&self) -> io::Result<Vec<String>> {
        let mut mounts = Vec::with_capacity(self.input_mounts.len() + 1);
        for mount in &self.input_mounts {
            mounts.push(InputMount {
                host_path: std::path::absolute(&mount.host_path)?,
                ..mount.clone()
            });
        }
        mounts.push(InputMount::new(
            std::path::absolute(&self.output_dir)?,
            OUTPUT_ROOT,
            true,
        ));
        Ok(docker_command_args(
            &self.policy,
            &mounts,
            &self.container_tag,
        ))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Execution for DockerExecution {
    type Error = StyxDockerError;

    fn input_file(&mut self, host_file: &Path, resolve_parent: bool, mutable: bool) -> String {
        let slot = format!("{}/{}", INPUT_ROOT, self.input_file_next_id);
        self.input_file_next_id += 1;

        let name = file_name(host_file);
        let container_file = format!("{}/{}", slot, name);

        if resolve_parent {
            let parent = match host_file.parent() {
                Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
                Some(parent) => parent,
                None => host_file,
            };
            self.input_mounts
                .push(InputMount::new(parent, slot, mutable));
        } else {
            self.input_mounts
                .push(InputMount::new(host_file, container_file.clone(), mutable));
        }

        container_file
    }

    fn output_file(&self, local_file: &str, _optional: bool) -> PathBuf {
        self.output_dir.join(local_file)
    }

    fn run(
        &mut self,
        cargs: &[String],
        handle_stdout: Option<LineSink<'_>>,
        handle_stderr: Option<LineSink<'_>>,
    ) -> Result<(), StyxDockerError> {
        fs::create_dir_all(&self.output_dir)?;
        self.write_run_script(cargs)?;

        let docker_args = self.docker_args()?;
        debug!("Running docker: {}", shell_join(&docker_args));
        debug!("Running command: {}", shell_join(cargs));

        let start = Instant::now();
        let status = pump::run_streaming(&docker_args, handle_stdout, handle_stderr)?;
        let elapsed = Duration::from_millis(start.elapsed().as_millis() as u64);
        info!(
            "Executed {} in {}",
            self.metadata.name,
            humantime::format_duration(elapsed)
        );

        if status.success() {
            Ok(())
        } else {
            Err(StyxDockerError::CommandFailed(CommandFailure::new(
                status,
                docker_args,
                cargs.to_vec(),
            )))
        }
    }
}
