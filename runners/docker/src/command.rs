use crate::mount::{InputMount, OUTPUT_ROOT};
use std::collections::BTreeMap;

/// Name of the generated script inside the output directory.
pub const RUN_SCRIPT: &str = "run.sh";
const ENTRYPOINT: &str = "/bin/bash";

/// Runner-level settings applied to every container invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerPolicy {
    pub docker_executable: String,
    pub docker_user_id: Option<u32>,
    pub environ: BTreeMap<String, String>,
}

/// Assemble the full engine command line, executable first.
///
/// `mounts` is used in order; the caller appends the output directory mount.
pub fn docker_command_args(policy: &DockerPolicy, mounts: &[InputMount], image: &str) -> Vec<String> {
    let mut args = vec![
        policy.docker_executable.clone(),
        "run".to_string(),
        "--rm".to_string(),
    ];

    if let Some(uid) = policy.docker_user_id {
        args.push("-u".to_string());
        args.push(uid.to_string());
    }

    args.push("-w".to_string());
    args.push(OUTPUT_ROOT.to_string());

    for mount in mounts {
        args.push("--mount".to_string());
        args.push(mount.descriptor());
    }

    args.push("--entrypoint".to_string());
    args.push(ENTRYPOINT.to_string());

    for (key, value) in &policy.environ {
        args.push("--env".to_string());
        args.push(format!("{}={}", key, value));
    }

    args.push(image.to_string());
    args.push(format!("./{}", RUN_SCRIPT));
    args
}
