use std::path::PathBuf;

/// Root under which every registered input gets its own numbered slot.
pub const INPUT_ROOT: &str = "/styx_input";
/// Container-side location of the execution's output directory.
pub const OUTPUT_ROOT: &str = "/styx_output";

/// A host path bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMount {
    pub host_path: PathBuf,
    pub container_path: String,
    pub mutable: bool,
}

impl InputMount {
    pub fn new(host_path: impl Into<PathBuf>, container_path: impl Into<String>, mutable: bool) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            mutable,
        }
    }

    /// `--mount` value for this mount.
    pub fn descriptor(&self) -> String {
        docker_mount(
            &self.host_path.to_string_lossy(),
            &self.container_path,
            !self.mutable,
        )
    }
}

fn escape_mount_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build a `--mount` bind descriptor.
///
/// Only `"` and `\` are escaped. Docker splits the value on `,`, so a host
/// path containing a comma yields a descriptor docker will reject.
pub fn docker_mount(host_path: &str, container_path: &str, readonly: bool) -> String {
    let readonly_str = if readonly { ",readonly" } else { "" };
    format!(
        "type=bind,source={},target={}{}",
        escape_mount_path(host_path),
        escape_mount_path(container_path),
        readonly_str
    )
}
