use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use styx_defs::Execution;
use tracing::warn;

/// One registered input and how it is mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub path: PathBuf,
    pub resolve_parent: bool,
    pub mutable: bool,
}

/// Parse `KEY=VALUE`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

/// Register every input in order and return their container paths.
pub fn register_inputs<E: Execution>(execution: &mut E, inputs: &[InputSpec]) -> Vec<String> {
    inputs
        .iter()
        .map(|input| execution.input_file(&input.path, input.resolve_parent, input.mutable))
        .collect()
}

/// Replace `{N}` in each tool argument with the N-th registered input.
pub fn substitute_inputs(cargs: &[String], container_paths: &[String]) -> Vec<String> {
    cargs
        .iter()
        .map(|arg| substitute_placeholders(arg, container_paths))
        .collect()
}

// Single left-to-right pass; substituted paths are never rescanned.
fn substitute_placeholders(arg: &str, container_paths: &[String]) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}');
        let path = close
            .filter(|&close| close > 0 && after[..close].bytes().all(|b| b.is_ascii_digit()))
            .and_then(|close| after[..close].parse::<usize>().ok())
            .and_then(|index| container_paths.get(index));
        match (path, close) {
            (Some(path), Some(close)) => {
                out.push_str(path);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve requested outputs and check they were produced.
pub fn collect_outputs<E: Execution>(
    execution: &E,
    required: &[String],
    optional: &[String],
) -> Result<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    let mut missing = Vec::new();

    let requested = required
        .iter()
        .map(|name| (name, false))
        .chain(optional.iter().map(|name| (name, true)));

    for (name, is_optional) in requested {
        let path = execution.output_file(name, is_optional);
        if exists(&path) {
            found.push((name.clone(), path));
        } else if is_optional {
            warn!("Optional output {} was not produced", path.display());
        } else {
            missing.push(path);
        }
    }

    if !missing.is_empty() {
        let list: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
        bail!("Missing required outputs: {}", list.join(", "));
    }
    Ok(found)
}

fn exists(path: &Path) -> bool {
    path.try_exists().unwrap_or(false)
}
