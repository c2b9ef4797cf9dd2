use crate::error::StyxDockerError;
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use styx_defs::LineSink;
use tracing::{error, info};

fn log_stdout_line(line: &str) {
    info!(target: "styx_docker", "{}", line);
}

fn log_stderr_line(line: &str) {
    error!(target: "styx_docker", "{}", line);
}

fn strip_line_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn drain_lines<R: Read>(reader: R, mut sink: LineSink<'_>) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        sink(&String::from_utf8_lossy(strip_line_terminator(&buf)));
    }
}

fn join_drain(
    handle: thread::ScopedJoinHandle<'_, io::Result<()>>,
    stream: &str,
) -> io::Result<()> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other(format!("{} reader thread panicked", stream))))
}

fn spawn(args: &[String]) -> Result<Child, StyxDockerError> {
    let (program, rest) = args.split_first().ok_or_else(|| {
        StyxDockerError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "empty command line",
        ))
    })?;

    Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| StyxDockerError::Spawn {
            executable: program.clone(),
            source,
        })
}

/// Run `args` (program first) and feed its output, line by line, to the
/// sinks. Both streams are drained on their own threads and joined before the
/// exit status is collected.
pub fn run_streaming(
    args: &[String],
    handle_stdout: Option<LineSink<'_>>,
    handle_stderr: Option<LineSink<'_>>,
) -> Result<ExitStatus, StyxDockerError> {
    let mut child = spawn(args)?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr was not captured"))?;

    let on_stdout: LineSink<'_> = match handle_stdout {
        Some(sink) => sink,
        None => Box::new(log_stdout_line),
    };
    let on_stderr: LineSink<'_> = match handle_stderr {
        Some(sink) => sink,
        None => Box::new(log_stderr_line),
    };

    // Reader threads log through the caller's subscriber, not the global one.
    let dispatch = tracing::dispatcher::get_default(|current| current.clone());
    let drained = thread::scope(|scope| {
        let out_dispatch = dispatch.clone();
        let out = scope.spawn(move || {
            tracing::dispatcher::with_default(&out_dispatch, || drain_lines(stdout, on_stdout))
        });
        let err = scope.spawn(move || {
            tracing::dispatcher::with_default(&dispatch, || drain_lines(stderr, on_stderr))
        });
        let out = join_drain(out, "stdout");
        let err = join_drain(err, "stderr");
        out.and(err)
    });

    if let Err(err) = drained {
        let _ = child.kill();
        let _ = child.wait();
        return Err(err.into());
    }

    Ok(child.wait()?)
}
