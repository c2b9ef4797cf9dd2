mod invocation;

use anyhow::{Context, Result};
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use invocation::{collect_outputs, parse_key_value, register_inputs, substitute_inputs, InputSpec};
use std::path::PathBuf;
use styx_defs::{Execution, Metadata, Runner};
use styx_docker::{DockerRunner, DockerRunnerConfig, StyxDockerError};
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "styxctl", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tool inside a throw-away container
    Run(RunArgs),
    /// Print version and exit
    Version,
}

#[derive(Args)]
struct RunArgs {
    /// Invocation name, used in the output directory name
    #[arg(long)]
    name: String,
    /// Container image tag
    #[arg(long)]
    image: Option<String>,
    /// Read-only input file; inputs are referenced in tool args as {0}, {1}, ...
    #[arg(long = "input", value_name = "PATH")]
    inputs: Vec<PathBuf>,
    /// Input file mounted together with its parent directory
    #[arg(long = "input-dir", value_name = "PATH")]
    input_dirs: Vec<PathBuf>,
    /// Input file the tool may modify
    #[arg(long = "mutable-input", value_name = "PATH")]
    mutable_inputs: Vec<PathBuf>,
    /// Output file expected in the output directory
    #[arg(long = "output", value_name = "NAME")]
    outputs: Vec<String>,
    /// Output file that may legitimately be absent
    #[arg(long = "optional-output", value_name = "NAME")]
    optional_outputs: Vec<String>,
    /// YAML runner configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Container engine executable
    #[arg(long, value_name = "EXE")]
    docker: Option<String>,
    /// Base directory for output directories
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Numeric user id to run as inside the container
    #[arg(long, conflicts_with = "no_user")]
    user_id: Option<u32>,
    /// Run as the image's default user
    #[arg(long)]
    no_user: bool,
    /// Extra environment variable for the container
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    environ: Vec<(String, String)>,
    /// Replace an image tag with another
    #[arg(long = "override", value_name = "FROM=TO", value_parser = parse_key_value)]
    overrides: Vec<(String, String)>,
    /// Tool command line
    #[arg(last = true, required = true, value_name = "ARGS")]
    cargs: Vec<String>,
}

impl RunArgs {
    /// All inputs in the order their flags appeared on the command line.
    fn ordered_inputs(&self, matches: &ArgMatches) -> Vec<InputSpec> {
        let groups = [
            ("inputs", &self.inputs, false, false),
            ("input_dirs", &self.input_dirs, true, false),
            ("mutable_inputs", &self.mutable_inputs, false, true),
        ];
        let mut indexed = Vec::new();
        for (id, paths, resolve_parent, mutable) in groups {
            let indices = matches.indices_of(id).into_iter().flatten();
            for (index, path) in indices.zip(paths) {
                let input = InputSpec {
                    path: path.clone(),
                    resolve_parent,
                    mutable,
                };
                indexed.push((index, input));
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, input)| input).collect()
    }
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn runner_config(args: &RunArgs) -> Result<DockerRunnerConfig> {
    let base = match &args.config {
        Some(path) => DockerRunnerConfig::from_yaml_file(path)?,
        None => DockerRunnerConfig::default(),
    };
    let mut config = base.merge_env().context("Invalid STYX_* environment")?;

    if let Some(exe) = &args.docker {
        config = config.with_docker_executable(exe.as_str());
    }
    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir.as_path());
    }
    if args.no_user {
        config = config.with_docker_user_id(None);
    } else if let Some(uid) = args.user_id {
        config = config.with_docker_user_id(Some(uid));
    }
    for (key, value) in &args.environ {
        config = config.with_env(key.as_str(), value.as_str());
    }
    for (from, to) in &args.overrides {
        config = config.with_image_override(from.as_str(), to.as_str());
    }
    Ok(config)
}

fn run(args: RunArgs, inputs: Vec<InputSpec>) -> Result<()> {
    let mut runner = DockerRunner::new(runner_config(&args)?);
    let metadata = Metadata {
        name: args.name.clone(),
        container_image_tag: args.image.clone(),
    };
    let mut execution = runner.start_execution(&metadata)?;

    let container_paths = register_inputs(&mut execution, &inputs);
    let cargs = substitute_inputs(&args.cargs, &container_paths);

    match execution.run(&cargs, None, None) {
        Ok(()) => {}
        Err(StyxDockerError::CommandFailed(failure)) => {
            eprintln!("{}", failure.render());
            std::process::exit(failure.exit_code.filter(|c| *c != 0).unwrap_or(1));
        }
        Err(err) => return Err(err).context("Container execution failed"),
    }

    for (name, path) in collect_outputs(&execution, &args.outputs, &args.optional_outputs)? {
        println!("{}\t{}", name, path.display());
    }
    println!("{}", execution.output_dir().display());
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    match cli.cmd {
        Commands::Run(args) => {
            let inputs = matches
                .subcommand_matches("run")
                .map(|run_matches| args.ordered_inputs(run_matches))
                .unwrap_or_default();
            run(args, inputs)?
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}
