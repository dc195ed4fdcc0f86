// Copyright 2026 The Stockflow Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fs;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use stockflow_engine::datamodel::ProjectId;
use stockflow_engine::{
    File, InitOrder, Results, SimRequest, SimSpecs, Simulation, ValueTable, check, evaluate,
    substitute,
};

const EXIT_FAILURE: u8 = 1;
const DEFAULT_MAX_STEPS: usize = 100_000;

/// Simulate integer stock and flow models.
#[derive(Parser, Debug)]
#[command(name = "stockflow", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate a project and print one row per step
    Simulate {
        /// Path to a JSON project file
        path: PathBuf,

        /// Project to simulate; may be omitted if the file holds one project
        #[arg(long)]
        project: Option<ProjectId>,

        /// Number of steps, overriding the file's sim_specs
        #[arg(long)]
        steps: Option<usize>,

        /// Refuse to run more steps than this
        #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
        max_steps: usize,

        /// Initialization order, overriding the file's sim_specs
        #[arg(long, value_enum)]
        init_order: Option<InitOrderArg>,

        #[arg(long, value_enum, default_value_t = Format::Tsv)]
        format: Format,

        /// Path to write results to instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Don't print the results (for benchmarking)
        #[arg(long)]
        no_output: bool,
    },
    /// Report unknown references, duplicate names and broken equations
    Check {
        /// Path to a JSON project file
        path: PathBuf,

        #[arg(long)]
        project: Option<ProjectId>,
    },
    /// Evaluate a single equation
    Eval {
        expr: String,

        /// A stock value, as NAME=VALUE
        #[arg(long = "stock", value_parser = parse_binding)]
        stocks: Vec<(String, i64)>,

        /// A variable value, as NAME=VALUE
        #[arg(long = "var", value_parser = parse_binding)]
        variables: Vec<(String, i64)>,

        /// Also print the equation with its references substituted
        #[arg(long)]
        explain: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum InitOrderArg {
    Declared,
    Dependency,
}

impl From<InitOrderArg> for InitOrder {
    fn from(arg: InitOrderArg) -> Self {
        match arg {
            InitOrderArg::Declared => InitOrder::Declared,
            InitOrderArg::Dependency => InitOrder::Dependency,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Tsv,
    Json,
}

fn parse_binding(arg: &str) -> std::result::Result<(String, i64), String> {
    let (name, value) = arg
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{arg}'"))?;
    let value = value
        .trim()
        .parse::<i64>()
        .map_err(|err| format!("bad value for '{name}': {err}"))?;
    Ok((name.to_owned(), value))
}

fn open_file(path: &Path) -> Result<File> {
    let f = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let file =
        File::from_reader(BufReader::new(f)).with_context(|| format!("reading {}", path.display()))?;
    Ok(file)
}

fn select_project(file: &File, requested: Option<ProjectId>) -> Result<ProjectId> {
    if let Some(id) = requested {
        return Ok(id);
    }
    match file.projects.as_slice() {
        [project] => Ok(project.id),
        [] => bail!("file contains no projects"),
        projects => bail!(
            "file contains {} projects, pick one with --project",
            projects.len()
        ),
    }
}

fn write_results(results: &Results, format: Format, output: Option<&Path>) -> Result<()> {
    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(
            fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    match format {
        Format::Tsv => results.write_tsv(&mut out)?,
        Format::Json => results.write_json(&mut out)?,
    }
    out.flush()?;
    Ok(())
}

/// Runs one subcommand.  `Ok(false)` means the command completed but found
/// problems, and the process should exit non-zero.
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Simulate {
            path,
            project,
            steps,
            max_steps,
            init_order,
            format,
            output,
            no_output,
        } => {
            let file = open_file(&path)?;
            let project_id = select_project(&file, project)?;
            let mut specs: SimSpecs = file.sim_specs.clone().unwrap_or_default();
            if let Some(steps) = steps {
                specs.steps = steps;
            }
            if let Some(init_order) = init_order {
                specs.init_order = init_order.into();
            }

            let request = SimRequest {
                project_id,
                steps: specs.steps,
            };
            request
                .validate(max_steps)
                .with_context(|| format!("bad step count for {}", path.display()))?;

            let model = file.model(project_id)?;
            info!(
                project = project_id,
                steps = specs.steps,
                init_order = ?specs.init_order,
                "simulating"
            );
            let results = Simulation::new(&model.stocks, &model.variables, &model.flows)
                .run(&specs)
                .with_context(|| format!("simulating project {project_id}"))?;
            debug!(steps = results.step_count(), "simulation complete");

            if !no_output {
                write_results(&results, format, output.as_deref())?;
            }
            Ok(true)
        }
        Command::Check { path, project } => {
            let file = open_file(&path)?;
            let project_id = select_project(&file, project)?;
            let model = file.model(project_id)?;
            let findings = check(&model);
            let mut stdout = io::stdout().lock();
            for finding in findings.iter() {
                writeln!(stdout, "{finding}")?;
            }
            Ok(findings.is_empty())
        }
        Command::Eval {
            expr,
            stocks,
            variables,
            explain,
        } => {
            let stocks: ValueTable = stocks.into_iter().collect();
            let variables: ValueTable = variables.into_iter().collect();
            if explain {
                println!("{}", substitute(&expr, &stocks, &variables));
            }
            let value = evaluate(&expr, &stocks, &variables)
                .with_context(|| format!("evaluating '{expr}'"))?;
            println!("{value}");
            Ok(true)
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init()
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_FAILURE),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
