//! Command-line host for the planner.

use crate::handler::{PlanRequest, Planner};
use crate::path_store::FilePathStore;
use crate::segmentation::{
    NeighborSearch, SegmentationConfig, DEFAULT_MAX_JUMP, DEFAULT_MAX_STITCHES,
};
use crate::{estimate_pattern_time, save_planned_segments};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "snapstitch", version, about = "Plan cross-stitch segments from color grids")]
struct Cli {
    /// Log per-color segmentation details.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Segment one or more request files (`-` reads stdin) and print the responses.
    Plan {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        limits: LimitArgs,
        /// Pretty-print response bodies.
        #[arg(long)]
        pretty: bool,
    },
    /// Segment a request file and save the paths under a project.
    Save {
        file: PathBuf,
        /// Directory of the path store.
        #[arg(long)]
        store: PathBuf,
        /// Project id; falls back to the request's `projectID`.
        #[arg(long)]
        project: Option<String>,
        #[command(flatten)]
        limits: LimitArgs,
    },
    /// Estimate stitching hours for the grid in a request file.
    Estimate {
        file: PathBuf,
        /// Confetti level, 1 (low) to 10 (high).
        #[arg(long, default_value_t = 1)]
        confetti: u32,
    },
}

/// Defaults for requests that omit their own limits.
#[derive(Args, Debug)]
struct LimitArgs {
    #[arg(long, default_value_t = DEFAULT_MAX_STITCHES)]
    max_stitches: u32,
    #[arg(long, default_value_t = DEFAULT_MAX_JUMP)]
    max_jump: u32,
    /// Use the exhaustive neighbor scan instead of the bucket index.
    #[arg(long)]
    scan: bool,
    /// Reject grids whose rows differ in length.
    #[arg(long)]
    strict: bool,
}

impl LimitArgs {
    fn config(&self) -> SegmentationConfig {
        SegmentationConfig {
            max_stitches: self.max_stitches,
            max_jump: self.max_jump,
            require_rectangular: self.strict,
            neighbor_search: if self.scan {
                NeighborSearch::Scan
            } else {
                NeighborSearch::Bucketed
            },
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every request succeeded.
fn execute(command: Command) -> Result<bool, String> {
    match command {
        Command::Plan {
            files,
            limits,
            pretty,
        } => plan_files(&files, &limits, pretty),
        Command::Save {
            file,
            store,
            project,
            limits,
        } => {
            let request = PlanRequest::from_json(&read_input(&file)?).map_err(|err| err.to_string())?;
            let grid = request.grid().map_err(|err| err.to_string())?;
            let config = request
                .config(&limits.config())
                .map_err(|err| err.to_string())?;
            let project_id = project
                .or(request.project_id)
                .ok_or_else(|| "A project id is required (--project or projectID)".to_string())?;

            let store = FilePathStore::open(store)?;
            log::info!("Saving to path store at {}", store.root().display());
            let summary = save_planned_segments(&store, &project_id, &grid, &config)?;
            println!("{}", summary.message);
            Ok(true)
        }
        Command::Estimate { file, confetti } => {
            let request = PlanRequest::from_json(&read_input(&file)?).map_err(|err| err.to_string())?;
            let grid = request.grid().map_err(|err| err.to_string())?;
            let estimate = estimate_pattern_time(&grid, confetti)?;
            let payload = serde_json::to_string_pretty(&estimate).map_err(|err| err.to_string())?;
            println!("{}", payload);
            Ok(true)
        }
    }
}

fn plan_files(files: &[PathBuf], limits: &LimitArgs, pretty: bool) -> Result<bool, String> {
    let bodies = files
        .iter()
        .map(|file| read_input(file))
        .collect::<Result<Vec<_>, _>>()?;

    let planner = Planner::new(limits.config());
    let responses = bodies
        .par_iter()
        .map(|body| planner.handle_body(body))
        .collect::<Vec<_>>();

    let mut all_ok = true;
    for (file, response) in files.iter().zip(&responses) {
        if !response.is_success() {
            all_ok = false;
            log::warn!(
                "{} answered {}: {}",
                file.display(),
                response.status_code,
                response.body
            );
        }
        println!("{}", render_body(&response.body, pretty));
    }

    Ok(all_ok)
}

fn render_body(body: &str, pretty: bool) -> String {
    if !pretty {
        return body.to_string();
    }
    serde_json::from_str::<serde_json::Value>(body)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| body.to_string())
}

fn read_input(path: &Path) -> Result<String, String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|err| format!("Failed to read stdin: {}", err))?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path)
        .map_err(|err| format!("Failed to read {}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn limit_flags_build_the_default_config() {
        let cli = Cli::parse_from(["snapstitch", "plan", "a.json", "--max-jump", "2", "--scan"]);
        let Command::Plan { files, limits, pretty } = cli.command else {
            panic!("expected plan command");
        };
        assert_eq!(files, vec![PathBuf::from("a.json")]);
        assert!(!pretty);

        let config = limits.config();
        assert_eq!(config.max_stitches, DEFAULT_MAX_STITCHES);
        assert_eq!(config.max_jump, 2);
        assert_eq!(config.neighbor_search, NeighborSearch::Scan);
        assert!(!config.require_rectangular);
    }

    #[test]
    fn pretty_rendering_falls_back_to_raw_text() {
        assert_eq!(render_body("[1,2]", false), "[1,2]");
        assert_eq!(render_body("[1]", true), "[\n  1\n]");
        assert_eq!(render_body("not json", true), "not json");
    }
}
