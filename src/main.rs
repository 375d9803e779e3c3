// src/main.rs

use agentic_camera::cases::{TestCaseStore, Verdict, decide_verdict};
use agentic_camera::cli;
use agentic_camera::config::{AppConfig, DEFAULT_CONFIG_FILE};
use agentic_camera::driver::{SimulatedCamera, Surface};
use agentic_camera::memory::Transcript;
use agentic_camera::orchestrator::Orchestrator;
use agentic_camera::tools::camera::camera_registry;
use clap::Parser;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "agentic-camera")]
#[command(about = "Drive the camera app with natural-language commands")]
struct Args {
    /// Test case ID to run from the test case file
    #[arg(long)]
    test_id: Option<String>,

    /// Run a single custom query
    #[arg(long)]
    query: Option<String>,

    /// Start the interactive loop (default when nothing else is requested)
    #[arg(long)]
    interactive: bool,

    /// List available test cases and exit
    #[arg(long)]
    list_tests: bool,

    /// Save the result and verdict of --test-id back to the test case file
    #[arg(long)]
    save_results: bool,

    /// Force the verdict instead of comparing or asking
    #[arg(long, value_enum)]
    force_status: Option<Verdict>,

    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Test case file (overrides the configured path)
    #[arg(long)]
    cases: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("agentic_camera=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agentic_camera=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> agentic_camera::Result<ExitCode> {
    let mut config = AppConfig::load(&args.config)?;
    config.apply_env(|key| std::env::var(key).ok());
    let cases_path = args.cases.clone().unwrap_or_else(|| config.cases.path.clone());

    if args.list_tests {
        let store = TestCaseStore::load(&cases_path)?;
        cli::write_case_list(&store, &mut io::stdout().lock())?;
        return Ok(ExitCode::SUCCESS);
    }

    let llm = config.build_completion(|key| std::env::var(key).ok())?;
    let surface: Arc<dyn Surface> = Arc::new(SimulatedCamera::new());
    let registry = camera_registry(surface, config.timing())?;
    let orchestrator = Orchestrator::with_completion(registry, llm);
    tracing::info!(capabilities = orchestrator.registry().len(), "camera control ready");

    let mut code = ExitCode::SUCCESS;
    if let Some(id) = &args.test_id {
        code = run_case(&orchestrator, &cases_path, id, args)?;
    } else if let Some(query) = &args.query {
        println!("Running custom query: {query}");
        let result = orchestrator.run(query, &[]);
        print!("{}", cli::render_trace(&result));
        if !result.is_ok() {
            code = ExitCode::FAILURE;
        }
    }

    if args.interactive || (args.test_id.is_none() && args.query.is_none()) {
        let mut memory = Transcript::new();
        cli::interactive(&orchestrator, io::stdin().lock(), &mut io::stdout(), &mut memory)?;
    }

    Ok(code)
}

fn run_case(
    orchestrator: &Orchestrator,
    cases_path: &Path,
    id: &str,
    args: &Args,
) -> agentic_camera::Result<ExitCode> {
    let mut store = TestCaseStore::load(cases_path)?;
    let case = store.get(id)?.clone();
    println!("Running test: {}", case.description());

    let result = orchestrator.run(&case.query, &[]);
    print!("{}", cli::render_trace(&result));

    if args.save_results {
        let rendered = result.render();
        let verdict = decide_verdict(
            args.force_status,
            case.expected_result.as_deref(),
            &rendered,
            ask_operator,
        );
        store.record(id, &rendered, verdict)?;
        store.save()?;
        println!("Results saved for test ID {id}: {verdict}");
        if verdict == Verdict::Fail {
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn ask_operator(result: &str) -> bool {
    println!("\nTest result:\n{result}");
    print!("Did the test pass? (y/n): ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => answer.trim().to_ascii_lowercase().starts_with('y'),
        Err(_) => false,
    }
}
