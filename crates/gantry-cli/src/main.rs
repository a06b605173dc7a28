//! Gantry - build/test/deploy pipeline CLI
//!
//! ## Commands
//!
//! - `run`: execute a pipeline for a trigger (matrix builds, then the
//!   gated deploy)
//! - `plan`: print the job/step plan for a trigger without executing

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use gantry_core::{DeployToken, Toolchain, Trigger, TriggerEvent};
use gantry_pipeline::{
    telemetry, BuildJob, DeployJob, DeployOutcome, DeployPolicy, Pipeline, PipelineConfig,
    PipelineReport, ProcessExecutor, TracingEventSink,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build/test/deploy pipeline orchestrator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum EventKind {
    Push,
    PullRequest,
}

impl From<EventKind> for TriggerEvent {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Push => TriggerEvent::Push,
            EventKind::PullRequest => TriggerEvent::PullRequest,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline for the given trigger
    Run {
        /// Git ref that triggered the run, e.g. refs/heads/master
        #[arg(long)]
        git_ref: String,

        /// Event kind that produced the trigger
        #[arg(long, value_enum, default_value = "push")]
        event: EventKind,

        /// Branch eligible for deploy
        #[arg(long, default_value = "master")]
        main_branch: String,

        /// Toolchain channels to build (repeatable)
        #[arg(long = "toolchain", value_parser = clap::value_parser!(Toolchain))]
        toolchains: Vec<Toolchain>,

        /// Repository URL to fetch
        #[arg(long, default_value = ".")]
        repo_url: String,

        /// Working directory for job checkouts
        #[arg(long, default_value = ".gantry/work")]
        workdir: PathBuf,

        /// Run the deploy even if a matrix job failed
        #[arg(long)]
        allow_failed_builds: bool,

        /// Per-step timeout in seconds (0 = no timeout)
        #[arg(long, default_value_t = 0)]
        step_timeout: u64,

        /// Deploy credential (read from the environment, never logged)
        #[arg(long, env = "FLY_API_TOKEN", hide_env_values = true)]
        deploy_token: Option<String>,
    },

    /// Print the job/step plan for a trigger without executing
    Plan {
        /// Git ref that would trigger the run
        #[arg(long)]
        git_ref: String,

        /// Branch eligible for deploy
        #[arg(long, default_value = "master")]
        main_branch: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            git_ref,
            event,
            main_branch,
            toolchains,
            repo_url,
            workdir,
            allow_failed_builds,
            step_timeout,
            deploy_token,
        } => {
            let config = PipelineConfig {
                main_branch,
                toolchains: if toolchains.is_empty() {
                    Toolchain::default_axis()
                } else {
                    toolchains
                },
                repo_url,
                workdir,
                deploy_policy: if allow_failed_builds {
                    DeployPolicy::DeployOnCompletion
                } else {
                    DeployPolicy::BlockOnAnyFailure
                },
                step_timeout_secs: step_timeout,
                ..PipelineConfig::default()
            };

            let trigger = Trigger {
                git_ref,
                event: event.into(),
            };
            let token = deploy_token.map(DeployToken::new);

            let pipeline = Pipeline::new(config, Arc::new(ProcessExecutor))
                .with_sink(Arc::new(TracingEventSink));
            let report = pipeline.run(&trigger, token.as_ref()).await;

            print_report(&report);

            if !report.success {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Plan {
            git_ref,
            main_branch,
        } => {
            let config = PipelineConfig {
                main_branch,
                ..PipelineConfig::default()
            };
            let trigger = Trigger::push(git_ref);
            print_plan(&config, &trigger);
            Ok(())
        }
    }
}

fn print_report(report: &PipelineReport) {
    println!("Run {} ({})", report.run_id, &report.spec_digest[..12]);
    for build in &report.builds {
        println!(
            "  {:<14} {:<10} {} step(s){}",
            build.job_name,
            build.state.to_string(),
            build.steps.len(),
            build
                .error
                .as_deref()
                .map(|e| format!("  [{e}]"))
                .unwrap_or_default(),
        );
    }
    match &report.deploy {
        DeployOutcome::NotEligible { reason } => {
            println!("  {:<14} not_eligible  ({reason})", "deploy");
        }
        DeployOutcome::Blocked { violations } => {
            println!("  {:<14} blocked       ({})", "deploy", violations.join("; "));
        }
        DeployOutcome::Ran(deploy) => {
            println!(
                "  {:<14} {:<10} {} step(s)",
                "deploy",
                deploy.state.to_string(),
                deploy.steps.len()
            );
        }
    }
    println!(
        "Result: {} in {} ms",
        if report.success { "succeeded" } else { "failed" },
        report.duration_ms
    );
}

fn print_plan(config: &PipelineConfig, trigger: &Trigger) {
    println!("Plan for ref {} (main branch: {})", trigger.git_ref, config.main_branch);
    for &toolchain in &config.toolchains {
        let job = BuildJob::plan(config, trigger, toolchain);
        println!("  job {}", job.job_name());
        for step in job.steps() {
            println!("    {:<18} {}", step.name, step.command.join(" "));
        }
    }
    if trigger.branch() == config.main_branch {
        let deploy = DeployJob::plan(config, trigger, None);
        println!("  job deploy (gated on matrix outcome)");
        for step in deploy.steps() {
            println!("    {:<18} {}", step.name, step.command.join(" "));
        }
    } else {
        println!("  job deploy: not eligible (ref is not the main branch)");
    }
}
