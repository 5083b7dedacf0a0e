use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use cmrel::cli::{Cli, Commands, StageArgs};
use cmrel::config::loader::resolve_config;
use cmrel::gcb::{AccessToken, CloudBuildClient, FileTemplateLoader};
use cmrel::release::{GitHubRevisionResolver, GitRemoteResolver, RevisionResolver, SupportedPlatforms};
use cmrel::sign::GcpKmsKeyValidator;
use cmrel::{LogCollector, ReleaseConfig, RevisionLookup, StageCollaborators, StageOrchestrator};

/// Environment variable holding a Cloud Build access token
const ACCESS_TOKEN_ENV: &str = "CMREL_ACCESS_TOKEN";
/// Environment variable holding a GitHub API token
const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let collector = match LogCollector::new(cli.log_dir.as_deref(), level) {
        Ok(collector) => collector,
        Err(e) => {
            eprintln!("[Main] ERROR: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = collector.clone().install() {
        eprintln!("[Main] WARNING: {}", e);
    }
    if let Some(path) = collector.log_path() {
        log::debug!("[Main] Writing run log to {}", path.display());
    }

    let config = match resolve_config(cli.config.as_deref()).context("failed to load configuration") {
        Ok(config) => config,
        Err(e) => {
            log::error!("[Main] {:#}", e);
            flush_log(&collector);
            return ExitCode::from(2);
        }
    };

    let code = match cli.cmd {
        Commands::Stage(args) => run_stage(config, args).await,
    };

    flush_log(&collector);
    code
}

fn flush_log(collector: &LogCollector) {
    if let Err(e) = collector.wait_for_empty() {
        eprintln!("[Main] WARNING: failed to flush run log: {}", e);
    }
}

async fn run_stage(config: ReleaseConfig, args: StageArgs) -> ExitCode {
    let request = args.into_request(&config);
    request.log_summary();

    let orchestrator = StageOrchestrator::new(config.clone(), production_collaborators(&config));
    match orchestrator.run(request).await {
        Ok(outcome) => {
            log::debug!("[Main] Build {} finished for {}", outcome.build_id, outcome.git_ref);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("[Main] {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn production_collaborators(config: &ReleaseConfig) -> StageCollaborators {
    let revisions: Arc<dyn RevisionResolver> = match config.revision_lookup {
        RevisionLookup::GithubApi => Arc::new(GitHubRevisionResolver::new(
            config.github_api_url.clone(),
            non_empty_env(GITHUB_TOKEN_ENV),
        )),
        RevisionLookup::GitRemote => Arc::new(GitRemoteResolver::new(config.git_remote_url.clone())),
    };

    let token = config
        .access_token
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| non_empty_env(ACCESS_TOKEN_ENV))
        .map(AccessToken::Static)
        .unwrap_or(AccessToken::Gcloud);

    StageCollaborators {
        revisions,
        signer: Arc::new(GcpKmsKeyValidator),
        templates: Arc::new(FileTemplateLoader),
        platforms: Arc::new(SupportedPlatforms::new()),
        builds: Arc::new(CloudBuildClient::new(config.cloud_build_api_url.clone(), token)),
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
