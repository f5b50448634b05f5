//! Deploys the SQL files changed since the last deployed commit.

use clap::Parser;
use clap::error::ErrorKind;
use schemadiag::config::DeployConfig;
use schemadiag::deploy::{DeployOptions, SqlCmd, run_deployment};
use schemadiag::git::GitCli;
use std::path::PathBuf;
use std::process;

/// Run changed SQL files against the configured database
#[derive(Parser, Debug)]
#[command(name = "deploy-sql", version)]
struct Args {
    /// Commit of the previous deployment
    last_deploy_commit: String,

    /// Repository to diff
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// List the changed files without running them
    #[arg(long)]
    dry_run: bool,

    /// Exit with status 2 when any file fails to deploy
    #[arg(long)]
    fail_on_error: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("schemadiag=info,deploy_sql=info")
                }),
        )
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            process::exit(1);
        }
    };

    let options = DeployOptions {
        dry_run: args.dry_run,
        fail_on_error: args.fail_on_error,
    };
    let vcs = GitCli::new(&args.repo);
    match run_deployment(
        &vcs,
        &args.last_deploy_commit,
        DeployConfig::from_env,
        SqlCmd,
        options,
    ) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
