//! promocal-admin: the admin header actions from the command line.

mod args;

use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use serde_json::json;
use tracing::{error, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands};
use promocal::{
    application::admin_console::{AdminConsole, LogoutOutcome, Toast, ToastKind, display_name},
    infra::admin_api::HttpAdminApi,
};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let api = match HttpAdminApi::new(&cli.base_url, cli.auth_cookie.clone()) {
        Ok(api) => api,
        Err(err) => {
            error!(error = %err, "Failed to build admin client");
            return ExitCode::FAILURE;
        }
    };
    let console = AdminConsole::new(Arc::new(api));

    match cli.command {
        Commands::Whoami => whoami(&console, cli.json).await,
        Commands::ClearCache => clear_cache(&console, cli.json).await,
        Commands::Logout => logout(&console, cli.json).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn whoami(console: &AdminConsole, as_json: bool) -> ExitCode {
    let identity = console.load_identity().await;
    let name = display_name(identity.as_ref());
    if as_json {
        println!(
            "{}",
            json!({ "signed_in": identity.is_some(), "display_name": name, "identity": identity })
        );
    } else if identity.is_some() {
        println!("{name}");
    } else {
        println!("{name} (not signed in)");
    }
    ExitCode::SUCCESS
}

async fn clear_cache(console: &AdminConsole, as_json: bool) -> ExitCode {
    let Some(toast) = console.clear_cache().await else {
        return ExitCode::FAILURE;
    };
    print_toast(&toast, as_json);
    match toast.kind {
        ToastKind::Success => ExitCode::SUCCESS,
        ToastKind::Error => ExitCode::FAILURE,
    }
}

async fn logout(console: &AdminConsole, as_json: bool) -> ExitCode {
    let logout = console.logout();
    let outcome = match logout.completion.await {
        Ok(outcome) => outcome,
        Err(err) => LogoutOutcome::Failed(err.to_string()),
    };

    if as_json {
        let status = match &outcome {
            LogoutOutcome::Completed => "completed",
            LogoutOutcome::Failed(_) => "failed",
            LogoutOutcome::TimedOut => "timed_out",
        };
        println!("{}", json!({ "redirect": logout.redirect, "logout": status }));
    } else {
        println!("{}", logout.redirect);
    }

    match outcome {
        LogoutOutcome::Completed => ExitCode::SUCCESS,
        LogoutOutcome::Failed(_) | LogoutOutcome::TimedOut => ExitCode::FAILURE,
    }
}

fn print_toast(toast: &Toast, as_json: bool) {
    if as_json {
        println!(
            "{}",
            json!({
                "kind": toast.kind,
                "message": toast.message,
                "duration_secs": toast.duration.as_secs(),
            })
        );
    } else {
        println!("{}", toast.message);
    }
}
