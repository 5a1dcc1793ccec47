//! drive_md CLI - Browse Drive files and convert text files to Markdown.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use drive_md::auth::logout_url;
use drive_md::view::{GroupView, Toast, ToastKind};
use drive_md::{
    file_id_from_link, logging, ActionOutcome, BackendClient, Config, DriveView, LogoutControl,
    OidcSession, SessionProvider, StaticTokenSession, ViewState,
};

const ACCESS_TOKEN_VAR: &str = "DRIVE_ACCESS_TOKEN";
const REFRESH_TOKEN_VAR: &str = "DRIVE_REFRESH_TOKEN";

/// CLI for browsing Google Drive files through the conversion backend.
#[derive(Parser)]
#[command(name = "drive_md")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pre-issued access token (falls back to DRIVE_ACCESS_TOKEN).
    #[arg(long, conflicts_with = "refresh_token")]
    token: Option<String>,

    /// Refresh token for the identity provider (falls back to DRIVE_REFRESH_TOKEN).
    #[arg(long)]
    refresh_token: Option<String>,

    /// Read configuration from this .env file instead of ./.env.
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Backend base URL (overrides API_BASE_URL).
    #[arg(long)]
    api_base_url: Option<String>,

    /// Identity provider domain (overrides AUTH0_DOMAIN).
    #[arg(long)]
    auth_domain: Option<String>,

    /// Identity provider client ID (overrides AUTH0_CLIENT_ID).
    #[arg(long)]
    client_id: Option<String>,

    /// Post-login redirect target (overrides AUTH0_CALLBACK_URI).
    #[arg(long)]
    callback_uri: Option<String>,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List .txt and .md files.
    List,

    /// Convert text files to Markdown.
    Convert {
        /// File links or IDs to select.
        files: Vec<String>,

        /// Also select every .txt file whose name matches this glob.
        #[arg(long, short = 'p')]
        pattern: Option<String>,
    },

    /// Ask the backend to download and process one file.
    Process {
        /// File link or ID.
        file: String,
    },

    /// End the session.
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = load_config(&cli)?;
    let session = build_session(&cli, &config)?;

    let view = DriveView::new(BackendClient::new(
        config.api_base_url.clone(),
        session.clone(),
    ));

    match cli.command {
        Commands::List => {
            mount(&view).await?;
            print_groups(&view.render());
        }

        Commands::Convert { files, pattern } => {
            if files.is_empty() && pattern.is_none() {
                bail!("Nothing to convert: pass file IDs or --pattern");
            }

            mount(&view).await?;

            for file in &files {
                let file_id = file_id_from_link(file)
                    .with_context(|| format!("Invalid file link or ID: {}", file))?;
                view.set_selected(&file_id, true);
            }
            if let Some(pattern) = pattern {
                let matched = view
                    .select_matching(&pattern)
                    .with_context(|| format!("Invalid pattern: {}", pattern))?;
                if matched == 0 {
                    eprintln!("Warning: No .txt files matched pattern: {}", pattern);
                }
            }

            if !view.can_convert() {
                bail!("No files selected");
            }

            println!("Converting {} file(s)...", view.selection().len());
            if view.convert_selected().await == ActionOutcome::Applied {
                report_toast(&view)?;
                print_groups(&view.render());
            }
        }

        Commands::Process { file } => {
            let file_id = file_id_from_link(&file)
                .with_context(|| format!("Invalid file link or ID: {}", file))?;

            println!("Processing {}...", file_id);
            view.download_file(&file_id).await;
            report_toast(&view).with_context(|| format!("Failed to process {}", file_id))?;
        }

        Commands::Logout => {
            LogoutControl::new(session)
                .press()
                .await
                .context("Failed to end session")?;
            println!("Logged out.");
            println!("Sign out of the identity provider at: {}", logout_url(&config)?);
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.env_file {
        Some(path) => Config::from_env_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => Config::from_env().context("Failed to load configuration")?,
    };

    if let Some(url) = &cli.api_base_url {
        config.api_base_url = url.clone();
    }
    if let Some(domain) = &cli.auth_domain {
        config.auth_domain = domain.clone();
    }
    if let Some(client_id) = &cli.client_id {
        config.client_id = client_id.clone();
    }
    if let Some(uri) = &cli.callback_uri {
        config.callback_uri = uri.clone();
    }

    config.validated().context("Invalid configuration")
}

fn build_session(cli: &Cli, config: &Config) -> Result<Arc<dyn SessionProvider>> {
    let token = cli
        .token
        .clone()
        .or_else(|| std::env::var(ACCESS_TOKEN_VAR).ok());
    if let Some(token) = token {
        return Ok(Arc::new(StaticTokenSession::new(token)));
    }

    let refresh_token = cli
        .refresh_token
        .clone()
        .or_else(|| std::env::var(REFRESH_TOKEN_VAR).ok());
    if let Some(refresh_token) = refresh_token {
        return Ok(Arc::new(OidcSession::new(config.clone(), refresh_token)));
    }

    bail!(
        "No credentials: pass --token or --refresh-token (or set {} / {})",
        ACCESS_TOKEN_VAR,
        REFRESH_TOKEN_VAR
    )
}

/// Load the listing, failing on the error state.
async fn mount(view: &DriveView) -> Result<()> {
    view.mount().await;

    match view.state() {
        ViewState::Ready => Ok(()),
        ViewState::Error(message) => match view.redirect() {
            Some(url) => bail!("{}\nSign in at: {}", message, url),
            None => bail!("{}", message),
        },
        state => bail!("Listing did not complete: {:?}", state),
    }
}

/// Line to print for the current toast. A failure toast becomes the command's error.
fn toast_line(toast: Option<Toast>) -> Result<Option<String>> {
    match toast {
        Some(toast) if toast.kind == ToastKind::Failure => bail!("{}", toast.message),
        Some(toast) => Ok(Some(toast.message)),
        None => Ok(None),
    }
}

fn report_toast(view: &DriveView) -> Result<()> {
    if let Some(line) = toast_line(view.toast())? {
        println!("{}", line);
    }
    Ok(())
}

fn print_groups(groups: &[GroupView]) {
    if groups.is_empty() {
        println!("No files found.");
        return;
    }

    for group in groups {
        println!(".{}", group.extension);
        for row in &group.rows {
            let mark = match (row.selectable, row.selected) {
                (true, true) => "[x]",
                (true, false) => "[ ]",
                (false, _) => "   ",
            };
            println!("  {} {:<44} {}", mark, row.file.id, row.file.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_success_toast_is_a_full_line() {
        let toast = Toast::new("Done", ToastKind::Success, Instant::now());
        assert_eq!(toast_line(Some(toast)).unwrap(), Some("Done".to_string()));
        assert_eq!(toast_line(None).unwrap(), None);
    }

    #[test]
    fn test_failure_toast_is_an_error() {
        let toast = Toast::new("Boom", ToastKind::Failure, Instant::now());
        let err = toast_line(Some(toast)).unwrap_err();
        assert_eq!(err.to_string(), "Boom");
    }
}
