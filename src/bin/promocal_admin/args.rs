//! Command-line surface for `promocal-admin`.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "promocal-admin",
    version,
    about = "Promotional calendar admin console",
    long_about = None
)]
pub struct Cli {
    /// Site base URL, e.g. <https://promo.example.com>
    #[arg(long, env = "PROMOCAL_SITE_URL", default_value = "http://127.0.0.1:3000")]
    pub base_url: String,

    /// Value of the `admin_auth` session cookie
    #[arg(long, env = "PROMOCAL_ADMIN_AUTH", hide_env_values = true)]
    pub auth_cookie: Option<String>,

    /// Emit JSON instead of plain text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Show who is signed in
    Whoami,
    /// Clear the calendar data cache and the rendered home page
    ClearCache,
    /// End the admin session
    Logout,
}
