use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::filter::{CategoryFilter, PriorityFilter, StatusFilter};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdash",
    version,
    about = "Task dashboard with search, filters, pagination and a mock login",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// Config file (defaults to $TASKDASH_CONFIG, then the user config dir)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding local storage
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Landing page; forwards to the dashboard
    Home(DashboardArgs),
    /// Sign in with email and password
    Login(LoginArgs),
    /// Clear the stored session
    Logout,
    /// Search, filter and page through tasks
    Dashboard(DashboardArgs),
    /// Show the signed-in user
    Profile,
    /// List task categories
    Categories,
    /// Print the head tags for a route
    Meta(MetaArgs),
    /// Print sitemap.xml
    Sitemap,
    /// Print robots.txt
    Robots,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Home(_) => "home",
            Command::Login(_) => "login",
            Command::Logout => "logout",
            Command::Dashboard(_) => "dashboard",
            Command::Profile => "profile",
            Command::Categories => "categories",
            Command::Meta(_) => "meta",
            Command::Sitemap => "sitemap",
            Command::Robots => "robots",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub password: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DashboardArgs {
    /// Query string to seed state from, e.g. "status=active&page=2"
    #[arg(long = "url", default_value = "")]
    pub url: String,

    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub status: Option<StatusFilter>,

    #[arg(long)]
    pub priority: Option<PriorityFilter>,

    #[arg(long)]
    pub category: Option<CategoryFilter>,

    #[arg(long)]
    pub page: Option<u32>,

    #[arg(long = "page-size")]
    pub page_size: Option<u32>,

    /// Print the paginated result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MetaArgs {
    /// Route path such as "/dashboard"
    pub route: String,

    /// Print the merged metadata as JSON instead of tags
    #[arg(long)]
    pub json: bool,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
