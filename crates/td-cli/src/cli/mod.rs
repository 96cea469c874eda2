//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use td_core::AppContext;
use td_core::config::{self, Config};
use td_core::logging;
use td_core::router::Route;
use td_core::types::{RecordId, TaskStatus};

use crate::modes;

mod commands;

#[derive(Parser)]
#[command(name = "td")]
#[command(version)]
#[command(about = "Terminal client for the taskdesk task service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Route the interactive UI starts at
    #[arg(long, value_name = "PATH", default_value = "/")]
    route: Route,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login(CredentialArgs),
    /// Create an account and log in with it
    Register(CredentialArgs),
    /// Forget the saved session
    Logout,
    /// Work with your tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Show where the route guard sends a path
    Route {
        /// Path such as /tasks or /tasks/new
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args, Debug)]
struct CredentialArgs {
    #[arg(long)]
    email: String,
    /// Read from stdin when omitted
    #[arg(long)]
    password: Option<String>,
}

/// Fields of a task draft. Unset values keep their current (or default) value.
#[derive(clap::Args, Debug, Default)]
struct DraftArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Non-negative effort estimate
    #[arg(long)]
    effort: Option<f64>,
    /// Due date as YYYY-MM-DD
    #[arg(long, value_name = "DATE")]
    due: Option<NaiveDate>,
    /// pending, in_progress or completed
    #[arg(long)]
    status: Option<TaskStatus>,
}

#[derive(clap::Subcommand)]
enum TaskCommands {
    /// List all tasks
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Create a task
    Add {
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Change an existing task
    Update {
        #[arg(value_name = "ID")]
        id: RecordId,
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Delete a task
    Delete {
        #[arg(value_name = "ID")]
        id: RecordId,
    },
    /// Bulk-create tasks from a spreadsheet
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Download all tasks as tasks.xlsx
    Export {
        /// Directory to save into (default: configured download_dir)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
    /// Download the import template as task_template.xlsx
    Template {
        /// Directory to save into (default: configured download_dir)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Set the API base URL, keeping the rest of the file
    SetUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli { command, route } = cli;

    // Config commands must work even when the config does not parse.
    let command = match command {
        Some(Commands::Config { command }) => return run_config(command),
        other => other,
    };

    let mut config = Config::load().context("load config")?;

    // default to the interactive UI
    let Some(command) = command else {
        let _guard = logging::init_file(&config::paths::logs_dir(), &config.log_level)?;
        let ctx = AppContext::from_config(config)?;
        return modes::run_app(&ctx, route).await;
    };

    logging::init_stderr(&config.log_level);
    if let Commands::Tasks {
        command:
            TaskCommands::Export { dir: Some(dir) } | TaskCommands::Template { dir: Some(dir) },
    } = &command
    {
        config.download_dir = Some(dir.to_string_lossy().to_string());
    }
    let ctx = AppContext::from_config(config)?;
    tracing::debug!(api_url = %ctx.api_url, "using task service");

    match command {
        Commands::Login(args) => commands::auth::login(&ctx, &args.email, args.password).await,
        Commands::Register(args) => {
            commands::auth::register(&ctx, &args.email, args.password).await
        }
        Commands::Logout => {
            commands::auth::logout(&ctx);
            Ok(())
        }
        Commands::Route { path } => commands::route::show(&ctx, &path),
        Commands::Tasks { command } => match command {
            TaskCommands::List { json } => commands::tasks::list(&ctx, json).await,
            TaskCommands::Add { draft } => commands::tasks::add(&ctx, draft.into()).await,
            TaskCommands::Update { id, draft } => {
                commands::tasks::update(&ctx, &id, draft.into()).await
            }
            TaskCommands::Delete { id } => commands::tasks::delete(&ctx, &id).await,
            TaskCommands::Import { file } => commands::tasks::import(&ctx, &file).await,
            TaskCommands::Export { .. } => commands::tasks::export(&ctx).await,
            TaskCommands::Template { .. } => commands::tasks::template(&ctx).await,
        },
        Commands::Config { command } => run_config(command),
    }
}

fn run_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            commands::config::path();
            Ok(())
        }
        ConfigCommands::Init => commands::config::init(),
        ConfigCommands::SetUrl { url } => commands::config::set_url(&url),
    }
}

impl From<DraftArgs> for commands::tasks::DraftChanges {
    fn from(args: DraftArgs) -> Self {
        Self {
            title: args.title,
            description: args.description,
            effort: args.effort,
            due_date: args.due,
            status: args.status,
        }
    }
}
