use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use spotkit::config::{self, CallOptions, Config, Session};
use spotkit::resource::account::{
    Account, AccountService, CreateAccountInput, DeleteAccountInput, ReadAccountInput,
};
use spotkit::{format_api_error, Client, Field};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for the Spot API
#[derive(Parser, Debug)]
#[command(name = "spotkit", version = spotkit::VERSION, about, long_about = None)]
struct Args {
    /// Account to operate on (overrides SPOTINST_ACCOUNT)
    #[arg(short, long, global = true)]
    account: Option<String>,

    /// Credentials profile (overrides SPOTINST_PROFILE)
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Deadline for each command, in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Maximum attempts per request
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage accounts
    #[command(subcommand)]
    Accounts(AccountsCommand),
}

#[derive(Subcommand, Debug)]
enum AccountsCommand {
    /// List all accounts
    List,
    /// Show one account
    Get { id: String },
    /// Create an account
    Create { name: String },
    /// Delete an account
    Delete { id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("spotkit started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    config::data_dir().join("spotkit.log")
}

fn build_client(args: &Args) -> spotkit::Result<Client> {
    let session = match &args.profile {
        Some(profile) => {
            let profile = profile.clone();
            Session::from_env_with(&move |key: &str| {
                if key == spotkit::api::auth::ENV_PROFILE {
                    Some(profile.clone())
                } else {
                    std::env::var(key).ok()
                }
            })?
        }
        None => Session::new()?,
    };

    let mut overrides = Config::new();
    if let Some(account) = &args.account {
        overrides = overrides.with_account(account.as_str());
    }
    if let Some(max_attempts) = args.max_attempts {
        overrides = overrides.with_max_attempts(max_attempts);
    }

    Client::with_overrides(&session, &overrides)
}

fn print_account(account: &Account) {
    println!(
        "{:<20} {:<30} {}",
        account.id.as_deref().unwrap_or("-"),
        account.name.as_deref().unwrap_or("-"),
        account.provider_external_id.as_deref().unwrap_or("-"),
    );
}

async fn run(args: &Args, options: &CallOptions) -> spotkit::Result<()> {
    let service = AccountService::new(build_client(args)?);

    match &args.command {
        Command::Accounts(AccountsCommand::List) => {
            for account in service.list_accounts(options).await? {
                print_account(&account);
            }
        }
        Command::Accounts(AccountsCommand::Get { id }) => {
            let input = ReadAccountInput {
                account_id: Field::Set(id.clone()),
            };
            match service.read_account(&input, options).await? {
                Some(account) => print_account(&account),
                None => println!("Account {id} not found"),
            }
        }
        Command::Accounts(AccountsCommand::Create { name }) => {
            let input = CreateAccountInput {
                account: Account::named(name.as_str()),
            };
            if let Some(account) = service.create_account(&input, options).await? {
                print_account(&account);
            }
        }
        Command::Accounts(AccountsCommand::Delete { id }) => {
            let input = DeleteAccountInput {
                account_id: Field::Set(id.clone()),
            };
            service.delete_account(&input, options).await?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let cancel = CancellationToken::new();
    let mut options = CallOptions::new().with_cancel(cancel.clone());
    if let Some(secs) = args.timeout {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    if let Err(err) = run(&args, &options).await {
        tracing::error!("Command failed: {}", err);
        eprintln!("Error: {}", format_api_error(&err));
        std::process::exit(1);
    }

    Ok(())
}
