//! Command-line client for the user directory and authentication service.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use auth_rpc::directory::model::{Credentials, Role, Token, User};
use auth_rpc::error::RpcError;
use auth_rpc::service::{RemoteAuthenticationService, RemoteUserDirectory};
use auth_rpc::token_store::{load_token, save_token, token_path};

#[derive(Parser, Debug)]
#[command(name = "auth-rpc-client", about = "RPC client for the user directory")]
struct Cli {
    /// Server address in the form host:port
    address: String,

    /// Operation to invoke
    #[arg(value_enum)]
    command: Command,

    #[arg(long, short = 'u')]
    user: Option<String>,

    /// E-mail address; may be given more than once
    #[arg(long = "email", short = 'a', num_args = 1..)]
    emails: Vec<String>,

    /// Full name
    #[arg(long, short = 'n')]
    name: Option<String>,

    #[arg(long, short = 'r', value_enum, default_value_t = RoleArg::User)]
    role: RoleArg,

    #[arg(long, short = 'p')]
    password: Option<String>,

    /// Token file presented with `get`, or validated by `validate`
    #[arg(long, short = 't')]
    token: Option<PathBuf>,

    /// Token file written by `authenticate` and read by `validate`; a
    /// directory receives `<user>.json`
    #[arg(long)]
    path: Option<PathBuf>,

    /// Requested token lifetime for `authenticate`
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Log at debug level
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Command {
    Add,
    Get,
    Check,
    Authenticate,
    Validate,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Admin,
    User,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => Role::Admin,
            RoleArg::User => Role::User,
        }
    }
}

/// Why a command did not complete
enum Failure {
    /// Bad or missing arguments; nothing was sent
    Usage(String),
    Rpc(RpcError),
}

impl From<RpcError> for Failure {
    fn from(e: RpcError) -> Self {
        Failure::Rpc(e)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Usage(message)) => {
            eprintln!("error: {message}");
            ExitCode::from(2)
        }
        Err(Failure::Rpc(e)) => {
            println!("[{}] {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Failure> {
    let users = RemoteUserDirectory::connect(cli.address.clone());
    let auth = RemoteAuthenticationService::connect(cli.address.clone());

    match cli.command {
        Command::Add => {
            let username = cli.user.clone().ok_or_else(|| usage("Username is required"))?;
            let password = cli.password.clone().ok_or_else(|| usage("Password is required"))?;
            let name = cli.name.clone().ok_or_else(|| usage("Full name is required"))?;

            let user = cli
                .emails
                .iter()
                .fold(User::new(username, name, cli.role.into(), password), |user, email| {
                    user.with_email(email.as_str())
                });
            users.add_user(&user).await?;
            println!("User {} added", user.username);
        }
        Command::Get => {
            let id = primary_id(&cli)?;
            let token = cli.token.as_ref().map(load_token).transpose()?;
            let user = users.get_user(&id, token.as_ref()).await?;
            println!("{user}");
        }
        Command::Check => {
            let credentials = credentials(&cli)?;
            println!("{}", users.check_password(&credentials).await?);
        }
        Command::Authenticate => {
            let path = cli
                .path
                .clone()
                .ok_or_else(|| usage("Path to token file is required"))?;
            let credentials = credentials(&cli)?;
            let token = auth
                .authenticate(&credentials, cli.duration_secs.map(Duration::from_secs))
                .await?;
            println!("{token}");
            let path = if path.is_dir() {
                token_path(&path, &token.user)
            } else {
                path
            };
            save_token(&path, &token)?;
        }
        Command::Validate => {
            let token = presented_token(&cli)?;
            println!("{}", auth.validate_token(&token).await?);
        }
    }
    Ok(())
}

fn usage(message: &str) -> Failure {
    Failure::Usage(message.to_string())
}

/// Username if given, otherwise the first e-mail
fn primary_id(cli: &Cli) -> Result<String, Failure> {
    cli.user
        .clone()
        .or_else(|| cli.emails.first().cloned())
        .ok_or_else(|| usage("Username or email address is required"))
}

fn credentials(cli: &Cli) -> Result<Credentials, Failure> {
    let id = primary_id(cli)?;
    let password = cli.password.clone().ok_or_else(|| usage("Password is required"))?;
    Ok(Credentials::new(id, password))
}

fn presented_token(cli: &Cli) -> Result<Token, Failure> {
    let path = match (&cli.path, &cli.token) {
        (Some(path), _) if path.exists() => path,
        (_, Some(token)) => token,
        (Some(path), None) => path,
        (None, None) => return Err(usage("Token or path is required")),
    };
    Ok(load_token(path)?)
}
