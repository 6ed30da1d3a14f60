use std::sync::Arc;
use std::time::Duration;

use authprobe::checks::{check_endpoint_auth_guard, check_flag};
use authprobe::config::{ApiBase, DEFAULT_FLAG_NAME, DEFAULT_ORIGIN, DEFAULT_PROMPT, InitiateForm, ProbeSettings};
use authprobe::token::{assess_expiry, decode_token_payload};
use authprobe::transport::TransportError;
use authprobe::{Orchestrator, PasswordGrantProvider, ReqwestTransport, SessionProvider, StaticSessionProvider};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("http client build failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "authprobe", about = "Session, bearer-token and feature-flag probes for the agents backend")]
struct Cli {
    /// Backend base URL; when unset, API paths are same-origin relative.
    #[arg(long, env = "BACKEND_URL")]
    base_url: Option<String>,

    /// Origin used to resolve relative API paths.
    #[arg(long, env = "AUTHPROBE_ORIGIN", default_value = DEFAULT_ORIGIN)]
    origin: String,

    /// Per-request timeout. No timeout when unset.
    #[arg(long, env = "AUTHPROBE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[arg(long, env = "AUTHPROBE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[arg(long, env = "SUPABASE_URL")]
    auth_url: Option<String>,

    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    anon_key: Option<String>,

    #[arg(long, env = "AUTHPROBE_EMAIL")]
    email: Option<String>,

    #[arg(long, env = "AUTHPROBE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print results as JSON instead of the text summary.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every probe and print a summary (default).
    Run(RunArgs),
    /// Decode a bearer token's payload without verifying it.
    Decode { token: String },
    /// Read one feature flag.
    Flag {
        #[arg(default_value = DEFAULT_FLAG_NAME)]
        name: String,
    },
    /// Call an API endpoint without credentials and classify the guard.
    Guard { endpoint: String },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    #[arg(long, default_value = DEFAULT_FLAG_NAME)]
    flag: String,

    #[arg(long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    #[arg(long)]
    model_name: Option<String>,

    #[arg(long)]
    enable_thinking: Option<bool>,

    #[arg(long)]
    stream: Option<bool>,

    #[arg(long)]
    enable_context_manager: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let timeout = cli.timeout_secs.map(Duration::from_secs);
    let transport = ReqwestTransport::new(&cli.origin, timeout)?;
    let api = ApiBase::new(cli.base_url.clone());

    match cli.command {
        Some(Command::Decode { ref token }) => run_decode(token, cli.json),
        Some(Command::Flag { ref name }) => {
            match check_flag(&transport, &api, name).await {
                Ok(status) if cli.json => print_json(&status)?,
                Ok(status) => println!("{name}: {}", if status.enabled { "enabled" } else { "disabled" }),
                Err(e) => println!("{name}: {e}"),
            }
            Ok(())
        }
        Some(Command::Guard { ref endpoint }) => {
            let guard = check_endpoint_auth_guard(&transport, &api.url(endpoint)).await;
            println!("{endpoint}: {} ({})", guard.summary(), if guard.passed() { "PASS" } else { "FAIL" });
            Ok(())
        }
        Some(Command::Run(ref args)) => run_all(&cli, transport, api, args, timeout).await,
        None => run_all(&cli, transport, api, &RunArgs::default_values(), timeout).await,
    }
}

impl RunArgs {
    fn default_values() -> Self {
        Self { flag: DEFAULT_FLAG_NAME.to_owned(), prompt: DEFAULT_PROMPT.to_owned(), ..Self::default() }
    }
}

async fn run_all(
    cli: &Cli,
    transport: ReqwestTransport,
    api: ApiBase,
    args: &RunArgs,
    timeout: Option<Duration>,
) -> Result<(), CliError> {
    let provider = session_provider(cli, timeout)?;
    let settings = ProbeSettings {
        api,
        flag_name: args.flag.clone(),
        initiate: InitiateForm {
            prompt: args.prompt.clone(),
            model_name: args.model_name.clone(),
            enable_thinking: args.enable_thinking,
            stream: args.stream,
            enable_context_manager: args.enable_context_manager,
        },
    };

    let report = Orchestrator::new(Arc::new(transport), provider, settings).run().await;
    if cli.json {
        print_json(&report)?;
    } else {
        println!("{}", report.render());
    }
    Ok(())
}

/// Access token wins, then an email/password sign-in, then the bare anon key.
fn session_provider(
    cli: &Cli,
    timeout: Option<Duration>,
) -> Result<Option<Arc<dyn SessionProvider>>, CliError> {
    if let Some(token) = &cli.access_token {
        return Ok(Some(Arc::new(StaticSessionProvider::new(token.clone()))));
    }
    if let (Some(auth_url), Some(anon_key), Some(email), Some(password)) =
        (&cli.auth_url, &cli.anon_key, &cli.email, &cli.password)
    {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let provider =
            PasswordGrantProvider::new(builder.build()?, auth_url, anon_key.clone(), email.clone(), password.clone());
        return Ok(Some(Arc::new(provider)));
    }
    if let Some(anon_key) = &cli.anon_key {
        tracing::warn!("no user credentials configured; probing with the project anon key");
        return Ok(Some(Arc::new(StaticSessionProvider::new(anon_key.clone()))));
    }
    Ok(None)
}

fn run_decode(token: &str, json: bool) -> Result<(), CliError> {
    let payload = match decode_token_payload(token) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "could not decode token payload");
            return Ok(());
        }
    };
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let status = assess_expiry(&payload, now);
    if json {
        print_json(&serde_json::json!({ "payload": payload, "status": status }))?;
    } else {
        println!("{payload:#?}");
        println!("status: {status:?}");
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
