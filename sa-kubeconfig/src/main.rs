use std::env;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use tracing::debug;

use sakube::tracing_support::initialize_tracing;
use sakube::{
    acquire_credentials, destination_path, emit, resolve_source, ConfigSource, ConnectionConfig, Error,
    KubeClusterClient, Options, OutputFormat, ServiceAccountRef, TerminalPrompt,
};

mod errors;

use errors::DisplayCausesExt;

const USAGE: &str = "a ServiceAccount name is required

Usage: sa-kubeconfig --service-account=<NAME> [-n <NAMESPACE>] [-o yaml|json]
       sa-kubeconfig --sa=<NAME> [-n <NAMESPACE>] [-o yaml|json]";

/// Write a standalone kubeconfig that authenticates as a ServiceAccount.
#[derive(Debug, Parser)]
#[command(name = "sa-kubeconfig", version)]
struct Args {
    /// ServiceAccount name.
    #[arg(long = "service-account", value_name = "NAME")]
    service_account: Option<String>,

    /// ServiceAccount name; wins over --service-account when both are given.
    #[arg(long = "sa", value_name = "NAME")]
    sa: Option<String>,

    /// Namespace of the ServiceAccount [default: the current context's, else "default"]
    #[arg(short, long)]
    namespace: Option<String>,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Create a token Secret when the ServiceAccount has none.
    #[arg(long)]
    create_secret: bool,

    /// Do not ask before creating a Secret.
    #[arg(short, long)]
    yes: bool,
}

impl Args {
    fn options(&self) -> Options {
        Options {
            strict_secret_existence: !self.create_secret,
            interactive_auto_create: !self.yes,
            ..Options::default()
        }
    }

    /// The ServiceAccount name. A flag given with an empty value counts as absent.
    fn service_account_name(&self) -> Option<String> {
        let given = |value: &Option<String>| value.clone().filter(|name| !name.is_empty());
        self.options()
            .flag_precedence
            .resolve(given(&self.service_account), given(&self.sa))
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let options = args.options();
    let name = args
        .service_account_name()
        .ok_or_else(|| Error::Usage(USAGE.to_owned()))?;

    let source = resolve_source().map_err(Error::from)?;
    match &source {
        ConfigSource::Env(path) => println!("KUBECONFIG is set, using {}", path.display()),
        ConfigSource::Home(path) => println!("Kubeconfig Path: {}", path.display()),
    }
    let connection = ConnectionConfig::load(source).map_err(Error::from)?;
    let account = ServiceAccountRef {
        namespace: connection.namespace_or_default(args.namespace.as_deref()),
        name,
    };
    debug!(?account, ?options, "resolved target");

    let client = KubeClusterClient::connect(connection.source.path())
        .await
        .map_err(Error::from)?;
    let acquired = acquire_credentials(&client, &account, &connection.endpoint, &options, &TerminalPrompt).await?;
    if let Some(secret) = &acquired.created_secret {
        println!("Created Secret {}/{secret}", account.namespace);
    }

    let current_dir = env::current_dir().context("failed to determine the current directory")?;
    for (index, credential) in acquired.credentials.iter().enumerate() {
        let destination = destination_path(&current_dir, &account.name, index);
        emit(credential, &destination, args.output)?;

        println!("kubernetes API Server: {}", credential.host);
        println!("ServiceAccount Name: {}", credential.username);
        println!("Kubeconfig File: {}", destination.display());
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Usage errors go to stdout with status 1, help and version exit cleanly.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            print!("{err}");
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    initialize_tracing();
    debug!(?args, "parsed arguments");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print!("{}", err.display_causes());
            ExitCode::FAILURE
        }
    }
}
