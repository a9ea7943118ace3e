//! # Dynabridge CLI Entry Point
//!
//! The main executable for the Dynabridge tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Installs the tracing subscriber and parses command-line
//!    arguments using [`cli::Cli`].
//! 2. **Descriptors**: Loads the `FileDescriptorSet` that describes the services.
//! 3. **Execution**: Interns the requested service into a `Bridge` and calls the operation.
//! 4. **Presentation**: Formats and prints the resulting data or error to standard output/error.
mod cli;
mod formatter;

use clap::Parser;
use cli::{Argument, Cli, Commands, CredentialArgs, SettingsArgs};
use dynabridge_core::{
    Args, Bridge, ClientClass, GrpcServiceClass, Value, prost_reflect::DescriptorPool,
};
use formatter::{FormattedString, GenericError, OperationList, ServiceList};
use std::{path::Path, process, sync::Arc};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Only used to describe operations, never dialed.
const UNUSED_URL: &str = "http://localhost";

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Cli::parse();
    let pool = load_descriptors_or_exit(&args.file_descriptor_set);

    match args.command {
        Commands::List => list_services(&pool),
        Commands::Operations { service } => list_operations(&pool, &service),
        Commands::Call {
            service,
            operation,
            arguments,
            url,
            credential,
            settings,
        } => run_call(&pool, &service, &operation, arguments, url, credential, settings).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("DYNABRIDGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn exit_with(error: impl Into<FormattedString>) -> ! {
    eprintln!("{}", error.into());
    process::exit(1);
}

fn load_descriptors_or_exit(path: &Path) -> DescriptorPool {
    let bytes = std::fs::read(path).unwrap_or_else(|err| exit_with(err));
    DescriptorPool::decode(bytes.as_slice()).unwrap_or_else(|err| exit_with(err))
}

fn service_or_exit(pool: &DescriptorPool, service: &str, url: String) -> GrpcServiceClass {
    GrpcServiceClass::from_pool(pool, service, url).unwrap_or_else(|err| exit_with(err))
}

fn list_services(pool: &DescriptorPool) {
    let services = pool.services().map(|s| s.full_name().to_string()).collect();
    println!("{}", FormattedString::from(ServiceList(services)));
}

fn list_operations(pool: &DescriptorPool, service: &str) {
    let class: Arc<dyn ClientClass> = Arc::new(service_or_exit(pool, service, UNUSED_URL.into()));
    let catalog = Bridge::new().catalog(&class);
    println!("{}", FormattedString::from(OperationList(&catalog)));
}

async fn run_call(
    pool: &DescriptorPool,
    service: &str,
    operation: &str,
    arguments: Vec<Argument>,
    url: String,
    credential: CredentialArgs,
    settings: SettingsArgs,
) {
    let class = service_or_exit(pool, service, url);
    let args = call_args(arguments).unwrap_or_else(|err| exit_with(err));

    let bridge = Bridge::with_settings(settings.into());
    if let Some(credential) = credential.into_credential() {
        bridge.set_default_credential(credential);
    }

    let namespace = bridge.intern(Arc::new(class));
    tracing::debug!(service, operation, arguments = args.len(), "calling operation");

    match namespace.call(operation, args).await {
        Ok(value) => println!("{}", FormattedString::from(value)),
        Err(err) => exit_with(err),
    }
}

fn call_args(arguments: Vec<Argument>) -> Result<Args, GenericError<String>> {
    arguments
        .into_iter()
        .try_fold(Args::new(), |args, argument| match argument {
            Argument::Pair(key, value) => Ok(args.field(key, Value::from(value))),
            Argument::Positional(value) => Ok(args.positional(Value::from(value))),
            Argument::File(path) => std::fs::read(&path)
                .map(|content| args.positional(content))
                .map_err(|err| {
                    GenericError(
                        "Failed to read argument file",
                        format!("{}: {err}", path.display()),
                    )
                }),
        })
}
