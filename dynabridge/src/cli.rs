//! # CLI
//!
//! This module defines the command-line interface of `dynabridge` using `clap`.
//!
//! It is responsible for parsing user input and for splitting call arguments into
//! `key=value` pairs and positional values.
use clap::{Args, Parser, Subcommand};
use dynabridge_core::{Credential, Settings, config::DEFAULT_DATE_FORMAT};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dynabridge",
    version,
    about = "Call gRPC service operations with key=value arguments"
)]
pub struct Cli {
    /// Path to the descriptor set (.bin) describing the services
    #[arg(short = 'f', long, global = true, default_value = "descriptor.bin")]
    pub file_descriptor_set: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the services of the descriptor set
    List,

    /// List the callable operations of a service, with their overloads
    Operations {
        /// Fully qualified service name (e.g. my.package.Service)
        service: String,
    },

    /// Call an operation of a service
    ///
    /// `key=value` arguments build the request message, any other argument is
    /// passed positionally. Values are read as JSON when they parse, as plain strings
    /// otherwise. `@path` passes the content of a file as raw bytes.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// dynabridge -f storage.bin call storage.v1.BucketService list-buckets prefix=logs limit=10
    /// dynabridge -f storage.bin call storage.v1.BucketService put-buckets '[{"name": "a"}]'
    /// ```
    Call {
        /// Fully qualified service name (e.g. my.package.Service)
        service: String,
        /// Operation name, in any naming convention (GetBucket, getBucket, get-bucket)
        operation: String,
        /// Call arguments
        #[arg(value_parser = parse_argument)]
        arguments: Vec<Argument>,

        /// The server URL to connect to
        #[arg(long, default_value = "http://localhost:50051")]
        url: String,

        #[command(flatten)]
        credential: CredentialArgs,

        #[command(flatten)]
        settings: SettingsArgs,
    },
}

#[derive(Args)]
pub struct CredentialArgs {
    #[arg(long, env = "DYNABRIDGE_ACCESS_KEY")]
    pub access_key: Option<String>,
    #[arg(long, env = "DYNABRIDGE_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,
    /// A server URL, or a region name sent as `x-region`
    #[arg(long, env = "DYNABRIDGE_ENDPOINT")]
    pub endpoint: Option<String>,
}

impl CredentialArgs {
    pub fn into_credential(self) -> Option<Credential> {
        let credential = Credential {
            access_key: self.access_key,
            secret_key: self.secret_key,
            endpoint: self.endpoint,
        };
        (credential != Credential::default()).then_some(credential)
    }
}

#[derive(Args)]
pub struct SettingsArgs {
    /// Pattern used to read dates (yyyy, MM, dd, HH, mm, ss)
    #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
    pub date_format: String,
    /// Print the inner value of single-key results
    #[arg(long)]
    pub unwrap_root: bool,
}

impl From<SettingsArgs> for Settings {
    fn from(args: SettingsArgs) -> Self {
        Settings {
            date_format: args.date_format,
            unwrap_root: args.unwrap_root,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Pair(String, serde_json::Value),
    Positional(serde_json::Value),
    File(PathBuf),
}

fn parse_argument(value: &str) -> Result<Argument, String> {
    if let Some(path) = value.strip_prefix('@') {
        if path.is_empty() {
            return Err("Expected a file path after '@'".to_string());
        }
        return Ok(Argument::File(PathBuf::from(path)));
    }

    // JSON documents may contain '=' themselves
    if value.starts_with(['{', '[', '"']) {
        return Ok(Argument::Positional(parse_value(value)));
    }

    match value.split_once('=') {
        Some((key, _)) if key.trim().is_empty() => Err(format!(
            "Invalid argument '{value}': the key of a 'key=value' pair cannot be empty"
        )),
        Some((key, raw)) => Ok(Argument::Pair(key.trim().to_string(), parse_value(raw))),
        None => Ok(Argument::Positional(parse_value(value))),
    }
}

fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pairs_and_positionals() {
        assert_eq!(
            parse_argument("limit=10").unwrap(),
            Argument::Pair("limit".into(), json!(10))
        );
        assert_eq!(
            parse_argument("prefix=logs").unwrap(),
            Argument::Pair("prefix".into(), json!("logs"))
        );
        assert_eq!(
            parse_argument("query=a=b").unwrap(),
            Argument::Pair("query".into(), json!("a=b"))
        );
        assert_eq!(
            parse_argument("true").unwrap(),
            Argument::Positional(json!(true))
        );
        assert_eq!(
            parse_argument(r#"{"filter": "a=b"}"#).unwrap(),
            Argument::Positional(json!({ "filter": "a=b" }))
        );
    }

    #[test]
    fn test_file_arguments() {
        assert_eq!(
            parse_argument("@./body.txt").unwrap(),
            Argument::File(PathBuf::from("./body.txt"))
        );
        assert!(parse_argument("@").is_err());
        assert!(parse_argument("=value").is_err());
    }
}
