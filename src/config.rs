use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};

use crate::admin_token::{AdminTokenHash, AdminTokenHashError};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "smt-ws",
    about = "SMT configuration web service",
    version = crate::version::VERSION,
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub config: Config,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the SMT configuration over HTTP (default).
    Run,

    /// Read the current SMT configuration once and print it as JSON.
    Read,

    /// Submit an SMT configuration snapshot read from a JSON file.
    Write(WriteArgs),

    /// Print the argon2id hash of an admin token taken from an environment variable.
    HashToken(HashTokenArgs),
}

#[derive(Args, Debug, Clone)]
pub struct WriteArgs {
    /// Snapshot file, or `-` for stdin.
    #[arg(long, value_name = "PATH", default_value = "-")]
    pub from: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct HashTokenArgs {
    #[arg(long = "from-env", value_name = "VAR")]
    pub from_env: String,
}

#[derive(Args, Debug, Clone)]
pub struct Config {
    #[arg(
        long,
        global = true,
        env = "SMT_WS_BIND",
        value_name = "ADDR",
        default_value = "127.0.0.1:4984"
    )]
    pub bind: SocketAddr,

    #[arg(
        long = "yast-base-url",
        global = true,
        env = "SMT_WS_YAST_BASE_URL",
        value_name = "URL",
        default_value = "http://127.0.0.1:4985"
    )]
    pub yast_base_url: String,

    #[arg(
        long = "yast-timeout-secs",
        global = true,
        env = "SMT_WS_YAST_TIMEOUT_SECS",
        value_name = "SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..=300)
    )]
    pub yast_timeout_secs: u64,

    #[arg(
        long = "admin-token-hash",
        global = true,
        env = "SMT_WS_ADMIN_TOKEN_HASH",
        value_name = "HASH",
        default_value = ""
    )]
    pub admin_token_hash: String,
}

impl Config {
    /// `Ok(None)` only when no hash is set; a malformed hash is an error.
    pub fn admin_token_hash(&self) -> Result<Option<AdminTokenHash>, AdminTokenHashError> {
        AdminTokenHash::parse(&self.admin_token_hash)
    }

    pub fn yast_timeout(&self) -> Duration {
        Duration::from_secs(self.yast_timeout_secs)
    }
}
