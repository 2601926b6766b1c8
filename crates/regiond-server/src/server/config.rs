use anyhow::bail;
use clap::Parser;
use std::path::PathBuf;

/// Build version reported by `--version` and `/healthz`.
///
/// Release pipelines stamp it through `REGIOND_BUILD_VERSION` at compile time;
/// local builds fall back to the crate version.
pub const BUILD_VERSION: &str = match option_env!("REGIOND_BUILD_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Command-line and environment options for the `regiond` binary.
///
/// Every option can be given as a flag or through the upper-cased environment
/// variable of the same name (a `.env` file in the working directory is read
/// first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "regiond",
    about = "Answers which region contains a coordinate, over gRPC and HTTP",
    disable_version_flag = true
)]
pub struct CliArgs {
    /// Path to the geofence store.
    ///
    /// Environment variable: `DBPATH`
    #[arg(long = "dbpath", env = "DBPATH")]
    pub dbpath: Option<PathBuf>,

    /// Enable debug logging and per-query store diagnostics.
    ///
    /// Environment variable: `DEBUG` (`1`, `t`, `true`, `yes`, `on` and their
    /// negations, case-insensitive)
    #[arg(
        long = "debug",
        env = "DEBUG",
        default_value_t = false,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub debug: bool,

    /// Port of the HTTP listener serving `/query`, `/healthz` and `/metrics`.
    ///
    /// Environment variable: `HTTPPORT`
    #[arg(long = "httpPort", env = "HTTPPORT", default_value_t = 8082)]
    pub http_port: u16,

    /// Port of the gRPC listener.
    ///
    /// Environment variable: `GRPCPORT`
    #[arg(long = "grpcPort", env = "GRPCPORT", default_value_t = 8083)]
    pub grpc_port: u16,

    /// Number of resolved points kept in the store's cache, 0 disables it.
    ///
    /// Environment variable: `CACHEDENTRIES`
    #[arg(long = "cachedEntries", env = "CACHEDENTRIES", default_value_t = 0)]
    pub cached_entries: usize,

    /// Print the build version and exit.
    #[arg(long = "version", default_value_t = false)]
    pub version: bool,
}

/// Validated, immutable process configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub dbpath: PathBuf,
    pub debug: bool,
    pub http_port: u16,
    pub grpc_port: u16,
    pub cached_entries: usize,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let Some(dbpath) = args.dbpath.filter(|p| !p.as_os_str().is_empty()) else {
            bail!("DBPATH is required");
        };

        if args.http_port == 0 || args.grpc_port == 0 {
            bail!("HTTPPORT and GRPCPORT must be greater than 0");
        }

        if args.http_port == args.grpc_port {
            bail!(
                "HTTPPORT and GRPCPORT must differ (both set to {})",
                args.http_port
            );
        }

        Ok(Self {
            dbpath,
            debug: args.debug,
            http_port: args.http_port,
            grpc_port: args.grpc_port,
            cached_entries: args.cached_entries,
        })
    }
}
