//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{fmt, net::SocketAddr, path::PathBuf, str::FromStr};

use axum::http::HeaderValue;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

mod cli;

pub use cli::{CliArgs, Command, FragmentArgs, ServeArgs, ServeOverrides, SsiOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "edgeblock";
const ENV_PREFIX: &str = "EDGEBLOCK";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ROUTE_PREFIX: &str = "/_fragments/ssi";
pub const DEFAULT_RENDER_CACHE_CONTROL: &str = "no-store";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub ssi: SsiSettings,
    pub blocks: CatalogSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct SsiSettings {
    pub secret: SigningSecret,
    pub route_prefix: String,
    pub render_cache_control: HeaderValue,
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub catalog: Option<PathBuf>,
}

/// Token signing secret. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(..)")
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Include(args)) | Some(Command::Sign(args)) => {
            raw.apply_ssi_overrides(&args.ssi)
        }
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    use clap::Parser;

    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    ssi: RawSsiSettings,
    blocks: RawCatalogSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(value) = overrides.render_cache_control.as_ref() {
            self.ssi.render_cache_control = Some(value.clone());
        }
        if let Some(path) = overrides.blocks_catalog.as_ref() {
            self.blocks.catalog = Some(path.clone());
        }
        self.apply_ssi_overrides(&overrides.ssi);
    }

    fn apply_ssi_overrides(&mut self, overrides: &SsiOverrides) {
        if let Some(prefix) = overrides.route_prefix.as_ref() {
            self.ssi.route_prefix = Some(prefix.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            ssi,
            blocks,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            ssi: build_ssi_settings(ssi)?,
            blocks: build_catalog_settings(blocks)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_ssi_settings(ssi: RawSsiSettings) -> Result<SsiSettings, LoadError> {
    let secret = ssi
        .secret
        .ok_or_else(|| LoadError::invalid("ssi.secret", "a signing secret must be configured"))?;
    if secret.trim().is_empty() {
        return Err(LoadError::invalid("ssi.secret", "must not be empty"));
    }

    let route_prefix = ssi
        .route_prefix
        .unwrap_or_else(|| DEFAULT_ROUTE_PREFIX.to_string());
    validate_route_prefix(&route_prefix)
        .map_err(|reason| LoadError::invalid("ssi.route_prefix", reason))?;

    let cache_control = ssi
        .render_cache_control
        .unwrap_or_else(|| DEFAULT_RENDER_CACHE_CONTROL.to_string());
    let render_cache_control = HeaderValue::from_str(cache_control.trim()).map_err(|err| {
        LoadError::invalid("ssi.render_cache_control", format!("invalid header: {err}"))
    })?;

    Ok(SsiSettings {
        secret: SigningSecret(secret),
        route_prefix,
        render_cache_control,
    })
}

fn build_catalog_settings(blocks: RawCatalogSettings) -> Result<CatalogSettings, LoadError> {
    let catalog = blocks.catalog.filter(|path| !path.as_os_str().is_empty());
    Ok(CatalogSettings { catalog })
}

fn validate_route_prefix(prefix: &str) -> Result<(), String> {
    if !prefix.starts_with('/') {
        return Err(format!("`{prefix}` must start with `/`"));
    }
    if prefix.contains(['{', '}', '?', '#']) || prefix.chars().any(char::is_whitespace) {
        return Err(format!("`{prefix}` contains reserved characters"));
    }
    if prefix.trim_end_matches('/').contains("//") {
        return Err(format!("`{prefix}` contains an empty path segment"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSsiSettings {
    secret: Option<String>,
    route_prefix: Option<String>,
    render_cache_control: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCatalogSettings {
    catalog: Option<PathBuf>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}
