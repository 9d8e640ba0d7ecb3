//! Configuration loading for the Unseen simulator.
//!
//! Files may be TOML, JSON or YAML (chosen by extension). `${VAR}`
//! references are substituted from the environment before parsing, then
//! `UNSEEN_*` variables override individual settings, and the result is
//! validated before it is handed out.

use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use unseen_static::INVERSE_BASIS_POINT;
use unseen_types::Address;

pub mod types;

pub use types::*;
pub use unseen_core::ExchangeConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
	Toml,
	Json,
	Yaml,
}

impl ConfigFormat {
	pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Ok(Self::Toml),
			Some("json") => Ok(Self::Json),
			Some("yaml") | Some("yml") => Ok(Self::Yaml),
			_ => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {}",
				path.display()
			))),
		}
	}
}

/// Configuration loader with environment variable substitution.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "UNSEEN_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	/// Reads, overrides and validates the configuration.
	///
	/// Without a file the defaults are used.
	pub async fn load(&self) -> Result<Config, ConfigError> {
		let mut config = match &self.file_path {
			Some(path) => self.load_from_file(path).await?,
			None => Config::default(),
		};

		self.apply_env_overrides(&mut config, |name| env::var(name).ok())?;
		validate_config(&config)?;
		Ok(config)
	}

	async fn load_from_file(&self, path: &Path) -> Result<Config, ConfigError> {
		info!("Loading configuration from {}", path.display());
		let content = match tokio::fs::read_to_string(path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(ConfigError::FileNotFound(path.display().to_string()))
			}
			Err(e) => return Err(e.into()),
		};

		let substituted = substitute_env_vars(&content, |name| env::var(name).ok())?;
		Self::parse(&substituted, ConfigFormat::from_path(path)?)
	}

	/// Parses a document without overrides or validation.
	pub fn parse(contents: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
		match format {
			ConfigFormat::Toml => {
				toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
			}
			ConfigFormat::Json => {
				serde_json::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
			}
			ConfigFormat::Yaml => {
				serde_yaml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
			}
		}
	}

	/// Applies `<prefix>*` overrides read through `lookup`.
	pub fn apply_env_overrides<F>(&self, config: &mut Config, lookup: F) -> Result<(), ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |suffix: &str| lookup(&format!("{}{}", self.env_prefix, suffix));

		if let Some(chain_id) = var("CHAIN_ID") {
			debug!("Overriding chain id from environment");
			config.exchange.chain_id = parse_override("CHAIN_ID", &chain_id)?;
		}
		if let Some(bps) = var("PROTOCOL_FEE_BPS") {
			debug!("Overriding protocol fee from environment");
			config.exchange.protocol_fee_bps = parse_override("PROTOCOL_FEE_BPS", &bps)?;
		}
		if let Some(recipient) = var("FEE_RECIPIENT") {
			debug!("Overriding fee recipient from environment");
			config.exchange.fee_recipient = parse_override::<Address>("FEE_RECIPIENT", &recipient)?;
		}
		if let Some(delay) = var("DELAY_PERIOD_SECS") {
			config.registry.delay_period_secs = parse_override("DELAY_PERIOD_SECS", &delay)?;
		}
		if let Some(backend) = var("STORAGE_BACKEND") {
			debug!("Overriding storage backend from environment");
			config.storage.backend = backend;
		}
		if let Some(path) = var("STORAGE_PATH") {
			config.storage.path = Some(PathBuf::from(path));
		}
		if let Some(key) = var("FIRST_MAKER_KEY") {
			config.simulation.first_maker_key = key;
		}
		if let Some(key) = var("SECOND_MAKER_KEY") {
			config.simulation.second_maker_key = key;
		}

		Ok(())
	}
}

fn parse_override<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
	T: std::str::FromStr,
	T::Err: std::fmt::Display,
{
	value
		.parse()
		.map_err(|e| ConfigError::ValidationError(format!("Invalid {}: {}", name, e)))
}

/// Replaces every `${VAR}` in `content` with the value `lookup` returns.
pub fn substitute_env_vars<F>(content: &str, lookup: F) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;
	let mut result = content.to_string();

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];
		let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVarNotFound(var_name.to_string()))?;
		result = result.replace(full_match, &value);
	}

	Ok(result)
}

fn is_private_key(key: &str) -> bool {
	key.strip_prefix("0x")
		.is_some_and(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Checks cross-field constraints that deserialization cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
	let invalid = |message: String| -> Result<(), ConfigError> {
		Err(ConfigError::ValidationError(message))
	};
	let exchange = &config.exchange;

	if exchange.name.is_empty() || exchange.version.is_empty() {
		return invalid("Exchange name and version must not be empty".to_string());
	}
	if exchange.chain_id == 0 {
		return invalid("Chain id must be nonzero".to_string());
	}
	if exchange.protocol_fee_bps > INVERSE_BASIS_POINT {
		return invalid(format!(
			"Protocol fee {} bps exceeds {}",
			exchange.protocol_fee_bps, INVERSE_BASIS_POINT
		));
	}
	if exchange.protocol_fee_bps > 0 && exchange.fee_recipient == Address::ZERO {
		return invalid("A protocol fee requires a fee recipient".to_string());
	}

	match config.storage.backend.as_str() {
		"memory" | "file" => {}
		other => return invalid(format!("Unknown storage backend '{}'", other)),
	}

	let simulation = &config.simulation;
	for (name, key) in [
		("first_maker_key", &simulation.first_maker_key),
		("second_maker_key", &simulation.second_maker_key),
	] {
		if !is_private_key(key) {
			return invalid(format!("{} must be 0x followed by 64 hex digits", name));
		}
	}
	if simulation.first_maker_key.eq_ignore_ascii_case(&simulation.second_maker_key) {
		return invalid("Simulation makers must use different keys".to_string());
	}
	if simulation.price == 0 {
		return invalid("Simulation price must be nonzero".to_string());
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	const TOML: &str = r#"
[exchange]
name = "Unseen Exchange"
version = "1.0"
chain_id = 5
protocol_fee_bps = 250
fee_recipient = "0xfefefefefefefefefefefefefefefefefefefefe"

[registry]
delay_period_secs = 60

[storage]
backend = "file"
path = "./data/ledger"

[simulation]
start_timestamp = 1000
"#;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| vars.get(name).cloned()
	}

	#[test]
	fn test_toml_parsing() {
		let config = ConfigLoader::parse(TOML, ConfigFormat::Toml).unwrap();
		assert_eq!(config.exchange.chain_id, 5);
		assert_eq!(config.exchange.protocol_fee_bps, 250);
		assert_eq!(config.exchange.fee_recipient, Address::repeat_byte(0xfe));
		// Unset fields fall back to defaults.
		assert_eq!(
			config.exchange.personal_sign_prefix,
			ExchangeConfig::default().personal_sign_prefix
		);
		assert_eq!(config.registry.delay_period_secs, 60);
		assert_eq!(config.storage.path, Some(PathBuf::from("./data/ledger")));
		assert_eq!(config.simulation.start_timestamp, 1000);
		assert_eq!(config.simulation.price, 100);
		validate_config(&config).unwrap();
	}

	#[test]
	fn test_json_and_yaml_parsing() {
		let json = r#"{ "exchange": { "chain_id": 10 }, "storage": { "backend": "memory" } }"#;
		let config = ConfigLoader::parse(json, ConfigFormat::Json).unwrap();
		assert_eq!(config.exchange.chain_id, 10);
		assert_eq!(config.exchange.name, "Unseen Exchange");

		let yaml = "registry:\n  delay_period_secs: 5\nsimulation:\n  price: 7\n";
		let config = ConfigLoader::parse(yaml, ConfigFormat::Yaml).unwrap();
		assert_eq!(config.registry.delay_period_secs, 5);
		assert_eq!(config.simulation.price, 7);
	}

	#[test]
	fn test_format_from_extension() {
		assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
		assert_eq!(ConfigFormat::from_path(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
		assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
	}

	#[test]
	fn test_env_substitution() {
		let content = "fee_recipient = \"${RECIPIENT}\"\nname = \"${NAME}\"";
		let substituted = substitute_env_vars(
			content,
			lookup(&[("RECIPIENT", "0x01"), ("NAME", "Test")]),
		)
		.unwrap();
		assert_eq!(substituted, "fee_recipient = \"0x01\"\nname = \"Test\"");

		assert!(matches!(
			substitute_env_vars("${MISSING}", lookup(&[])),
			Err(ConfigError::EnvVarNotFound(name)) if name == "MISSING"
		));
	}

	#[test]
	fn test_env_overrides() {
		let loader = ConfigLoader::new();
		let mut config = Config::default();
		loader
			.apply_env_overrides(
				&mut config,
				lookup(&[
					("UNSEEN_CHAIN_ID", "137"),
					("UNSEEN_STORAGE_BACKEND", "file"),
					("UNSEEN_STORAGE_PATH", "/var/lib/unseen"),
					("OTHER_CHAIN_ID", "1"),
				]),
			)
			.unwrap();
		assert_eq!(config.exchange.chain_id, 137);
		assert_eq!(config.storage.backend, "file");
		assert_eq!(config.storage.path, Some(PathBuf::from("/var/lib/unseen")));

		assert!(matches!(
			loader.apply_env_overrides(&mut config, lookup(&[("UNSEEN_CHAIN_ID", "mainnet")])),
			Err(ConfigError::ValidationError(_))
		));
	}

	#[test]
	fn test_custom_prefix() {
		let loader = ConfigLoader::new().with_env_prefix("SIM_");
		let mut config = Config::default();
		loader
			.apply_env_overrides(&mut config, lookup(&[("SIM_PROTOCOL_FEE_BPS", "100")]))
			.unwrap();
		assert_eq!(config.exchange.protocol_fee_bps, 100);
	}

	#[test]
	fn test_validation() {
		validate_config(&Config::default()).unwrap();

		let mut config = Config::default();
		config.exchange.protocol_fee_bps = 10_001;
		assert!(validate_config(&config).is_err());

		let mut config = Config::default();
		config.exchange.protocol_fee_bps = 100;
		let err = validate_config(&config).unwrap_err();
		assert!(err.to_string().contains("fee recipient"));

		let mut config = Config::default();
		config.storage.backend = "redis".to_string();
		assert!(validate_config(&config).is_err());

		let mut config = Config::default();
		config.simulation.second_maker_key = config.simulation.first_maker_key.clone();
		assert!(validate_config(&config).is_err());

		let mut config = Config::default();
		config.simulation.first_maker_key = "0x1234".to_string();
		assert!(validate_config(&config).is_err());
	}

	#[tokio::test]
	async fn test_load_from_file() {
		let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
		file.write_all(TOML.as_bytes()).unwrap();

		let config = ConfigLoader::new()
			.with_env_prefix("UNSEEN_TEST_LOAD_")
			.with_file(file.path())
			.load()
			.await
			.unwrap();
		assert_eq!(config.exchange.chain_id, 5);
	}

	#[tokio::test]
	async fn test_missing_file() {
		let result = ConfigLoader::new()
			.with_file("/nonexistent/unseen.toml")
			.load()
			.await;
		assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
	}
}
