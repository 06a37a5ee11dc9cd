use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "atlas.hcl";

/// One `env "<name>" { .. }` block resolved from atlas.hcl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
	pub url: Option<String>,
	pub revisions_schema: Option<String>,
}

#[derive(Debug, Default)]
pub struct Config {
	envs: BTreeMap<String, EnvConfig>,
}

// Serde shape of atlas.hcl. Labelled blocks decode as maps keyed by
// label, and unknown attributes or blocks are ignored.
#[derive(Debug, Deserialize)]
struct AtlasFile {
	#[serde(default)]
	env: BTreeMap<String, EnvBlock>,
}

#[derive(Debug, Deserialize)]
struct EnvBlock {
	#[serde(default)]
	url: Option<String>,
	#[serde(default)]
	migration: Option<MigrationBlock>,
}

#[derive(Debug, Deserialize)]
struct MigrationBlock {
	#[serde(default)]
	revisions_schema: Option<String>,
}

pub fn load(path: Option<&Path>) -> Result<Config> {
	let path = match path {
		Some(p) => p.to_path_buf(),
		None => find_default_config().ok_or_else(|| {
			anyhow!("{DEFAULT_CONFIG_FILE} not found in current directory")
		})?,
	};

	if !path.exists() {
		return Err(anyhow!("config file not found: {}", path.display()));
	}

	let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
	parse(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn parse(raw: &str) -> Result<Config> {
	let file: AtlasFile = hcl::from_str(raw)?;

	let envs = file
		.env
		.into_iter()
		.map(|(name, block)| {
			let cfg = EnvConfig {
				// An empty url attribute counts as missing.
				url: block.url.filter(|u| !u.is_empty()),
				revisions_schema: block.migration.and_then(|m| m.revisions_schema),
			};
			(name, cfg)
		})
		.collect();

	Ok(Config { envs })
}

impl Config {
	pub fn get_env(&self, name: &str) -> Result<&EnvConfig> {
		self.envs.get(name).ok_or_else(|| {
			let available: Vec<&str> = self.envs.keys().map(String::as_str).collect();
			anyhow!(
				"environment '{name}' not found. Available: [{}]",
				available.join(", ")
			)
		})
	}
}

fn find_default_config() -> Option<PathBuf> {
	let path = PathBuf::from(DEFAULT_CONFIG_FILE);
	path.exists().then_some(path)
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE: &str = r#"
env "local" {
	url = "postgres://root@localhost:5432/app?sslmode=disable"
	migration {
		dir = "file://migrations"
		revisions_schema = "public"
	}
}

env "prod" {
	url = "postgres://root@db.internal:5432/app"
}
"#;

	#[test]
	fn lookup_returns_url_and_schema_override() {
		let cfg = parse(SAMPLE).expect("sample should parse");

		let local = cfg.get_env("local").expect("local should exist");
		assert_eq!(
			local.url.as_deref(),
			Some("postgres://root@localhost:5432/app?sslmode=disable")
		);
		assert_eq!(local.revisions_schema.as_deref(), Some("public"));

		let prod = cfg.get_env("prod").expect("prod should exist");
		assert_eq!(prod.revisions_schema, None);
	}

	#[test]
	fn missing_env_lists_available_names() {
		let cfg = parse(SAMPLE).expect("sample should parse");

		let err = cfg.get_env("staging").expect_err("staging is not defined");
		let message = err.to_string();
		assert!(message.contains("'staging' not found"));
		assert!(message.contains("local"));
		assert!(message.contains("prod"));
	}

	#[test]
	fn empty_url_is_treated_as_missing() {
		let cfg = parse("env \"dev\" {\n\turl = \"\"\n}\n").expect("should parse");
		assert_eq!(cfg.get_env("dev").expect("dev should exist").url, None);
	}

	#[test]
	fn env_without_migration_block_parses() {
		let cfg = parse("env \"dev\" {\n\turl = \"postgres://localhost/dev\"\n}\n")
			.expect("should parse");
		let dev = cfg.get_env("dev").expect("dev should exist");
		assert_eq!(dev.url.as_deref(), Some("postgres://localhost/dev"));
		assert_eq!(dev.revisions_schema, None);
	}

	#[test]
	fn malformed_hcl_fails() {
		assert!(parse("env \"dev\" {").is_err());
	}

	#[test]
	fn load_fails_for_missing_file() {
		let err = load(Some(Path::new("/definitely/not/here/atlas.hcl")))
			.expect_err("path does not exist");
		assert!(err.to_string().contains("config file not found"));
	}

	#[test]
	fn load_reads_file_from_disk() {
		let dir = std::env::temp_dir().join(format!("atlas-history-{}", std::process::id()));
		fs::create_dir_all(&dir).expect("temp dir");
		let path = dir.join("atlas.hcl");
		fs::write(&path, SAMPLE).expect("write sample");

		let cfg = load(Some(&path)).expect("sample should load");
		assert!(cfg.get_env("local").is_ok());

		fs::remove_dir_all(&dir).ok();
	}
}
