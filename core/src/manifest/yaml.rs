use std::{
    env, fs,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info};

use crate::{
    database::{mysql::batch_operations::BulkInsertPlan, schema::TIME_PLACEHOLDER},
    manifest::core::{Manifest, ValidateManifestError},
};

pub const YAML_CONFIG_NAME: &str = "mysql_bulk.yaml";

static ENV_VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid"));

#[derive(thiserror::Error, Debug)]
pub enum ReadManifestError {
    #[error("Could not open file: {0}")]
    CouldNotOpenFile(#[from] std::io::Error),

    #[error("Could not parse manifest: {0}")]
    CouldNotParseManifest(#[from] serde_yaml::Error),

    #[error("Environment variable {0} not found")]
    EnvironmentVariableNotFound(String),

    #[error("Manifest is invalid: {0}")]
    InvalidManifest(#[from] ValidateManifestError),
}

/// Replaces `${VAR}` with the environment value. `${time}` is left for the formatter.
fn substitute_env_variables(contents: &str) -> Result<String, ReadManifestError> {
    for caps in ENV_VARIABLE_REGEX.captures_iter(contents) {
        let var_name = &caps[1];
        if &caps[0] != TIME_PLACEHOLDER && env::var(var_name).is_err() {
            error!("Environment variable {} not found", var_name);
            return Err(ReadManifestError::EnvironmentVariableNotFound(var_name.to_string()));
        }
    }

    let result = ENV_VARIABLE_REGEX.replace_all(contents, |caps: &regex::Captures| {
        if &caps[0] == TIME_PLACEHOLDER {
            caps[0].to_string()
        } else {
            env::var(&caps[1]).unwrap_or_default()
        }
    });

    Ok(result.into_owned())
}

fn load_env_next_to(manifest_path: &Path) {
    let env_path: PathBuf =
        manifest_path.parent().map(|dir| dir.join(".env")).unwrap_or_else(|| PathBuf::from(".env"));
    if dotenv::from_path(&env_path).is_err() {
        dotenv::dotenv().ok();
    }
}

pub fn read_manifest(file_path: &Path) -> Result<Manifest, ReadManifestError> {
    load_env_next_to(file_path);

    let contents = fs::read_to_string(file_path)?;
    let substituted = substitute_env_variables(&contents)?;
    let manifest: Manifest = serde_yaml::from_str(&substituted)?;

    Ok(manifest)
}

/// Reads and validates a manifest into a ready to use plan.
pub fn load_bulk_insert_plan(file_path: &Path) -> Result<BulkInsertPlan, ReadManifestError> {
    let manifest = read_manifest(file_path)?;
    let plan = manifest.validate()?;

    info!(
        "Loaded bulk insert plan for table {} with {} columns",
        plan.table,
        plan.schema.len()
    );

    Ok(plan)
}
