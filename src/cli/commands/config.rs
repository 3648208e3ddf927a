//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{GitspaceError, GitspaceResult};
use crate::ui::{self, UiContext};

/// Value type of a settable key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyType {
    String,
    Bool,
    Integer,
    List,
}

const KEYS: &[(&str, KeyType)] = &[
    ("workspace.override_path", KeyType::String),
    ("workspace.hint_vars", KeyType::List),
    ("workspace.cache_ttl_secs", KeyType::Integer),
    ("workspace.allowed_root", KeyType::String),
    ("workspace.fallback_to_cwd", KeyType::Bool),
    ("git.executable", KeyType::String),
    ("git.timeout_secs", KeyType::Integer),
    ("git.retries", KeyType::Integer),
    ("git.detect_superproject", KeyType::Bool),
    ("git.stale_lock_secs", KeyType::Integer),
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> GitspaceResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => print!("{}", toml::to_string_pretty(config)?),
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, &key, &value).await?,
    }

    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> GitspaceResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> GitspaceResult<()> {
    let ctx = UiContext::detect();
    let parsed = parse_value(key, value).map_err(|reason| GitspaceError::ConfigInvalid {
        path: manager.path().to_path_buf(),
        reason,
    })?;

    manager.set_value(key, parsed).await?;
    ui::step_ok(&ctx, &format!("Set {key} = {value}"));
    Ok(())
}

/// Parse `value` according to the type of `key`
fn parse_value(key: &str, value: &str) -> Result<toml_edit::Value, String> {
    let Some(&(_, kind)) = KEYS.iter().find(|(name, _)| *name == key) else {
        let known: Vec<&str> = KEYS.iter().map(|(name, _)| *name).collect();
        return Err(format!(
            "unknown key '{key}' (valid keys: {})",
            known.join(", ")
        ));
    };

    match kind {
        KeyType::String => Ok(value.into()),
        KeyType::Bool => match value.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true.into()),
            "false" | "0" | "no" => Ok(false.into()),
            _ => Err(format!("{key} expects true or false, got '{value}'")),
        },
        KeyType::Integer => value
            .parse::<u32>()
            .map(|n| i64::from(n).into())
            .map_err(|_| format!("{key} expects a non-negative number, got '{value}'")),
        KeyType::List => Ok(value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<toml_edit::Array>()
            .into()),
    }
}
