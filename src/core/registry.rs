//! Process-wide registries
//!
//! Three pieces of state are shared by every logger in the process: custom
//! severity levels, the colorizing palette, and the named-logger singleton
//! map used by [`Logger::get`](super::logger::Logger::get). They are
//! populated by explicit registration calls and are never cleared
//! implicitly. Repeat registrations of a logger name return the cached
//! instance.

use super::error::{LoggerError, Result};
use super::log_level::{LevelValue, LogLevel};
use super::logger::Logger;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

#[derive(Debug, Clone)]
struct CustomLevel {
    name: String,
    value: LevelValue,
}

#[derive(Default)]
struct Registry {
    /// lowercase name -> level
    levels: RwLock<HashMap<String, CustomLevel>>,
    /// lowercase level name -> color name
    colors: RwLock<HashMap<String, String>>,
    loggers: Mutex<BTreeMap<String, Logger>>,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::default)
}

fn validate_level_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LoggerError::config("levels", "level name must not be empty"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(LoggerError::config(
            "levels",
            format!("level name '{}' must be alphanumeric", name),
        ));
    }
    if name.parse::<LogLevel>().is_ok() {
        return Err(LoggerError::config(
            "levels",
            format!("'{}' is a built-in level and cannot be redefined", name),
        ));
    }
    Ok(())
}

/// Register (or overwrite) a custom level
pub fn register_level(name: &str, value: LevelValue, color: Option<&str>) -> Result<()> {
    validate_level_name(name)?;
    let key = name.to_lowercase();
    registry().levels.write().insert(
        key.clone(),
        CustomLevel {
            name: name.to_string(),
            value,
        },
    );
    if let Some(color) = color {
        registry().colors.write().insert(key, color.to_string());
    }
    Ok(())
}

/// Numeric value for a built-in or custom level name
pub fn level_value(name: &str) -> Option<LevelValue> {
    if let Ok(level) = name.parse::<LogLevel>() {
        return Some(level.value());
    }
    registry()
        .levels
        .read()
        .get(&name.to_lowercase())
        .map(|level| level.value)
}

/// Name registered for a custom numeric level
///
/// When several custom names share a value the alphabetically first wins, so
/// the answer is stable across calls.
pub fn level_name(value: LevelValue) -> Option<String> {
    let levels = registry().levels.read();
    let mut names: Vec<&CustomLevel> = levels.values().filter(|l| l.value == value).collect();
    names.sort_by(|a, b| a.name.cmp(&b.name));
    names.first().map(|level| level.name.clone())
}

/// All custom levels, ordered by severity
pub fn custom_levels() -> Vec<(String, LevelValue)> {
    let mut levels: Vec<(String, LevelValue)> = registry()
        .levels
        .read()
        .values()
        .map(|level| (level.name.clone(), level.value))
        .collect();
    levels.sort_by_key(|(_, value)| *value);
    levels
}

/// Set the palette color used for a level name
pub fn set_level_color(name: &str, color: &str) {
    registry()
        .colors
        .write()
        .insert(name.to_lowercase(), color.to_string());
}

/// Palette color for a level name, falling back to the built-in defaults
pub fn level_color(name: &str) -> Option<String> {
    if let Some(color) = registry().colors.read().get(&name.to_lowercase()) {
        return Some(color.clone());
    }
    name.parse::<LogLevel>()
        .ok()
        .map(|level| level.default_color().to_string())
}

/// Return the cached logger for `name`, building it with `create` on first use
///
/// `create` runs without the registry lock held, so it may look up other
/// named loggers. When two callers race on a new name, the first insert wins
/// and the other caller's logger is discarded.
pub(crate) fn logger_or_try_insert_with(
    name: &str,
    create: impl FnOnce() -> Result<Logger>,
) -> Result<Logger> {
    if let Some(logger) = registry().loggers.lock().get(name) {
        return Ok(logger.clone());
    }
    let created = create()?;
    let mut loggers = registry().loggers.lock();
    Ok(loggers.entry(name.to_string()).or_insert(created).clone())
}

pub fn is_logger_registered(name: &str) -> bool {
    registry().loggers.lock().contains_key(name)
}

/// Names of every logger created through `Logger::get`
pub fn registered_logger_names() -> Vec<String> {
    registry().loggers.lock().keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup_level() {
        register_level("registry_notice", 25, Some("cyan")).unwrap();
        assert_eq!(level_value("registry_notice"), Some(25));
        assert_eq!(level_value("REGISTRY_NOTICE"), Some(25));
        assert_eq!(level_color("registry_notice").as_deref(), Some("cyan"));
    }

    #[test]
    fn test_reregistering_overwrites() {
        register_level("registry_overwrite", 33, None).unwrap();
        register_level("registry_overwrite", 34, None).unwrap();
        assert_eq!(level_value("registry_overwrite"), Some(34));
    }

    #[test]
    fn test_builtin_names_are_protected() {
        assert!(register_level("info", 3, None).is_err());
        assert!(register_level("", 3, None).is_err());
        assert!(register_level("has space", 3, None).is_err());
    }

    #[test]
    fn test_builtin_lookup_and_default_colors() {
        assert_eq!(level_value("warn"), Some(20));
        assert_eq!(level_color("error").as_deref(), Some("red"));
        assert_eq!(level_value("registry_missing"), None);
    }

    #[test]
    fn test_create_may_look_up_other_loggers() {
        let outer = logger_or_try_insert_with("registry_outer", || {
            let inner = Logger::get("registry_inner");
            Ok(Logger::new(format!("registry_outer<{}>", inner.name())))
        })
        .unwrap();
        assert_eq!(outer.name(), "registry_outer<registry_inner>");
        assert!(is_logger_registered("registry_inner"));

        let again = logger_or_try_insert_with("registry_outer", || Ok(Logger::new("ignored"))).unwrap();
        assert_eq!(again.name(), "registry_outer<registry_inner>");
    }

    #[test]
    fn test_level_name_for_custom_value() {
        register_level("registry_value_name", 47, None).unwrap();
        assert_eq!(level_name(47).as_deref(), Some("registry_value_name"));
    }
}
