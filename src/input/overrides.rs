//! Structured overrides for model parameters.
//!
//! An override replaces the value of one parameter in `model.toml`, addressed by its dotted name
//! (e.g. `battery.investment_cost`). Overrides are applied to the parsed file before it is
//! deserialised and validated, so an overridden model is checked exactly like one written by hand.
use crate::error::ConfigError;
use indexmap::IndexMap;

/// Parameters which may be overridden even if they are absent from the model file.
///
/// A `*` matches any single name.
const OPTIONAL_PARAMETERS: &[&str] = &[
    "project.periods_per_hour",
    "project.scenario_weights",
    "project.project_years",
    "inputs.*",
    "capacity_limits.*.min",
    "capacity_limits.*.max",
    "solver.options.*",
];

/// Whether a dotted parameter name matches a pattern from [`OPTIONAL_PARAMETERS`]
fn matches_pattern(name: &str, pattern: &str) -> bool {
    let (mut names, mut patterns) = (name.split('.'), pattern.split('.'));
    loop {
        match (names.next(), patterns.next()) {
            (None, None) => return true,
            (Some(name), Some(pattern)) if pattern == "*" || pattern == name => continue,
            _ => return false,
        }
    }
}

/// Parse the value of an override as a TOML value, falling back to a plain string
fn parse_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {raw}"))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

/// A map of parameter names to replacement values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterOverrides(IndexMap<String, toml::Value>);

impl ParameterOverrides {
    /// Create overrides from `name=value` strings, as given on the command line
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, ConfigError> {
        let mut overrides = Self::default();
        for arg in args {
            overrides.insert_raw(arg.as_ref())?;
        }

        Ok(overrides)
    }

    /// Add an override from a `name=value` string
    pub fn insert_raw(&mut self, raw: &str) -> Result<(), ConfigError> {
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidOverride(raw.to_string()))?;
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() || value.is_empty() || name.split('.').any(str::is_empty) {
            return Err(ConfigError::InvalidOverride(raw.to_string()));
        }

        self.insert(name, parse_value(value));
        Ok(())
    }

    /// Add an override, replacing any previous override of the same parameter
    pub fn insert(&mut self, name: &str, value: toml::Value) {
        self.0.insert(name.to_string(), value);
    }

    /// Whether there are no overrides
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the overrides in the order they were added
    pub fn iter(&self) -> impl Iterator<Item = (&str, &toml::Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Apply the overrides to a parsed model file.
    ///
    /// Fails with [`ConfigError::UnknownParameter`] if a name refers to neither an existing
    /// parameter nor one of the optional parameters.
    pub fn apply(&self, table: &mut toml::Table) -> Result<(), ConfigError> {
        for (name, value) in &self.0 {
            let is_optional = OPTIONAL_PARAMETERS
                .iter()
                .any(|pattern| matches_pattern(name, pattern));
            let unknown = || ConfigError::UnknownParameter(name.clone());

            let mut segments: Vec<&str> = name.split('.').collect();
            let last = segments.pop().ok_or_else(unknown)?;
            let mut current = &mut *table;
            for segment in segments {
                if !current.contains_key(segment) {
                    if !is_optional {
                        return Err(unknown());
                    }
                    current.insert(segment.to_string(), toml::Value::Table(toml::Table::new()));
                }

                current = current
                    .get_mut(segment)
                    .and_then(toml::Value::as_table_mut)
                    .ok_or_else(unknown)?;
            }

            if !is_optional && !current.contains_key(last) {
                return Err(unknown());
            }
            current.insert(last.to_string(), value.clone());
        }

        Ok(())
    }
}
