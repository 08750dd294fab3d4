// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Construction-time configuration of a form.
//!
//! [`FormConfig`] holds the plain-data settings and can be read from JSON. [`FormOptions`] adds
//! what cannot be serialized (the executor, the handlers and the initial values) and builds the
//! [`FormToolkit`].

use crate::{
    ArrayIdentity, FormToolkit, SubmitHandler, Validator,
    error::ConfigError,
};
use futures::task::LocalSpawn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fmt};

/// Serializable form settings.
///
/// ```
/// use formstate::FormConfig;
///
/// let config = FormConfig::from_json(r#"{ "initialIsValidating": false, "arrayIdentity": { "users": "id" } }"#).unwrap();
/// assert!(config.initial_is_valid);
/// assert!(!config.initial_is_validating);
/// assert_eq!(config.array_identity["users"], "id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct FormConfig {
    /// Validity before the first validation pass commits.
    pub initial_is_valid: bool,
    /// If set, a validation pass is dispatched as soon as the form is built.
    pub initial_is_validating: bool,
    /// Sequence path pattern to identity key field.
    pub array_identity: BTreeMap<String, String>,
    /// How many times a validation pass yields to the executor before it runs.
    pub validation_delay_ticks: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            initial_is_valid: true,
            initial_is_validating: true,
            array_identity: BTreeMap::new(),
            validation_delay_ticks: 1,
        }
    }
}

impl FormConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub(crate) fn identity(&self) -> Result<ArrayIdentity, ConfigError> {
        ArrayIdentity::new(
            self.array_identity
                .iter()
                .map(|(pattern, key)| (pattern.as_str(), key.as_str())),
        )
    }
}

/// Everything needed to build a [`FormToolkit`].
///
/// Validation passes run as tasks on `spawner`, typically the spawner of a
/// [`LocalPool`](futures::executor::LocalPool) or of a single-threaded runtime.
pub struct FormOptions {
    pub(crate) spawner: Box<dyn LocalSpawn>,
    pub(crate) initial_values: Value,
    pub(crate) config: FormConfig,
    pub(crate) validator: Option<Box<dyn Validator>>,
    pub(crate) on_submit: Option<Box<dyn SubmitHandler>>,
}

impl fmt::Debug for FormOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormOptions")
            .field("initial_values", &self.initial_values)
            .field("config", &self.config)
            .field("validator", &self.validator.is_some())
            .field("on_submit", &self.on_submit.is_some())
            .finish_non_exhaustive()
    }
}

impl FormOptions {
    pub fn new(spawner: impl LocalSpawn + 'static) -> Self {
        Self {
            spawner: Box::new(spawner),
            initial_values: Value::Null,
            config: FormConfig::default(),
            validator: None,
            on_submit: None,
        }
    }

    /// The baseline document. `null` (the default) reads as an empty mapping.
    pub fn initial_values(mut self, values: Value) -> Self {
        self.initial_values = values;
        self
    }

    /// Replaces all plain settings at once.
    pub fn config(mut self, config: FormConfig) -> Self {
        self.config = config;
        self
    }

    pub fn initial_is_valid(mut self, is_valid: bool) -> Self {
        self.config.initial_is_valid = is_valid;
        self
    }

    pub fn initial_is_validating(mut self, is_validating: bool) -> Self {
        self.config.initial_is_validating = is_validating;
        self
    }

    /// Identifies elements of the sequences at `pattern` by their `key` field.
    pub fn array_identity(mut self, pattern: impl Into<String>, key: impl Into<String>) -> Self {
        self.config
            .array_identity
            .insert(pattern.into(), key.into());
        self
    }

    pub fn validation_delay_ticks(mut self, ticks: usize) -> Self {
        self.config.validation_delay_ticks = ticks;
        self
    }

    pub fn validate(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn on_submit(mut self, handler: impl SubmitHandler + 'static) -> Self {
        self.on_submit = Some(Box::new(handler));
        self
    }

    pub fn build(self) -> Result<FormToolkit, ConfigError> {
        FormToolkit::new(self)
    }
}

/// Normalizes a baseline document: `null` becomes an empty mapping. Scalars are rejected with
/// the name of their kind.
pub(crate) fn values_document(values: Value) -> Result<Value, &'static str> {
    match values {
        Value::Null => Ok(Value::Object(Default::default())),
        Value::Object(_) | Value::Array(_) => Ok(values),
        Value::Bool(_) => Err("a boolean"),
        Value::Number(_) => Err("a number"),
        Value::String(_) => Err("a string"),
    }
}
