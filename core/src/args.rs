//! Typed argument conversion.
//!
//! An [`ArgSchema`] declares an ordered list of [`ArgField`]s. Parsing
//! assigns command tokens to fields in three passes:
//!
//! 1. Keyed tokens (`name=value`, where `name` is a declared field) fill the
//!    named field.
//! 2. Positional tokens fill fields in declared order, the n-th token
//!    landing on the n-th field. A keyed field inside that run was given
//!    twice and fails with [`ArgError::DuplicateAssignment`].
//! 3. Fields still empty take their default. Static defaults are cloned;
//!    lazy defaults are generated at this point, not when the schema was
//!    built.
//!
//! A token is keyed only when the text before its first `=` equals a field
//! name, so a positional value such as `a=b` stays positional unless a field
//! is called `a`. When it is, the keyed reading wins; there is no escape.
//!
//! # Example
//!
//! ```
//! use chain_command_core::{ArgField, ArgSchema, ValueType};
//!
//! let schema = ArgSchema::new("/remind")
//!     .with_field(ArgField::required("what", ValueType::String))
//!     .with_field(ArgField::optional("times", ValueType::Integer, 1i64));
//!
//! assert_eq!(schema.usage(), "Usage: /remind <what> [times]");
//! assert!(schema.check_arg_len(&["tea"]));
//!
//! let parsed = schema.parse(&["times=3", "tea"]).unwrap().into_values();
//! assert_eq!(parsed[0].as_str(), Some("tea"));
//! assert_eq!(parsed[1].as_int(), Some(3));
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;
use tracing::debug;

use crate::types::{Value, ValueType, parse_datetime};

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex must compile"));

/// Custom conversion from token text to a [`Value`].
pub type CastFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// Zero-argument generator for a lazy default.
pub type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Argument conversion failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgError {
    /// A `key=value` token names no declared field (strict keys only).
    #[error("unknown argument name `{key}`")]
    UnknownKey { key: String },
    /// A field was given a value twice.
    #[error("argument `{field}` assigned more than once")]
    DuplicateAssignment { field: String },
    /// A required field received no value.
    #[error("missing required argument `{field}`")]
    MissingRequired { field: String },
    /// The field's cast rejected the token text.
    #[error("invalid value `{value}` for `{field}`: {reason}")]
    CastFailure {
        field: String,
        value: String,
        reason: String,
    },
    /// Token count outside `[required, total]`.
    #[error("expected {min} to {max} arguments, got {actual}")]
    ArgCountMismatch { min: usize, max: usize, actual: usize },
}

/// How an unassigned field gets its value.
#[derive(Clone)]
pub enum FieldDefault {
    /// No default; the field must be given.
    Required,
    /// Fixed value chosen when the schema is declared.
    Static(Value),
    /// Value produced at parse time.
    Lazy(DefaultFn),
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Required => f.write_str("Required"),
            FieldDefault::Static(value) => f.debug_tuple("Static").field(value).finish(),
            FieldDefault::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// One declared argument.
#[derive(Clone)]
pub struct ArgField {
    name: String,
    value_type: ValueType,
    cast: Option<CastFn>,
    default: FieldDefault,
}

impl ArgField {
    /// Declares a field that must be given.
    pub fn required(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            cast: None,
            default: FieldDefault::Required,
        }
    }

    /// Declares an optional field with a fixed default.
    ///
    /// Pass [`Value::None`] for "no value".
    pub fn optional(name: impl Into<String>, value_type: ValueType, default: impl Into<Value>) -> Self {
        Self {
            default: FieldDefault::Static(default.into()),
            ..Self::required(name, value_type)
        }
    }

    /// Declares an optional field whose default is produced by `generator`
    /// each time a parse leaves it unassigned.
    ///
    /// # Examples
    ///
    /// ```
    /// use chain_command_core::{ArgField, ArgSchema, ValueType};
    /// use chrono::Local;
    ///
    /// let schema = ArgSchema::new("/when")
    ///     .with_field(ArgField::lazy("at", ValueType::DateTime, Local::now));
    /// let before = Local::now();
    /// let at = schema.parse::<&str>(&[]).unwrap().single().unwrap();
    /// assert!(*at.as_datetime().unwrap() >= before);
    /// ```
    pub fn lazy<F, V>(name: impl Into<String>, value_type: ValueType, generator: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        Self {
            default: FieldDefault::Lazy(Arc::new(move || generator().into())),
            ..Self::required(name, value_type)
        }
    }

    /// Replaces the natural cast for the field's [`ValueType`].
    pub fn with_cast<F, V, E>(mut self, cast: F) -> Self
    where
        F: Fn(&str) -> Result<V, E> + Send + Sync + 'static,
        V: Into<Value>,
        E: fmt::Display,
    {
        self.cast = Some(Arc::new(move |raw: &str| {
            cast(raw).map(Into::into).map_err(|e| e.to_string())
        }));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn default(&self) -> &FieldDefault {
        &self.default
    }

    pub fn is_required(&self) -> bool {
        matches!(self.default, FieldDefault::Required)
    }

    /// Converts token text with the custom cast, or the natural one.
    ///
    /// # Errors
    ///
    /// Returns [`ArgError::CastFailure`] naming this field.
    pub fn cast(&self, raw: &str) -> Result<Value, ArgError> {
        let result = match &self.cast {
            Some(cast) => cast(raw),
            None => self.value_type.cast(raw),
        };
        result.map_err(|reason| ArgError::CastFailure {
            field: self.name.clone(),
            value: raw.to_string(),
            reason,
        })
    }

    fn default_value(&self) -> Option<Value> {
        match &self.default {
            FieldDefault::Required => None,
            FieldDefault::Static(value) => Some(value.clone()),
            FieldDefault::Lazy(generator) => Some(generator()),
        }
    }
}

impl fmt::Debug for ArgField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgField")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("custom_cast", &self.cast.is_some())
            .field("default", &self.default)
            .finish()
    }
}

/// Ordered argument declaration for one command.
///
/// Required fields are expected before optional ones; parsing does not
/// enforce this, but [`validate_schema`](crate::validate_schema) reports it.
#[derive(Debug, Clone, Default)]
pub struct ArgSchema {
    command: Option<String>,
    template: Option<String>,
    fields: Vec<ArgField>,
    strict_keys: bool,
}

impl ArgSchema {
    /// Creates an empty schema labelled with the command it belongs to.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            ..Default::default()
        }
    }

    /// Adds a field at the next position.
    pub fn with_field(mut self, field: ArgField) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets a free-text usage template, shown verbatim after `Usage: `.
    pub fn with_usage(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Rejects `key=value` tokens whose identifier-like key names no field,
    /// instead of treating them as positional.
    pub fn with_strict_keys(mut self) -> Self {
        self.strict_keys = true;
        self
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn fields(&self) -> &[ArgField] {
        &self.fields
    }

    /// Finds a field's declared position by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Number of fields without a default.
    pub fn required_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_required()).count()
    }

    /// Renders the usage line shown when the argument count is wrong.
    ///
    /// Uses the template when one is set; otherwise lists the fields,
    /// `<name>` for required and `[name]` for optional ones.
    pub fn usage(&self) -> String {
        if let Some(template) = &self.template {
            return format!("Usage: {template}");
        }
        let parts: Vec<String> = self
            .command
            .iter()
            .cloned()
            .chain(self.fields.iter().map(|f| {
                if f.is_required() {
                    format!("<{}>", f.name)
                } else {
                    format!("[{}]", f.name)
                }
            }))
            .collect();
        format!("Usage: {}", parts.join(" "))
    }

    /// Returns `true` if `required ≤ tokens.len() ≤ fields`.
    ///
    /// Keyed and positional tokens count alike.
    pub fn check_arg_len<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        (self.required_count()..=self.fields.len()).contains(&tokens.len())
    }

    /// Converts `tokens` into one value per field.
    ///
    /// # Errors
    ///
    /// See [`ArgError`]. The first problem found is returned; no partial
    /// result is produced.
    ///
    /// # Examples
    ///
    /// ```
    /// use chain_command_core::{ArgError, ArgField, ArgSchema, Value, ValueType};
    ///
    /// let schema = ArgSchema::new("/kick").with_field(ArgField::required("user", ValueType::String));
    /// assert_eq!(schema.parse(&["bob"]).unwrap().single(), Some(Value::from("bob")));
    /// assert_eq!(
    ///     schema.parse::<&str>(&[]),
    ///     Err(ArgError::MissingRequired { field: "user".into() })
    /// );
    /// ```
    pub fn parse<S: AsRef<str>>(&self, tokens: &[S]) -> Result<ParseResult, ArgError> {
        let mut slots: Vec<Option<Value>> = vec![None; self.fields.len()];
        let mut positional: Vec<&str> = Vec::new();

        for token in tokens {
            let token = token.as_ref();
            match self.split_keyed(token)? {
                Some((idx, raw)) => {
                    let field = &self.fields[idx];
                    if slots[idx].is_some() {
                        return Err(ArgError::DuplicateAssignment {
                            field: field.name.clone(),
                        });
                    }
                    slots[idx] = Some(field.cast(raw)?);
                }
                None => positional.push(token),
            }
        }

        // Positional tokens fill fields in declared order, so the n-th one
        // lands on field n. A keyed field inside that run is a collision.
        let keyed: Vec<usize> = (0..slots.len()).filter(|&i| slots[i].is_some()).collect();
        if let Some(&idx) = keyed.iter().find(|&&idx| idx < positional.len()) {
            return Err(ArgError::DuplicateAssignment {
                field: self.fields[idx].name.clone(),
            });
        }
        if positional.len() > slots.len() {
            return Err(ArgError::ArgCountMismatch {
                min: self.required_count(),
                max: self.fields.len(),
                actual: tokens.len(),
            });
        }

        for (slot, (raw, field)) in slots.iter_mut().zip(positional.iter().zip(&self.fields)) {
            *slot = Some(field.cast(raw)?);
        }

        let mut entries = Vec::with_capacity(self.fields.len());
        for (slot, field) in slots.into_iter().zip(&self.fields) {
            let value = match slot {
                Some(value) => value,
                None => field.default_value().ok_or_else(|| ArgError::MissingRequired {
                    field: field.name.clone(),
                })?,
            };
            entries.push((field.name.clone(), value));
        }

        debug!(
            command = ?self.command,
            keyed = keyed.len(),
            positional = positional.len(),
            "Parsed arguments"
        );

        let mut args = ParsedArgs { entries };
        if args.entries.len() == 1 {
            if let Some((_, value)) = args.entries.pop() {
                return Ok(ParseResult::Single(value));
            }
        }
        Ok(ParseResult::Multiple(args))
    }

    fn split_keyed<'t>(&self, token: &'t str) -> Result<Option<(usize, &'t str)>, ArgError> {
        let Some((key, raw)) = token.split_once('=') else {
            return Ok(None);
        };
        if let Some(idx) = self.position(key) {
            return Ok(Some((idx, raw)));
        }
        if self.strict_keys && IDENTIFIER_RE.is_match(key) {
            return Err(ArgError::UnknownKey {
                key: key.to_string(),
            });
        }
        Ok(None)
    }
}

/// Parsed values keyed by field name, in declared order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedArgs {
    entries: Vec<(String, Value)>,
}

impl ParsedArgs {
    /// Looks a value up by field name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn into_values(self) -> Vec<Value> {
        self.entries.into_iter().map(|(_, value)| value).collect()
    }
}

impl Serialize for ParsedArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Outcome of [`ArgSchema::parse`].
///
/// A schema with exactly one field yields the bare value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    Single(Value),
    Multiple(ParsedArgs),
}

impl ParseResult {
    /// The bare value of a single-field schema.
    pub fn single(self) -> Option<Value> {
        match self {
            ParseResult::Single(value) => Some(value),
            ParseResult::Multiple(_) => None,
        }
    }

    /// The named values of a multi-field schema.
    pub fn multiple(self) -> Option<ParsedArgs> {
        match self {
            ParseResult::Multiple(args) => Some(args),
            ParseResult::Single(_) => None,
        }
    }

    /// All values in declared order.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            ParseResult::Single(value) => vec![value],
            ParseResult::Multiple(args) => args.into_values(),
        }
    }
}

/// Cast for comma-separated lists, each item converted as `inner`.
///
/// # Examples
///
/// ```
/// use chain_command_core::{ArgField, ValueType, csv_of};
///
/// let ids = ArgField::required("ids", ValueType::Any).with_cast(csv_of(ValueType::Integer));
/// assert_eq!(ids.cast("1,2,3").unwrap().to_int_vec(), Some(vec![1, 2, 3]));
/// ```
pub fn csv_of(inner: ValueType) -> impl Fn(&str) -> Result<Value, String> + Send + Sync + 'static {
    let list = ValueType::List(Box::new(inner));
    move |raw: &str| list.cast(raw)
}

/// Cast for local timestamps; see [`parse_datetime`](crate::parse_datetime).
pub fn datetime(raw: &str) -> Result<Value, String> {
    parse_datetime(raw).map(Value::DateTime)
}
