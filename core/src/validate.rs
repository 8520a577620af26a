//! Command tree and argument schema validation.
//!
//! Routing never fails on a badly shaped tree; it just picks whatever
//! handler is reachable. Validation catches the shapes that make commands
//! silently do nothing or become unreachable, and is meant to run once at
//! startup.
//!
//! # Examples
//!
//! ```
//! use chain_command_core::*;
//!
//! let config = RouterConfig::default();
//! let git: CommandNode<()> = CommandNode::new("/git")
//!     .with_child(CommandNode::leaf("add", |_: &mut (), _: &[String]| {}))
//!     .with_default(|_: &mut (), _: &[String]| {});
//! assert!(validate_tree(&git, &config).is_empty());
//!
//! // Invalid: root without the command prefix
//! let bad: CommandNode<()> = CommandNode::leaf("git", |_: &mut (), _: &[String]| {});
//! assert!(!validate_tree(&bad, &config).is_empty());
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::args::ArgSchema;
use crate::config::RouterConfig;
use crate::tree::CommandNode;

static COMMAND_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-z_-]+$").expect("static regex must compile"));

/// Tree and schema validation errors.
///
/// Paths are the space-joined command names from the root, e.g.
/// `/git remote add`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Root name does not start with the configured prefix.
    #[error("root command `{name}` must start with `{prefix}`")]
    MissingPrefix { name: String, prefix: char },
    /// Name is empty, too long, or uses characters outside `[0-9a-z_-]`.
    #[error("invalid command name `{0}`")]
    InvalidName(String),
    /// Two roots in one router share a name or alias.
    #[error("duplicate root command `{0}`")]
    DuplicateRoot(String),
    /// Two children of one node share a name or alias.
    #[error("duplicate subcommand `{name}` under `{parent}`")]
    DuplicateSubcommand { parent: String, name: String },
    /// A node has both a callback and children.
    #[error("`{0}` has both a callback and subcommands")]
    CallbackWithChildren(String),
    /// A node has both a callback and a default.
    #[error("`{0}` has both a callback and a default")]
    CallbackWithDefault(String),
    /// A leaf node without a callback can never do anything.
    #[error("leaf command `{0}` has no callback")]
    LeafWithoutCallback(String),
    /// A schema field name is empty.
    #[error("schema for `{0}` has a field with an empty name")]
    EmptyFieldName(String),
    /// Two schema fields share a name.
    #[error("duplicate field `{field}` in schema for `{command}`")]
    DuplicateField { command: String, field: String },
    /// A required field is declared after an optional one.
    #[error("required field `{field}` follows optional fields in schema for `{command}`")]
    RequiredAfterOptional { command: String, field: String },
}

/// Validates a command tree rooted at `root`.
///
/// Checks the root prefix, name format and length, duplicate children,
/// and the callback-versus-subcommands shape of every node.
pub fn validate_tree<C, R>(root: &CommandNode<C, R>, config: &RouterConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for name in std::iter::once(root.name()).chain(root.aliases().iter().map(String::as_str)) {
        match name.strip_prefix(config.prefix) {
            Some(bare) => check_name(bare, name, config, &mut errors),
            None => errors.push(ValidationError::MissingPrefix {
                name: name.to_string(),
                prefix: config.prefix,
            }),
        }
    }

    let mut path = vec![root.name().to_string()];
    validate_node(root, &mut path, config, &mut errors);
    errors
}

fn validate_node<C, R>(
    node: &CommandNode<C, R>,
    path: &mut Vec<String>,
    config: &RouterConfig,
    errors: &mut Vec<ValidationError>,
) {
    let here = path.join(" ");
    let has_children = !node.children().is_empty();

    if node.has_callback() && has_children {
        errors.push(ValidationError::CallbackWithChildren(here.clone()));
    }
    if node.has_callback() && node.has_default() {
        errors.push(ValidationError::CallbackWithDefault(here.clone()));
    }
    if !has_children && !node.has_callback() {
        errors.push(ValidationError::LeafWithoutCallback(here.clone()));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for child in node.children() {
        for name in std::iter::once(child.name()).chain(child.aliases().iter().map(String::as_str)) {
            check_name(name, name, config, errors);
            if !seen.insert(name) {
                errors.push(ValidationError::DuplicateSubcommand {
                    parent: here.clone(),
                    name: name.to_string(),
                });
            }
        }

        path.push(child.name().to_string());
        validate_node(child, path, config, errors);
        path.pop();
    }
}

fn check_name(bare: &str, full: &str, config: &RouterConfig, errors: &mut Vec<ValidationError>) {
    if bare.len() > config.max_name_len || !COMMAND_NAME_RE.is_match(bare) {
        errors.push(ValidationError::InvalidName(full.to_string()));
    }
}

/// Validates an argument schema.
///
/// Checks for empty and duplicate field names and for required fields
/// declared after optional ones.
///
/// # Examples
///
/// ```
/// use chain_command_core::*;
///
/// let schema = ArgSchema::new("/x")
///     .with_field(ArgField::optional("a", ValueType::String, Value::None))
///     .with_field(ArgField::required("b", ValueType::String));
/// let errors = validate_schema(&schema);
/// assert!(matches!(errors[0], ValidationError::RequiredAfterOptional { .. }));
/// ```
pub fn validate_schema(schema: &ArgSchema) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let command = schema.command().unwrap_or("<schema>").to_string();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut optional_seen = false;

    for field in schema.fields() {
        let name = field.name();
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyFieldName(command.clone()));
            continue;
        }
        if !seen.insert(name) {
            errors.push(ValidationError::DuplicateField {
                command: command.clone(),
                field: name.to_string(),
            });
        }
        if field.is_required() && optional_seen {
            errors.push(ValidationError::RequiredAfterOptional {
                command: command.clone(),
                field: name.to_string(),
            });
        }
        optional_seen |= !field.is_required();
    }

    errors
}
