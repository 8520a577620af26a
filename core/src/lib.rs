//! Command routing and typed argument conversion for message-driven bots.
//!
//! Handling one inbound command line happens in stages:
//!
//! - [`tokenize`]: split raw text into tokens, keeping double-quoted spans
//!   together.
//! - [`CommandNode`]: a tree of named subcommands. Dispatch descends while
//!   tokens name children and runs the deepest node's callback, or the
//!   nearest default, with the leftover tokens.
//! - [`Router`]: several roots behind one entry point, with prefix and
//!   `@bot_username` handling from [`RouterConfig`].
//! - [`ArgSchema`]: converts a handler's leftover tokens into typed
//!   [`Value`]s, mixing positional and `key=value` arguments, with static
//!   and lazily evaluated defaults.
//!
//! Trees, routers and schemas are immutable once built and `Send + Sync`;
//! dispatch and parsing keep no state between calls.
//!
//! Validation ([`validate_tree`], [`validate_schema`]) catches badly shaped
//! trees and schemas at startup.
//!
//! # Example
//!
//! ```
//! use chain_command_core::*;
//!
//! let schema = ArgSchema::new("/greet")
//!     .with_field(ArgField::required("name", ValueType::String))
//!     .with_field(ArgField::optional("times", ValueType::Integer, 1i64));
//!
//! let greet = CommandNode::leaf("/greet", move |out: &mut Vec<String>, args: &[String]| {
//!     if !schema.check_arg_len(args) {
//!         out.push(schema.usage());
//!         return;
//!     }
//!     let parsed = schema.parse(args).unwrap().multiple().unwrap();
//!     let times = parsed.get("times").and_then(Value::as_int).unwrap_or(1);
//!     for _ in 0..times {
//!         out.push(format!("hello, {}", parsed.get("name").unwrap()));
//!     }
//! });
//!
//! let router = Router::new(RouterConfig::default()).with_root(greet);
//! let mut out = Vec::new();
//! router.dispatch_text(&mut out, r#"/greet "Ada Lovelace" times=2"#).unwrap();
//! router.dispatch_text(&mut out, "/greet").unwrap();
//! assert_eq!(
//!     out,
//!     vec!["hello, Ada Lovelace", "hello, Ada Lovelace", "Usage: /greet <name> [times]"]
//! );
//! ```

mod args;
mod config;
mod error;
mod host;
mod router;
mod tokenize;
mod tree;
mod types;
mod validate;

pub use args::{
    ArgError, ArgField, ArgSchema, CastFn, DefaultFn, FieldDefault, ParseResult, ParsedArgs,
    csv_of, datetime,
};
pub use config::RouterConfig;
pub use error::{ConfigError, Error, Result};
pub use host::{ChatData, HostContext, InboundMessage};
pub use router::Router;
pub use tokenize::{TokenizeError, first_word, tokenize};
pub use tree::{CommandNode, Handler, HandlerKind, Outcome, Resolution};
pub use types::{Value, ValueType, parse_datetime};
pub use validate::{ValidationError, validate_schema, validate_tree};
