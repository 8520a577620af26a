//! Command trees and depth-first dispatch.
//!
//! A [`CommandNode`] is one level of a multi-word command such as
//! `/git remote add`. Dispatch walks the tree greedily: the first token must
//! name the root, and each following token that names a child descends one
//! level. The walk stops at the first token that names no child, and the
//! deepest node reached handles the remaining tokens, through its callback
//! if it has one, otherwise through its default.
//!
//! # Example
//!
//! ```
//! use chain_command_core::{CommandNode, Outcome};
//!
//! let git: CommandNode<Vec<String>> = CommandNode::new("/git")
//!     .with_child(CommandNode::new("add").with_callback(|log: &mut Vec<String>, args: &[String]| {
//!         log.push(format!("add {}", args.join(" ")));
//!     }))
//!     .with_default(|log: &mut Vec<String>, args: &[String]| {
//!         log.push(format!("help {}", args.join(" ")));
//!     });
//!
//! let mut log = Vec::new();
//! assert!(git.dispatch(&mut log, &["/git", "add", "README.md"]).is_handled());
//! assert!(git.dispatch(&mut log, &["/git", "status"]).is_handled());
//! assert_eq!(git.dispatch(&mut log, &["/hg", "status"]), Outcome::NotMatched);
//! assert_eq!(log, vec!["add README.md", "help status"]);
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::tokenize::{TokenizeError, tokenize};

/// Shared handler invoked with the caller's context and the residual
/// arguments.
pub type Handler<C, R = ()> = Arc<dyn Fn(&mut C, &[String]) -> R + Send + Sync>;

/// Which of a node's handlers a dispatch resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// The node's own callback.
    Callback,
    /// The node's fallback.
    Default,
}

/// Result of dispatching one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R> {
    /// A handler ran and returned this value.
    Handled(R),
    /// The root matched but the deepest node has neither callback nor default.
    Unhandled,
    /// The first token is not this root's command; the line belongs elsewhere.
    NotMatched,
}

impl<R> Outcome<R> {
    /// Returns `true` if a handler ran.
    pub fn is_handled(&self) -> bool {
        matches!(self, Outcome::Handled(_))
    }

    /// Returns `true` if the root command matched, whether or not anything ran.
    pub fn is_matched(&self) -> bool {
        !matches!(self, Outcome::NotMatched)
    }

    /// Returns the handler's value, if one ran.
    pub fn into_handled(self) -> Option<R> {
        match self {
            Outcome::Handled(value) => Some(value),
            _ => None,
        }
    }
}

/// One named level of a command tree.
///
/// Root names carry the command prefix (`/git`); child names are plain words
/// (`remote`). A node should have a callback, or children and/or a default,
/// but not both; [`validate_tree`](crate::validate_tree) reports violations.
pub struct CommandNode<C, R = ()> {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    callback: Option<Handler<C, R>>,
    default: Option<Handler<C, R>>,
    children: Vec<CommandNode<C, R>>,
}

impl<C, R> CommandNode<C, R> {
    /// Creates a node with no handlers and no children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            callback: None,
            default: None,
            children: Vec::new(),
        }
    }

    /// Creates a leaf node that runs `callback`.
    pub fn leaf<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&mut C, &[String]) -> R + Send + Sync + 'static,
    {
        Self::new(name).with_callback(callback)
    }

    /// Sets the callback run when this node is the deepest match.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut C, &[String]) -> R + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Sets the fallback run when no child matches and there is no callback.
    pub fn with_default<F>(mut self, default: F) -> Self
    where
        F: Fn(&mut C, &[String]) -> R + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(default));
        self
    }

    /// Adds a child node.
    pub fn with_child(mut self, child: CommandNode<C, R>) -> Self {
        self.children.push(child);
        self
    }

    /// Adds an alternative name matched exactly like the primary name.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Adds a one-line description shown by [`help`](Self::help).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn children(&self) -> &[CommandNode<C, R>] {
        &self.children
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Returns `true` if `token` equals the node's name or one of its aliases.
    pub fn matches(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|a| a == token)
    }

    /// Finds the child whose name or alias equals `token`.
    pub fn find_child(&self, token: &str) -> Option<&CommandNode<C, R>> {
        self.children.iter().find(|child| child.matches(token))
    }

    /// Resolves `tokens` to the node and handler that would run, without
    /// invoking anything.
    ///
    /// Returns `None` when the first token does not name this root.
    ///
    /// # Examples
    ///
    /// ```
    /// use chain_command_core::{CommandNode, HandlerKind};
    ///
    /// let git: CommandNode<()> = CommandNode::new("/git")
    ///     .with_child(CommandNode::new("remote").with_default(|_: &mut (), _: &[String]| {}))
    ///     .with_default(|_: &mut (), _: &[String]| {});
    ///
    /// let resolution = git.resolve(&["/git", "remote", "bogus"]).unwrap();
    /// assert_eq!(resolution.path(), ["/git", "remote"]);
    /// assert_eq!(resolution.kind(), Some(HandlerKind::Default));
    /// assert_eq!(resolution.args(), ["bogus"]);
    /// ```
    pub fn resolve<S: AsRef<str>>(&self, tokens: &[S]) -> Option<Resolution<'_, C, R>> {
        let (first, mut rest) = tokens.split_first()?;
        if !self.matches(first.as_ref()) {
            return None;
        }

        let mut node = self;
        let mut path = vec![self.name.as_str()];
        while let Some((next, tail)) = rest.split_first() {
            let Some(child) = node.find_child(next.as_ref()) else {
                break;
            };
            node = child;
            path.push(child.name.as_str());
            rest = tail;
        }

        let kind = if node.callback.is_some() {
            Some(HandlerKind::Callback)
        } else if node.default.is_some() {
            Some(HandlerKind::Default)
        } else {
            None
        };

        Some(Resolution {
            path,
            node,
            kind,
            args: rest.iter().map(|s| s.as_ref().to_string()).collect(),
        })
    }

    /// Resolves `tokens` and runs the selected handler, if any.
    pub fn dispatch<S: AsRef<str>>(&self, ctx: &mut C, tokens: &[S]) -> Outcome<R> {
        let Some(resolution) = self.resolve(tokens) else {
            return Outcome::NotMatched;
        };
        debug!(
            path = %resolution.path().join(" "),
            handler = ?resolution.kind(),
            args = resolution.args().len(),
            "Resolved command"
        );
        match resolution.invoke(ctx) {
            Some(value) => Outcome::Handled(value),
            None => Outcome::Unhandled,
        }
    }

    /// Tokenizes `raw` and dispatches the tokens.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizeError`] for malformed quoting; routing itself never
    /// fails.
    pub fn dispatch_text(&self, ctx: &mut C, raw: &str) -> Result<Outcome<R>, TokenizeError> {
        let tokens = tokenize(raw)?;
        Ok(self.dispatch(ctx, &tokens))
    }

    /// Renders every command path in the tree, one per line, depth first.
    ///
    /// # Examples
    ///
    /// ```
    /// use chain_command_core::CommandNode;
    ///
    /// let git: CommandNode<()> = CommandNode::new("/git")
    ///     .with_description("Toy git")
    ///     .with_child(CommandNode::leaf("add", |_: &mut (), _: &[String]| {}));
    /// assert_eq!(git.help(), "/git - Toy git\n/git add");
    /// ```
    pub fn help(&self) -> String {
        let mut lines = Vec::new();
        self.collect_help(&mut Vec::new(), &mut lines);
        lines.join("\n")
    }

    fn collect_help<'a>(&'a self, prefix: &mut Vec<&'a str>, lines: &mut Vec<String>) {
        prefix.push(&self.name);
        let path = prefix.join(" ");
        lines.push(match &self.description {
            Some(desc) => format!("{path} - {desc}"),
            None => path,
        });
        for child in &self.children {
            child.collect_help(prefix, lines);
        }
        prefix.pop();
    }
}

impl<C, R> Clone for CommandNode<C, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            aliases: self.aliases.clone(),
            description: self.description.clone(),
            callback: self.callback.clone(),
            default: self.default.clone(),
            children: self.children.clone(),
        }
    }
}

impl<C, R> fmt::Debug for CommandNode<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("callback", &self.callback.is_some())
            .field("default", &self.default.is_some())
            .field("children", &self.children)
            .finish()
    }
}

/// Where a command line lands in a tree.
pub struct Resolution<'a, C, R = ()> {
    path: Vec<&'a str>,
    node: &'a CommandNode<C, R>,
    kind: Option<HandlerKind>,
    args: Vec<String>,
}

impl<'a, C, R> Resolution<'a, C, R> {
    /// Names of the matched nodes, root first.
    pub fn path(&self) -> &[&'a str] {
        &self.path
    }

    /// The deepest matched node.
    pub fn node(&self) -> &'a CommandNode<C, R> {
        self.node
    }

    /// The handler that will run, or `None` for a no-op.
    pub fn kind(&self) -> Option<HandlerKind> {
        self.kind
    }

    /// Tokens left after the matched path.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Runs the resolved handler with the residual arguments.
    pub fn invoke(&self, ctx: &mut C) -> Option<R> {
        let handler = match self.kind? {
            HandlerKind::Callback => self.node.callback.as_ref()?,
            HandlerKind::Default => self.node.default.as_ref()?,
        };
        Some(handler(ctx, &self.args))
    }
}

impl<C, R> fmt::Debug for Resolution<'_, C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("args", &self.args)
            .finish()
    }
}
