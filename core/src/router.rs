//! Several command roots behind one entry point.
//!
//! A bot usually registers many top-level commands. [`Router`] keeps their
//! trees side by side and hands each message to the root named by its first
//! token. A message no root claims is [`Outcome::NotMatched`], never an
//! error, so routers compose with other handlers the host may run.

use std::collections::HashSet;

use tracing::trace;

use crate::config::RouterConfig;
use crate::error::{Error, Result};
use crate::host::InboundMessage;
use crate::tokenize::{TokenizeError, first_word, tokenize};
use crate::tree::{CommandNode, Outcome, Resolution};
use crate::validate::{ValidationError, validate_tree};

/// Registry of command trees sharing one [`RouterConfig`].
///
/// # Examples
///
/// ```
/// use chain_command_core::{CommandNode, Outcome, Router, RouterConfig};
///
/// let router: Router<Vec<String>> = Router::new(RouterConfig::default())
///     .with_root(CommandNode::leaf("/start", |out: &mut Vec<String>, _: &[String]| {
///         out.push("hello".into());
///     }))
///     .with_root(CommandNode::leaf("/stop", |out: &mut Vec<String>, _: &[String]| {
///         out.push("bye".into());
///     }));
///
/// let mut out = Vec::new();
/// assert!(router.dispatch_text(&mut out, "/stop now").unwrap().is_handled());
/// assert_eq!(router.dispatch_text(&mut out, "hi there").unwrap(), Outcome::NotMatched);
/// assert_eq!(out, vec!["bye"]);
/// ```
pub struct Router<C, R = ()> {
    config: RouterConfig,
    roots: Vec<CommandNode<C, R>>,
}

impl<C, R> Router<C, R> {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            roots: Vec::new(),
        }
    }

    /// Registers a root tree.
    pub fn with_root(mut self, root: CommandNode<C, R>) -> Self {
        self.add_root(root);
        self
    }

    /// Registers a root tree.
    pub fn add_root(&mut self, root: CommandNode<C, R>) {
        self.roots.push(root);
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn roots(&self) -> &[CommandNode<C, R>] {
        &self.roots
    }

    /// Finds the root that owns a command token, after bot-username
    /// normalization.
    pub fn find_root(&self, token: &str) -> Option<&CommandNode<C, R>> {
        let head = self.normalize_head(token)?;
        self.roots.iter().find(|root| root.matches(head))
    }

    /// Strips a matching `@bot_username` suffix; returns `None` when the
    /// command addresses a different bot.
    fn normalize_head<'t>(&self, token: &'t str) -> Option<&'t str> {
        let Some(me) = self.config.bot_username.as_deref() else {
            return Some(token);
        };
        match token.split_once('@') {
            Some((command, bot)) if bot.eq_ignore_ascii_case(me) => Some(command),
            Some(_) => None,
            None => Some(token),
        }
    }

    fn normalized<'t, S: AsRef<str>>(&self, tokens: &'t [S]) -> Option<Vec<&'t str>> {
        let (first, rest) = tokens.split_first()?;
        let head = self.normalize_head(first.as_ref())?;
        Some(
            std::iter::once(head)
                .chain(rest.iter().map(AsRef::as_ref))
                .collect(),
        )
    }

    /// Resolves tokens against every root without invoking anything.
    pub fn resolve<S: AsRef<str>>(&self, tokens: &[S]) -> Option<Resolution<'_, C, R>> {
        let tokens = self.normalized(tokens)?;
        self.roots.iter().find_map(|root| root.resolve(&tokens))
    }

    /// Hands pre-split tokens to the root named by the first token.
    pub fn dispatch_tokens<S: AsRef<str>>(&self, ctx: &mut C, tokens: &[S]) -> Outcome<R> {
        let Some(tokens) = self.normalized(tokens) else {
            return Outcome::NotMatched;
        };
        match self.roots.iter().find(|root| root.matches(tokens[0])) {
            Some(root) => root.dispatch(ctx, &tokens),
            None => {
                trace!(command = tokens[0], "No root claims command");
                Outcome::NotMatched
            }
        }
    }

    /// Tokenizes and dispatches raw text.
    ///
    /// Routing works on tokens, so a quoted command word (`"/start" now`)
    /// routes exactly as it would through [`CommandNode::dispatch_text`].
    /// Malformed quoting is only an error when the line's first word names
    /// one of this router's roots; in ordinary chat or in another handler's
    /// commands it is [`Outcome::NotMatched`].
    ///
    /// # Errors
    ///
    /// Returns [`TokenizeError`] for a command line addressed to this router
    /// with an unterminated quote.
    pub fn dispatch_text(&self, ctx: &mut C, raw: &str) -> std::result::Result<Outcome<R>, TokenizeError> {
        if !self.config.is_command(raw.trim_start().trim_start_matches('"')) {
            return Ok(Outcome::NotMatched);
        }
        match tokenize(raw) {
            Ok(tokens) => Ok(self.dispatch_tokens(ctx, &tokens)),
            Err(err) => {
                let addressed = first_word(raw)
                    .map(|head| head.trim_matches('"'))
                    .and_then(|head| self.find_root(head))
                    .is_some();
                if addressed {
                    Err(err)
                } else {
                    trace!("Ignoring malformed line not addressed to any root");
                    Ok(Outcome::NotMatched)
                }
            }
        }
    }

    /// Dispatches an inbound message by its text; messages without text
    /// are not matched.
    ///
    /// # Errors
    ///
    /// See [`dispatch_text`](Self::dispatch_text).
    pub fn handle_message(
        &self,
        ctx: &mut C,
        message: &InboundMessage,
    ) -> std::result::Result<Outcome<R>, TokenizeError> {
        match message.text.as_deref() {
            Some(text) => self.dispatch_text(ctx, text),
            None => Ok(Outcome::NotMatched),
        }
    }

    /// Validates every root and checks that root names are unique.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] with every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for root in &self.roots {
            for name in std::iter::once(root.name()).chain(root.aliases().iter().map(String::as_str)) {
                if !seen.insert(name) {
                    errors.push(ValidationError::DuplicateRoot(name.to_string()));
                }
            }
            errors.extend(validate_tree(root, &self.config));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Invalid(errors))
        }
    }

    /// Help for every root, separated by blank lines.
    pub fn help(&self) -> String {
        self.roots
            .iter()
            .map(CommandNode::help)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
