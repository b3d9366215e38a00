//! Embedder-registered slash commands.
//!
//! A hook maps a command name to a typed descriptor: the accepted argument
//! count and a builder that turns the typed arguments into a
//! [`ClientEvent`]. The command interpreter looks hooks up by their
//! case-folded name and fires whatever event the builder returns.
//!
//! # Example
//!
//! ```
//! use isomer_client::events::{ClientEvent, DataQuery};
//! use isomer_client::hooks::{Arity, HookCommand, HookTable};
//!
//! let mut hooks = HookTable::new();
//! hooks
//!     .register(HookCommand::new("find", Arity::Exact(2), |args| {
//!         let filter = serde_json::json!({ "name": args[1] });
//!         Ok(ClientEvent::DataQuery(DataQuery::new(args[0].clone(), filter)))
//!     }))
//!     .unwrap();
//! assert!(hooks.get("FIND").is_some());
//! ```

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::events::ClientEvent;

/// Number of arguments a hook accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Any number of arguments.
    Any,
    /// Exactly `n` arguments.
    Exact(usize),
    /// At least `n` arguments.
    AtLeast(usize),
}

impl Arity {
    /// Returns `true` if `count` arguments are acceptable.
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any args"),
            Self::Exact(1) => write!(f, "1 arg"),
            Self::Exact(n) => write!(f, "{n} args"),
            Self::AtLeast(n) => write!(f, "{n}+ args"),
        }
    }
}

/// Builds the event fired by a hook from its arguments.
pub type HookBuilder = Box<dyn Fn(&[String]) -> Result<ClientEvent> + Send>;

/// Typed descriptor of a hook command.
pub struct HookCommand {
    name: String,
    arity: Arity,
    build: HookBuilder,
}

impl std::fmt::Debug for HookCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookCommand")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl HookCommand {
    /// Describe a hook. The name is case-folded.
    pub fn new<F>(name: impl Into<String>, arity: Arity, build: F) -> Self
    where
        F: Fn(&[String]) -> Result<ClientEvent> + Send + 'static,
    {
        Self {
            name: name.into().to_lowercase(),
            arity,
            build: Box::new(build),
        }
    }

    /// Case-folded command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accepted argument count.
    #[must_use]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Produce the event for `args`.
    ///
    /// # Errors
    ///
    /// Returns an error on an arity mismatch or when the builder fails.
    pub fn build(&self, args: &[String]) -> Result<ClientEvent> {
        if !self.arity.accepts(args.len()) {
            bail!(
                "/{} expects {}, got {}",
                self.name,
                self.arity,
                args.len()
            );
        }
        (self.build)(args)
    }
}

/// Registered hooks keyed by case-folded name.
#[derive(Debug, Default)]
pub struct HookTable {
    hooks: BTreeMap<String, HookCommand>,
}

impl HookTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook, replacing any previous hook of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or contains whitespace.
    pub fn register(&mut self, hook: HookCommand) -> Result<()> {
        if hook.name.is_empty() || hook.name.chars().any(char::is_whitespace) {
            bail!("invalid hook name {:?}", hook.name);
        }
        if self.hooks.insert(hook.name.clone(), hook).is_some() {
            log::debug!("[Hooks] replaced existing hook");
        }
        Ok(())
    }

    /// Look up a hook by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HookCommand> {
        self.hooks.get(&name.to_lowercase())
    }

    /// Registered hooks in name order.
    pub fn iter(&self) -> impl Iterator<Item = &HookCommand> {
        self.hooks.values()
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Check if no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
