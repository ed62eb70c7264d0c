//! Pluggable card powers and trumps
//!
//! Card definitions name their capability (`resolver`); the engine looks it
//! up in a [`Capabilities`] registry when a power triggers or a trump is
//! played, and again whenever a paused [`Continuation`] is resumed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::action::{ActionContext, ActionInput, Continuation};
use crate::error::GameError;
use crate::game::Game;

/// Outcome of invoking a capability
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invocation {
    /// The capability took over; it will call [`Game::complete`] when done
    Started,
    /// No valid caster or target. Game state is untouched.
    Declined,
}

/// A power or trump implementation
pub trait Capability: Send + Sync {
    /// A `"*"` result for this card does not make the attacker fall back
    fn skip_draw(&self) -> bool {
        false
    }

    fn invoke(&self, game: &mut Game, ctx: ActionContext) -> Result<Invocation, GameError>;

    /// Continue a paused interaction. When `discarded` is set the engine
    /// rebroadcasts and drains the stack itself afterwards.
    fn resume(
        &self,
        game: &mut Game,
        next: Continuation,
        input: ActionInput,
        discarded: bool,
    ) -> Result<(), GameError> {
        let _ = (next, input);
        if discarded {
            return Ok(());
        }
        game.complete()
    }
}

/// Registry of capabilities by resolver name
#[derive(Clone, Default)]
pub struct Capabilities {
    entries: HashMap<String, Arc<dyn Capability>>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the capabilities shipped with the engine
    pub fn builtin() -> Self {
        let mut caps = Self::new();
        crate::powers::register_builtin(&mut caps);
        caps
    }

    pub fn register(&mut self, name: &str, capability: impl Capability + 'static) {
        self.entries.insert(name.to_string(), Arc::new(capability));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.entries.get(name).cloned()
    }

    /// Capability for an optional resolver name
    pub fn lookup(&self, resolver: Option<&str>) -> Option<Arc<dyn Capability>> {
        resolver.and_then(|name| self.get(name))
    }

    pub fn skips_draw(&self, resolver: Option<&str>) -> bool {
        self.lookup(resolver).is_some_and(|cap| cap.skip_draw())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
