//! Ordered hook lists and the pipeline primitive that runs them.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};

/// A hook tagged with the plugin that registered it.
#[derive(Clone)]
pub struct Registered<T> {
    pub plugin: Arc<str>,
    pub hook: T,
}

/// Hooks of one category in registration order.
#[derive(Clone)]
pub struct HookChain<T> {
    entries: Vec<Registered<T>>,
}

impl<T> Default for HookChain<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> HookChain<T> {
    pub fn push(&mut self, plugin: Arc<str>, hook: T) {
        self.entries.push(Registered { plugin, hook });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registered<T>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Thread `init` through every hook in order.
    ///
    /// Each step is awaited before the next starts and sees the previous
    /// step's output. The first failure stops the pipeline and is tagged
    /// with the plugin that owns the hook.
    pub async fn fold<'s, S, F, Fut>(&'s self, init: S, mut step: F) -> Result<S>
    where
        F: FnMut(&'s T, S) -> Fut,
        Fut: Future<Output = Result<S>>,
    {
        let mut state = init;
        for entry in &self.entries {
            state = step(&entry.hook, state)
                .await
                .with_context(|| format!("plugin `{}`", entry.plugin))?;
        }
        Ok(state)
    }
}
