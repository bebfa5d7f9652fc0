//! Capability cache — process-lifetime memoization of built trees, keyed by
//! target-binary identity.
//!
//! An explicit, injected cache object rather than ambient global state. A
//! tree is built off-lock and published with a single map insert, so callers
//! only ever observe a complete tree; `rebuild` replaces the entry wholesale.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::error::Result;
use crate::tree::{CommandNode, build_tree};

/// Shared, read-mostly store of capability trees.
#[derive(Debug, Default)]
pub struct CapabilityCache {
    trees: RwLock<HashMap<String, Arc<CommandNode>>>,
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached tree for `binary`, building it on first use.
    ///
    /// The first call performs the full `--help` walk; subsequent calls
    /// return the stored tree without re-invoking the target CLI. A failed
    /// build caches nothing — the next call retries from scratch.
    pub async fn get_or_build(
        &self,
        binary: &str,
        env: &HashMap<String, String>,
        help_timeout: Duration,
    ) -> Result<Arc<CommandNode>> {
        if let Some(tree) = self.trees.read().await.get(binary) {
            return Ok(tree.clone());
        }

        let tree = Arc::new(build_tree(binary, env, help_timeout).await?);
        self.trees
            .write()
            .await
            .insert(binary.to_string(), tree.clone());
        Ok(tree)
    }

    /// Discard any cached tree for `binary` and build a fresh one.
    ///
    /// The fresh tree is built before the stored entry is touched, so readers
    /// racing a rebuild see either the old complete tree or the new one.
    pub async fn rebuild(
        &self,
        binary: &str,
        env: &HashMap<String, String>,
        help_timeout: Duration,
    ) -> Result<Arc<CommandNode>> {
        let tree = Arc::new(build_tree(binary, env, help_timeout).await?);
        self.trees
            .write()
            .await
            .insert(binary.to_string(), tree.clone());

        tracing::info!(binary = %binary, "capability tree rebuilt");
        Ok(tree)
    }

    /// Number of cached trees.
    pub async fn len(&self) -> usize {
        self.trees.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.trees.read().await.is_empty()
    }
}
