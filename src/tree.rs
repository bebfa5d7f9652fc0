//! Capability tree — the discovered command hierarchy of the target CLI.
//!
//! Each node is one reachable command path; leaves carry a [`Capabilities`]
//! record derived by substring-matching a fixed signature table against the
//! leaf's `--help` flag descriptors. The builder walks the hierarchy
//! depth-first with exactly one `--help` spawn per path; any introspection
//! failure aborts the whole build so no partial tree is ever observable.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::error::Result;
use crate::introspect::introspect;

/// Flag signature that marks structured (JSON) output support.
pub const STRUCTURED_OUTPUT_SIG: &str = "-o, --output";
/// Flag signature that marks auto-confirm (`--yes`) support.
pub const AUTO_CONFIRM_SIG: &str = "-y, --yes";
/// Flag signature that marks unattended mode (`--mode=auto`) support.
pub const UNATTENDED_MODE_SIG: &str = "-m, --mode";
/// Flag signature that marks region scoping support.
pub const REGION_SIG: &str = "--region";

/// Per-leaf capability record, derived from the leaf's own flag listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub structured_output: bool,
    pub auto_confirm: bool,
    pub unattended_mode: bool,
    pub region_scoped: bool,
}

impl Capabilities {
    /// Derive capabilities by checking whether each known signature is a
    /// substring of any flag-descriptor line. The matching is intentionally
    /// naive — the rosa help format is fixed by an external project.
    pub fn from_flags(flags: &[String]) -> Self {
        let has = |sig: &str| flags.iter().any(|line| line.contains(sig));
        Self {
            structured_output: has(STRUCTURED_OUTPUT_SIG),
            auto_confirm: has(AUTO_CONFIRM_SIG),
            unattended_mode: has(UNATTENDED_MODE_SIG),
            region_scoped: has(REGION_SIG),
        }
    }
}

/// One position in the target CLI's command hierarchy.
///
/// Invariant: a non-root node has either non-empty `children` or a
/// `capabilities` record, never both and never neither. The root is the sole
/// exception — it has children, or is empty when discovery found nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandNode {
    /// Ordered command-path segments from the root (empty for the root).
    pub path: Vec<String>,
    /// Child nodes keyed by the next path segment.
    pub children: BTreeMap<String, CommandNode>,
    /// Present iff this node is a leaf.
    pub capabilities: Option<Capabilities>,
}

impl CommandNode {
    /// True when this node has no sub-commands.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Follow `segments` down the tree. Returns `None` when any segment does
    /// not name a child of the node reached so far.
    pub fn descend(&self, segments: &[String]) -> Option<&CommandNode> {
        let mut node = self;
        for segment in segments {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Total node count including this node.
    pub fn len(&self) -> usize {
        1 + self.children.values().map(CommandNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.capabilities.is_none()
    }
}

/// Build the full capability tree for `binary` by recursively walking its
/// `--help` hierarchy.
///
/// Termination: each step strictly extends the path and the target CLI's
/// command tree is finite. Any [`crate::HarnessError::Discovery`] aborts the
/// entire build.
pub async fn build_tree(
    binary: &str,
    env: &HashMap<String, String>,
    help_timeout: Duration,
) -> Result<CommandNode> {
    tracing::info!(binary = %binary, "building capability tree");

    let root = walk(binary, Vec::new(), env, help_timeout).await?;

    tracing::info!(
        binary = %binary,
        nodes = %root.len(),
        "capability tree built"
    );

    Ok(root)
}

fn walk<'a>(
    binary: &'a str,
    path: Vec<String>,
    env: &'a HashMap<String, String>,
    help_timeout: Duration,
) -> BoxFuture<'a, Result<CommandNode>> {
    Box::pin(async move {
        let sections = introspect(binary, &path, env, help_timeout).await?;

        if sections.subcommands.is_empty() {
            // Flags come from the same --help call; no second spawn.
            let capabilities = if path.is_empty() {
                // Empty root: no children and no capability record.
                None
            } else {
                Some(Capabilities::from_flags(&sections.flags))
            };
            return Ok(CommandNode {
                path,
                children: BTreeMap::new(),
                capabilities,
            });
        }

        let mut children = BTreeMap::new();
        for sub in sections.subcommands {
            let mut child_path = path.clone();
            child_path.push(sub.clone());
            let child = walk(binary, child_path, env, help_timeout).await?;
            children.insert(sub, child);
        }

        Ok(CommandNode {
            path,
            children,
            capabilities: None,
        })
    })
}
