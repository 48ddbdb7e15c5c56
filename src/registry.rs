use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::{
    error::ConfigurationError,
    loader::LoaderRef,
    models::{Capability, RedirectReason, normalize_path},
};

/// Path of the catch-all entry.
pub const WILDCARD: &str = "**";

/// NavigationEntry
///
/// Declarative description of one route, as supplied by the application at startup.
/// Exactly one of `loader`, `redirect_to` or a non-empty `children` list gives the
/// entry its meaning:
///
/// - `loader`: a leaf view, fetched on demand once admitted;
/// - `redirect_to`: a stub forwarding to another path. Relative targets are
///   resolved against the parent entry (`""` under `admin` → `dashboard` means
///   `/admin/dashboard`); absolute targets start with `/`;
/// - `children` only: a grouping entry whose required capabilities protect every
///   descendant.
#[derive(Clone, Default)]
pub struct NavigationEntry {
    pub path: String,
    pub loader: Option<LoaderRef>,
    pub redirect_to: Option<String>,
    pub required_capabilities: BTreeSet<Capability>,
    pub children: Vec<NavigationEntry>,
    pub title: Option<String>,
}

impl NavigationEntry {
    pub fn view(path: &str, loader: LoaderRef) -> Self {
        Self {
            path: path.to_string(),
            loader: Some(loader),
            ..Self::default()
        }
    }

    pub fn redirect(path: &str, target: &str) -> Self {
        Self {
            path: path.to_string(),
            redirect_to: Some(target.to_string()),
            ..Self::default()
        }
    }

    pub fn parent(path: &str, children: Vec<NavigationEntry>) -> Self {
        Self {
            path: path.to_string(),
            children,
            ..Self::default()
        }
    }

    pub fn wildcard(target: &str) -> Self {
        Self::redirect(WILDCARD, target)
    }

    pub fn require(mut self, capability: Capability) -> Self {
        self.required_capabilities.insert(capability);
        self
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
}

impl fmt::Debug for NavigationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationEntry")
            .field("path", &self.path)
            .field("loader", &self.loader.is_some())
            .field("redirect_to", &self.redirect_to)
            .field("required_capabilities", &self.required_capabilities)
            .field("children", &self.children)
            .field("title", &self.title)
            .finish()
    }
}

pub type NodeId = usize;

#[derive(Clone)]
enum RouteTarget {
    View(LoaderRef),
    /// Absolute, normalized target path.
    Redirect(String),
    Container,
}

struct RouteNode {
    path: String,
    segments: Vec<String>,
    full_path: String,
    target: RouteTarget,
    required: BTreeSet<Capability>,
    children: Vec<NodeId>,
    title: Option<String>,
}

impl RouteNode {
    fn is_wildcard(&self) -> bool {
        self.path == WILDCARD
    }
}

/// ResolvedRoute
///
/// A view entry matched by a path, with capabilities accumulated from every ancestor.
#[derive(Clone)]
pub struct ResolvedRoute {
    pub node: NodeId,
    /// Registered full path of the matched entry.
    pub path: String,
    pub required_capabilities: BTreeSet<Capability>,
    pub loader: LoaderRef,
    pub title: Option<String>,
}

impl fmt::Debug for ResolvedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedRoute")
            .field("node", &self.node)
            .field("path", &self.path)
            .field("required_capabilities", &self.required_capabilities)
            .field("title", &self.title)
            .finish()
    }
}

/// Resolution
#[derive(Debug, Clone)]
pub enum Resolution {
    Route(ResolvedRoute),
    Redirect { to: String, reason: RedirectReason },
}

/// NavigationRegistry
///
/// Immutable arena of route nodes built once at startup. Matching walks the tree
/// depth-first, left to right. At every level literal entries are tried before the
/// level's wildcard, so an exact match always wins over the catch-all regardless of
/// declaration order.
pub struct NavigationRegistry {
    nodes: Vec<RouteNode>,
    roots: Vec<NodeId>,
}

impl NavigationRegistry {
    /// register
    ///
    /// Validates and flattens the entry tree. Fails when a sibling path is duplicated,
    /// an entry is malformed, or the top level has no wildcard to fall back on.
    pub fn register(entries: Vec<NavigationEntry>) -> Result<Self, ConfigurationError> {
        let mut registry = Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        };

        registry.roots = registry.insert_level(entries, "/")?;

        let has_wildcard = registry
            .roots
            .iter()
            .any(|&id| registry.nodes[id].is_wildcard());
        if !has_wildcard {
            return Err(ConfigurationError::MissingWildcard);
        }

        tracing::debug!(entries = registry.nodes.len(), "Navigation registry built");
        Ok(registry)
    }

    fn insert_level(
        &mut self,
        entries: Vec<NavigationEntry>,
        parent_path: &str,
    ) -> Result<Vec<NodeId>, ConfigurationError> {
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(entries.len());

        for entry in entries {
            // `users` and `users/` match the same segments.
            if !seen.insert(split_segments(&entry.path)) {
                return Err(ConfigurationError::DuplicateSiblingPath {
                    parent: parent_path.trim_start_matches('/').to_string(),
                    path: entry.path,
                });
            }
            ids.push(self.insert_entry(entry, parent_path)?);
        }

        Ok(ids)
    }

    fn insert_entry(
        &mut self,
        entry: NavigationEntry,
        parent_path: &str,
    ) -> Result<NodeId, ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidEntry {
            path: entry.path.clone(),
            reason: reason.to_string(),
        };

        if entry.path.starts_with('/') {
            return Err(invalid("path must be relative (no leading '/')"));
        }

        let is_wildcard = entry.path == WILDCARD;
        let target = match (&entry.loader, &entry.redirect_to) {
            (Some(_), Some(_)) => return Err(invalid("entry has both a view and a redirect")),
            (Some(loader), None) => RouteTarget::View(loader.clone()),
            (None, Some(target)) => RouteTarget::Redirect(resolve_target(parent_path, target)),
            (None, None) if !entry.children.is_empty() && !is_wildcard => RouteTarget::Container,
            (None, None) => return Err(invalid("entry has neither a view, a redirect nor children")),
        };

        if !matches!(target, RouteTarget::Container) && !entry.children.is_empty() {
            return Err(invalid("only grouping entries may declare children"));
        }

        let full_path = if is_wildcard {
            parent_path.to_string()
        } else {
            normalize_path(&format!("{}/{}", parent_path, entry.path))
        };

        let id = self.nodes.len();
        self.nodes.push(RouteNode {
            segments: split_segments(&entry.path),
            path: entry.path,
            full_path: full_path.clone(),
            target,
            required: entry.required_capabilities,
            children: Vec::new(),
            title: entry.title,
        });

        let children = self.insert_level(entry.children, &full_path)?;
        self.nodes[id].children = children;

        Ok(id)
    }

    /// resolve
    ///
    /// Maps a path to the matched view or to the redirect its entry declares. An
    /// error here means the table is broken (no wildcard reached), never that the
    /// path is merely unknown.
    pub fn resolve(&self, path: &str) -> Result<Resolution, ConfigurationError> {
        let normalized = normalize_path(path);
        let segments = split_segments(&normalized);
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let chain = self
            .match_level(&self.roots, &segments)
            .ok_or_else(|| ConfigurationError::Unresolvable(normalized.clone()))?;

        let Some(&leaf_id) = chain.last() else {
            return Err(ConfigurationError::Unresolvable(normalized));
        };
        let leaf = &self.nodes[leaf_id];

        match &leaf.target {
            RouteTarget::View(loader) => {
                let required_capabilities = chain
                    .iter()
                    .flat_map(|&id| self.nodes[id].required.iter().cloned())
                    .collect();

                Ok(Resolution::Route(ResolvedRoute {
                    node: leaf_id,
                    path: leaf.full_path.clone(),
                    required_capabilities,
                    loader: loader.clone(),
                    title: leaf.title.clone(),
                }))
            }
            RouteTarget::Redirect(to) => Ok(Resolution::Redirect {
                to: to.clone(),
                reason: if leaf.is_wildcard() {
                    RedirectReason::Wildcard
                } else {
                    RedirectReason::Index
                },
            }),
            RouteTarget::Container => Err(ConfigurationError::Unresolvable(normalized)),
        }
    }

    fn match_level(&self, level: &[NodeId], segments: &[&str]) -> Option<Vec<NodeId>> {
        for &id in level {
            let node = &self.nodes[id];
            if node.is_wildcard() {
                continue;
            }

            let Some(rest) = strip_segments(segments, &node.segments) else {
                continue;
            };

            match node.target {
                RouteTarget::Container => {
                    if let Some(mut chain) = self.match_level(&node.children, rest) {
                        chain.insert(0, id);
                        return Some(chain);
                    }
                }
                RouteTarget::View(_) | RouteTarget::Redirect(_) if rest.is_empty() => {
                    return Some(vec![id]);
                }
                _ => {}
            }
        }

        level
            .iter()
            .copied()
            .find(|&id| self.nodes[id].is_wildcard())
            .map(|id| vec![id])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Full paths of every view entry, in declaration order.
    pub fn view_paths(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|node| matches!(node.target, RouteTarget::View(_)))
            .map(|node| node.full_path.clone())
            .collect()
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_segments<'a, 'b>(segments: &'a [&'b str], prefix: &[String]) -> Option<&'a [&'b str]> {
    if segments.len() < prefix.len() {
        return None;
    }
    let matches = segments
        .iter()
        .zip(prefix)
        .all(|(segment, expected)| *segment == expected.as_str());
    matches.then(|| &segments[prefix.len()..])
}

fn resolve_target(parent_path: &str, target: &str) -> String {
    if target.starts_with('/') {
        normalize_path(target)
    } else {
        normalize_path(&format!("{}/{}", parent_path, target))
    }
}
