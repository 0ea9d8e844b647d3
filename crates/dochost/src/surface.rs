//! Host surface provisioning: make sure the mount point the vendor widget
//! renders into still exists before a new instance is installed. The widget's
//! own teardown may have removed it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::HostError;

/// Where the mount point lives and how it is styled. Documented constants of
/// the external interface; see [`MountConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountConfig {
    pub id: String,
    pub parent_id: String,
    pub style: Vec<(String, String)>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            id: String::from("office-editor-mount"),
            parent_id: String::from("office-editor-shell"),
            style: vec![
                (String::from("width"), String::from("100%")),
                (String::from("height"), String::from("100%")),
                (String::from("position"), String::from("relative")),
            ],
        }
    }
}

/// A node to be attached to the host surface.
#[derive(Debug, Clone, PartialEq)]
pub struct MountNode {
    pub id: String,
    pub style: Vec<(String, String)>,
}

/// Attachment target for a new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor<'a> {
    Under(&'a str),
    Root,
}

/// Abstract view of the UI tree the widget mounts into. Keeps the lifecycle
/// manager free of any particular toolkit.
pub trait SurfaceBackend: Send + Sync {
    fn contains(&self, id: &str) -> bool;
    fn attach(&mut self, node: MountNode, anchor: Anchor<'_>) -> Result<(), String>;
}

/// How the mount point was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// The previous mount point survived and is reused.
    Existing,
    /// The mount point was recreated under its designated parent.
    Recreated,
    /// The designated parent was gone too; the mount point now hangs off the
    /// document root. Degraded but usable.
    RootFallback,
}

/// Ensures the mount point exists, recreating it if the previous widget
/// instance removed it during teardown. Runs synchronously so the vendor
/// factory never renders into a missing node.
pub fn ensure_mount(
    backend: &mut dyn SurfaceBackend,
    config: &MountConfig,
) -> Result<Provisioned, HostError> {
    if backend.contains(&config.id) {
        return Ok(Provisioned::Existing);
    }

    let node = MountNode {
        id: config.id.clone(),
        style: config.style.clone(),
    };

    if backend.contains(&config.parent_id) {
        backend
            .attach(node, Anchor::Under(&config.parent_id))
            .map_err(|reason| HostError::Surface { reason })?;
        log::info!(
            "mount point '{}' recreated under '{}'",
            config.id,
            config.parent_id
        );
        return Ok(Provisioned::Recreated);
    }

    backend
        .attach(node, Anchor::Root)
        .map_err(|reason| HostError::Surface { reason })?;
    log::warn!(
        "mount parent '{}' is missing; attached '{}' at the document root",
        config.parent_id,
        config.id
    );
    Ok(Provisioned::RootFallback)
}

#[derive(Debug, Clone)]
struct MemoryNode {
    parent: Option<String>,
    style: Vec<(String, String)>,
}

/// In-memory surface backend used by the demo binary and the test suite.
#[derive(Debug, Default)]
pub struct MemorySurface {
    nodes: HashMap<String, MemoryNode>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a node directly under the root, e.g. the designated mount
    /// parent of a freshly rendered page.
    pub fn seed_root_child(&mut self, id: &str) {
        self.nodes.insert(
            id.to_string(),
            MemoryNode {
                parent: None,
                style: Vec::new(),
            },
        );
    }

    /// Removes a node and everything attached beneath it, the way a widget
    /// teardown rips its subtree out.
    pub fn remove(&mut self, id: &str) {
        self.nodes.remove(id);
        let orphans: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.as_deref() == Some(id))
            .map(|(child_id, _)| child_id.clone())
            .collect();
        for orphan in orphans {
            self.remove(&orphan);
        }
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).and_then(|node| node.parent.as_deref())
    }

    pub fn style_of(&self, id: &str) -> Option<&[(String, String)]> {
        self.nodes.get(id).map(|node| node.style.as_slice())
    }
}

impl SurfaceBackend for MemorySurface {
    fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    fn attach(&mut self, node: MountNode, anchor: Anchor<'_>) -> Result<(), String> {
        if self.nodes.contains_key(&node.id) {
            return Err(format!("node '{}' already attached", node.id));
        }
        let parent = match anchor {
            Anchor::Under(parent_id) => {
                if !self.nodes.contains_key(parent_id) {
                    return Err(format!("parent '{}' not found", parent_id));
                }
                Some(parent_id.to_string())
            }
            Anchor::Root => None,
        };
        self.nodes.insert(
            node.id,
            MemoryNode {
                parent,
                style: node.style,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_mount_is_reused() {
        let mut surface = MemorySurface::new();
        surface.seed_root_child("office-editor-shell");
        let config = MountConfig::default();
        surface
            .attach(
                MountNode {
                    id: config.id.clone(),
                    style: Vec::new(),
                },
                Anchor::Under("office-editor-shell"),
            )
            .unwrap();

        let outcome = ensure_mount(&mut surface, &config).unwrap();
        assert_eq!(outcome, Provisioned::Existing);
    }

    #[test]
    fn test_missing_mount_is_recreated_under_parent() {
        let mut surface = MemorySurface::new();
        surface.seed_root_child("office-editor-shell");
        let config = MountConfig::default();

        let outcome = ensure_mount(&mut surface, &config).unwrap();
        assert_eq!(outcome, Provisioned::Recreated);
        assert_eq!(surface.parent_of(&config.id), Some("office-editor-shell"));
        assert_eq!(
            surface.style_of(&config.id).map(|style| style.len()),
            Some(config.style.len())
        );
    }

    #[test]
    fn test_missing_parent_falls_back_to_root() {
        let mut surface = MemorySurface::new();
        let config = MountConfig::default();

        let outcome = ensure_mount(&mut surface, &config).unwrap();
        assert_eq!(outcome, Provisioned::RootFallback);
        assert!(surface.contains(&config.id));
        assert_eq!(surface.parent_of(&config.id), None);
    }

    #[test]
    fn test_teardown_then_reprovision() {
        let mut surface = MemorySurface::new();
        surface.seed_root_child("office-editor-shell");
        let config = MountConfig::default();

        assert_eq!(
            ensure_mount(&mut surface, &config).unwrap(),
            Provisioned::Recreated
        );

        // Widget teardown takes its subtree with it.
        surface.remove(&config.id);
        assert!(!surface.contains(&config.id));

        assert_eq!(
            ensure_mount(&mut surface, &config).unwrap(),
            Provisioned::Recreated
        );
    }

    #[test]
    fn test_attach_under_missing_parent_is_rejected() {
        let mut surface = MemorySurface::new();
        let result = surface.attach(
            MountNode {
                id: String::from("mount"),
                style: Vec::new(),
            },
            Anchor::Under("ghost"),
        );
        assert!(result.is_err());
    }
}
