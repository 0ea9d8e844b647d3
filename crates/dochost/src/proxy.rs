use std::sync::Arc;

use crate::manager::EditorManager;
use crate::vendor::{EditorCommand, EditorHandle};

/// The safe view over the raw editor handle that the rest of the application
/// is allowed to hold.
///
/// A proxy never captures a raw handle by value: every call looks up
/// whatever the manager currently considers live. A proxy obtained before a
/// mode switch therefore keeps working against the replacement instance, and
/// a call on a fully stale proxy is a quiet no-op rather than an error.
/// There is no mutating surface; consumers cannot swap the underlying handle.
#[derive(Clone)]
pub struct EditorProxy {
    manager: EditorManager,
}

impl std::fmt::Debug for EditorProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorProxy").finish_non_exhaustive()
    }
}

impl EditorProxy {
    pub(crate) fn new(manager: EditorManager) -> Self {
        Self { manager }
    }

    /// Forwards to the currently live instance; no-op when none is active.
    pub fn send_command(&self, command: EditorCommand) {
        match self.manager.current_handle() {
            Some(handle) => handle.send_command(command),
            None => log::debug!("send_command on an inactive editor proxy ignored"),
        }
    }

    /// Forwards the vendor save trigger; no-op when no instance is active.
    pub fn download_as(&self) {
        match self.manager.current_handle() {
            Some(handle) => handle.download_as(),
            None => log::debug!("download_as on an inactive editor proxy ignored"),
        }
    }

    /// Destroying "your" proxy always destroys the single true active
    /// instance, routed through the manager.
    pub fn destroy_editor(&self) {
        self.manager.destroy();
    }

    /// Read-only access to the current raw handle for vendor extension
    /// calls; `None` while no instance is active.
    pub fn raw(&self) -> Option<Arc<dyn EditorHandle>> {
        self.manager.current_handle()
    }

    pub fn is_live(&self) -> bool {
        self.manager.exists()
    }
}
