//! The editor lifecycle manager: owns the single live widget instance, its
//! retained configuration, and the read-only/editable switch protocol.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::sleep;

use crate::config::HostConfig;
use crate::error::HostError;
use crate::events::{BusPayload, EventBus, Topic};
use crate::proxy::EditorProxy;
use crate::surface::{ensure_mount, SurfaceBackend};
use crate::vendor::{
    ApiLoader, EditorCommand, EditorConfig, EditorFactory, EditorHandle, ExportedDocument,
};

/// User-facing notice delivered with the permissions-revocation command.
pub const READONLY_MESSAGE: &str = "Document has been switched to read-only mode";

/// Where the manager currently stands. A non-`Empty` state always has a live
/// raw handle and a matching retained configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Empty,
    ActiveEdit,
    ActiveReadOnly,
    Transitioning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiState {
    NotLoaded,
    Loaded,
}

#[derive(Default)]
struct Slot {
    handle: Option<Arc<dyn EditorHandle>>,
    config: Option<EditorConfig>,
    read_only: bool,
    lifecycle: LifecycleState,
}

struct ManagerInner {
    slot: RwLock<Slot>,
    bus: EventBus,
    loader: Box<dyn ApiLoader>,
    factory: Box<dyn EditorFactory>,
    surface: StdMutex<Box<dyn SurfaceBackend>>,
    config: HostConfig,
    api_state: AsyncMutex<ApiState>,
    // Single-flight guard for set_read_only; overlapping switches are
    // rejected, not queued.
    switch_guard: AsyncMutex<()>,
    instance_seq: AtomicU64,
    installed_at: StdMutex<Option<DateTime<Utc>>>,
}

/// Orchestrator for one embedded editor instance at a time.
///
/// Cloning is cheap; all clones drive the same underlying state. The sync
/// locks are held only for short slot accesses and never across `.await`.
#[derive(Clone)]
pub struct EditorManager {
    inner: Arc<ManagerInner>,
}

impl EditorManager {
    pub fn new(
        bus: EventBus,
        loader: Box<dyn ApiLoader>,
        factory: Box<dyn EditorFactory>,
        surface: Box<dyn SurfaceBackend>,
        config: HostConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                slot: RwLock::new(Slot::default()),
                bus,
                loader,
                factory,
                surface: StdMutex::new(surface),
                config,
                api_state: AsyncMutex::new(ApiState::NotLoaded),
                switch_guard: AsyncMutex::new(()),
                instance_seq: AtomicU64::new(0),
                installed_at: StdMutex::new(None),
            }),
        }
    }

    pub fn bus(&self) -> EventBus {
        self.inner.bus.clone()
    }

    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    fn slot_read(&self) -> RwLockReadGuard<'_, Slot> {
        self.inner.slot.read().unwrap_or_else(|e| e.into_inner())
    }

    fn slot_write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.inner.slot.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Loads the vendor editor script once per process.
    ///
    /// Concurrent callers serialize on the load marker. Success is cached
    /// for the process lifetime and observed by everyone queued behind it;
    /// failure clears the marker, so the next caller (queued or later)
    /// starts a fresh attempt instead of inheriting the stale error.
    pub async fn load_api(&self) -> Result<(), HostError> {
        let mut api_state = self.inner.api_state.lock().await;
        if *api_state == ApiState::Loaded {
            return Ok(());
        }

        match self
            .inner
            .loader
            .load(&self.inner.config.api_script_url)
            .await
        {
            Ok(()) => {
                *api_state = ApiState::Loaded;
                log::info!("editor API loaded from {}", self.inner.config.api_script_url);
                Ok(())
            }
            Err(e) => {
                log::error!("failed to load editor API: {:#}", e);
                Err(HostError::ApiLoad {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Installs a freshly constructed raw handle together with its
    /// configuration and returns a capability proxy for it.
    ///
    /// Any previously active instance is destroyed first; its teardown
    /// errors are logged and swallowed. The mount point is provisioned
    /// synchronously before the install so the vendor widget never renders
    /// into a missing node. The slot is cleared before provisioning runs:
    /// the old instance is already gone at that point, so a provisioning
    /// failure leaves the manager `Empty` rather than claiming a live
    /// editor it no longer has.
    pub fn create(
        &self,
        handle: Arc<dyn EditorHandle>,
        config: EditorConfig,
    ) -> Result<EditorProxy, HostError> {
        let previous = {
            let mut slot = self.slot_write();
            slot.config = None;
            slot.read_only = false;
            slot.lifecycle = LifecycleState::Empty;
            slot.handle.take()
        };
        if let Some(old) = previous {
            if let Err(e) = old.destroy_editor() {
                log::warn!("error destroying previous editor: {:#}", e);
            }
        }

        {
            let mut surface = self
                .inner
                .surface
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            ensure_mount(surface.as_mut(), &self.inner.config.mount)?;
        }

        {
            let mut slot = self.slot_write();
            slot.read_only = config.read_only;
            slot.lifecycle = if config.read_only {
                LifecycleState::ActiveReadOnly
            } else {
                LifecycleState::ActiveEdit
            };
            slot.handle = Some(handle);
            slot.config = Some(config);
        }

        let seq = self.inner.instance_seq.fetch_add(1, Ordering::SeqCst) + 1;
        *self
            .inner
            .installed_at
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
        log::info!("editor instance #{} installed", seq);

        Ok(EditorProxy::new(self.clone()))
    }

    /// Destroys the current instance if present. Idempotent and safe to call
    /// while already empty; teardown errors never propagate.
    pub fn destroy(&self) {
        let previous = {
            let mut slot = self.slot_write();
            slot.config = None;
            slot.read_only = false;
            slot.lifecycle = LifecycleState::Empty;
            slot.handle.take()
        };
        match previous {
            Some(handle) => {
                if let Err(e) = handle.destroy_editor() {
                    log::warn!("error destroying editor: {:#}", e);
                }
            }
            None => log::debug!("destroy called with no active editor"),
        }
    }

    /// A proxy bound to this manager, or `None` while empty.
    pub fn get(&self) -> Option<EditorProxy> {
        if self.exists() {
            Some(EditorProxy::new(self.clone()))
        } else {
            None
        }
    }

    pub fn exists(&self) -> bool {
        self.slot_read().handle.is_some()
    }

    pub fn read_only(&self) -> bool {
        self.slot_read().read_only
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.slot_read().lifecycle
    }

    /// Snapshot of the retained creation config, if any.
    pub fn retained_config(&self) -> Option<EditorConfig> {
        self.slot_read().config.clone()
    }

    pub(crate) fn current_handle(&self) -> Option<Arc<dyn EditorHandle>> {
        self.slot_read().handle.clone()
    }

    /// Monotonic count of handle installs, for diagnostics.
    pub fn instance_seq(&self) -> u64 {
        self.inner.instance_seq.load(Ordering::SeqCst)
    }

    pub fn installed_at(&self) -> Option<DateTime<Utc>> {
        *self
            .inner
            .installed_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Switches between editable and read-only mode.
    ///
    /// Emits `loadingChange {loading: true}` immediately, waits the debounce
    /// interval, then runs the direction-specific protocol. Whatever
    /// happens, a matching `{loading: false}` goes out before the result is
    /// returned; loading indicators must never get stuck. Overlapping calls
    /// are rejected with [`HostError::SwitchInFlight`].
    pub async fn set_read_only(&self, target: bool) -> Result<(), HostError> {
        let _guard = self
            .inner
            .switch_guard
            .try_lock()
            .map_err(|_| HostError::SwitchInFlight)?;

        self.emit_loading(true);
        sleep(self.inner.config.timeouts.debounce()).await;

        if self.read_only() == target {
            self.emit_loading(false);
            return Ok(());
        }

        {
            let mut slot = self.slot_write();
            slot.lifecycle = LifecycleState::Transitioning;
        }

        let result = if target {
            self.enter_read_only().await
        } else {
            self.leave_read_only().await
        };

        if let Err(e) = &result {
            log::error!("read-only switch failed: {}", e);
            self.settle_lifecycle();
            self.emit_loading(false);
        }
        result
    }

    /// Editable to read-only: the widget stays alive. Content is exported
    /// through the save protocol, folded back into the retained config, and
    /// the widget is told to revoke editing rights.
    async fn enter_read_only(&self) -> Result<(), HostError> {
        let exported = self.export_live().await?;

        let handle = {
            let mut slot = self.slot_write();
            let config = slot.config.as_mut().ok_or(HostError::EditorUnavailable)?;
            config.file_name = exported.file_name;
            config.file_type = exported.file_type;
            config.content = exported.content;
            slot.handle.clone().ok_or(HostError::EditorUnavailable)?
        };

        handle.send_command(EditorCommand::RightsChange {
            enabled: false,
            message: READONLY_MESSAGE.to_string(),
        });

        {
            let mut slot = self.slot_write();
            slot.read_only = true;
            slot.lifecycle = LifecycleState::ActiveReadOnly;
        }
        self.emit_loading(false);
        log::info!("editor switched to read-only mode");
        Ok(())
    }

    /// Read-only to editable: the vendor widget cannot be flipped back in
    /// place, so the live instance is destroyed and a brand-new editable one
    /// is requested from the external factory using the retained content.
    async fn leave_read_only(&self) -> Result<(), HostError> {
        let retained = self
            .retained_config()
            .ok_or(HostError::EditorUnavailable)?;

        let previous = self.slot_write().handle.take();
        match previous {
            Some(handle) => {
                if let Err(e) = handle.destroy_editor() {
                    log::warn!("error destroying editor: {:#}", e);
                }
            }
            None => return Err(HostError::EditorUnavailable),
        }

        let mut respawn = retained;
        respawn.read_only = false;
        if respawn.language.is_none() {
            respawn.language = Some(self.inner.config.language.clone());
        }
        log::info!(
            "recreating editor in editable mode from '{}'",
            respawn.file_name
        );

        // Subscribe before invoking the factory so a fast install cannot
        // announce readiness into the void.
        let waited = self.inner.config.timeouts.ready_wait();
        let mut ready = self.inner.bus.on(Topic::DocumentReady);
        self.inner.factory.spawn_editor(respawn);
        let outcome = tokio::time::timeout(waited, ready.recv()).await;
        ready.unsubscribe();
        if !matches!(outcome, Ok(Some(_))) {
            return Err(HostError::EventTimeout {
                topic: Topic::DocumentReady,
                waited,
            });
        }

        // The factory installs the new handle via create(); a ready signal
        // without an install would leave the state claiming a live editor.
        if !self.exists() {
            return Err(HostError::EditorUnavailable);
        }

        {
            let mut slot = self.slot_write();
            slot.read_only = false;
            slot.lifecycle = LifecycleState::ActiveEdit;
        }
        self.emit_loading(false);
        log::info!("editor switched to editable mode");
        Ok(())
    }

    /// Exports the current document.
    ///
    /// In read-only mode the retained config is returned directly: the
    /// content cannot have changed, so no round-trip through the widget is
    /// needed. In editable mode the live save protocol is used; a failed
    /// live export emits `loadingChange {loading: false}` before the error
    /// is returned.
    pub async fn export(&self) -> Result<ExportedDocument, HostError> {
        if self.read_only() {
            let config = self
                .retained_config()
                .ok_or(HostError::EditorUnavailable)?;
            return Ok(ExportedDocument::from(&config));
        }
        let result = self.export_live().await;
        if result.is_err() {
            self.emit_loading(false);
        }
        result
    }

    async fn export_live(&self) -> Result<ExportedDocument, HostError> {
        let handle = self.current_handle().ok_or(HostError::EditorUnavailable)?;
        let waited = self.inner.config.timeouts.save_wait();

        // Subscribe before triggering the save so the event cannot slip
        // through between the trigger and the wait.
        let mut subscription = self.inner.bus.on(Topic::SaveDocument);
        handle.download_as();

        let outcome = tokio::time::timeout(waited, async {
            while let Some(payload) = subscription.recv().await {
                if let BusPayload::Document(document) = payload {
                    return Some(document);
                }
            }
            None
        })
        .await;
        subscription.unsubscribe();

        // Loading cleanup is the caller's job: the switch path and the
        // public `export` each emit the clearing event exactly once.
        match outcome {
            Ok(Some(document)) => Ok(document),
            Ok(None) | Err(_) => Err(HostError::ExportTimeout { waited }),
        }
    }

    /// In-place permissions toggle on the live instance; no-op if none.
    ///
    /// Unlike [`set_read_only`], this only flips the vendor widget's edit
    /// permission and does not touch the lifecycle state or retained
    /// config. Useful for transient lockouts (e.g. while another user holds
    /// the document).
    ///
    /// [`set_read_only`]: EditorManager::set_read_only
    pub fn set_permissions(&self, edit: bool) {
        match self.current_handle() {
            Some(handle) => handle.send_command(EditorCommand::SetPermissions { edit }),
            None => log::debug!("permissions change requested with no active editor"),
        }
    }

    /// Delegates a print command to the live instance; no-op if none.
    pub fn print(&self) {
        match self.current_handle() {
            Some(handle) => {
                log::info!("printing document");
                handle.send_command(EditorCommand::Print);
            }
            None => log::debug!("print requested with no active editor"),
        }
    }

    fn emit_loading(&self, loading: bool) {
        self.inner
            .bus
            .emit(Topic::LoadingChange, BusPayload::Loading { loading });
    }

    /// Recomputes the lifecycle from what is actually in the slot after a
    /// failed transition, keeping the state/handle invariant intact.
    ///
    /// When no handle survived the slot settles to a full `Empty`: the
    /// read-only flag and the retained config go with it, so `export` and
    /// `read_only` cannot report leftovers of an instance that is gone.
    fn settle_lifecycle(&self) {
        let mut slot = self.slot_write();
        match (&slot.handle, slot.read_only) {
            (None, _) => {
                slot.lifecycle = LifecycleState::Empty;
                slot.read_only = false;
                slot.config = None;
            }
            (Some(_), true) => slot.lifecycle = LifecycleState::ActiveReadOnly,
            (Some(_), false) => slot.lifecycle = LifecycleState::ActiveEdit,
        }
    }
}

// Process-wide diagnostic access to the most recently initialized manager.
// Explicit init/reset entry points keep tests isolated.

fn global_slot() -> &'static StdMutex<Option<EditorManager>> {
    static GLOBAL: OnceLock<StdMutex<Option<EditorManager>>> = OnceLock::new();
    GLOBAL.get_or_init(|| StdMutex::new(None))
}

pub fn init_global(manager: EditorManager) {
    *global_slot().lock().unwrap_or_else(|e| e.into_inner()) = Some(manager);
}

pub fn global() -> Option<EditorManager> {
    global_slot()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

pub fn reset_global() {
    *global_slot().lock().unwrap_or_else(|e| e.into_inner()) = None;
}
