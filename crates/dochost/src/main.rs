use anyhow::Result;
use log::LevelFilter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dochost::manager::{self, EditorManager};
use dochost::vendor::{
    ApiLoader, BinaryContent, EditorCommand, EditorConfig, EditorFactory, EditorHandle,
    ExportedDocument,
};
use dochost::{BusPayload, EventBus, HostConfig, MemorySurface, Topic};

use doccore::{DocumentInfo, DocumentStore, FileType};

/// Simulated vendor widget: logs commands and answers the save protocol over
/// the bus like the real editor does.
struct SimulatedEditor {
    id: u64,
    bus: EventBus,
    content: Mutex<BinaryContent>,
    file_name: String,
    file_type: FileType,
}

impl SimulatedEditor {
    fn new(id: u64, bus: EventBus, config: &EditorConfig) -> Arc<Self> {
        Arc::new(Self {
            id,
            bus,
            content: Mutex::new(config.content.clone()),
            file_name: config.file_name.clone(),
            file_type: config.file_type,
        })
    }
}

impl EditorHandle for SimulatedEditor {
    fn send_command(&self, command: EditorCommand) {
        log::info!(
            "widget #{}: {} {}",
            self.id,
            command.name(),
            command.data()
        );
    }

    fn destroy_editor(&self) -> Result<()> {
        log::info!("widget #{}: destroyed", self.id);
        Ok(())
    }

    fn download_as(&self) {
        let content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        self.bus.emit(
            Topic::SaveDocument,
            BusPayload::Document(ExportedDocument {
                file_name: self.file_name.clone(),
                file_type: self.file_type,
                content: content.clone(),
            }),
        );
    }
}

/// Simulated script loader; the real one injects a script element and waits
/// for the vendor global.
struct SimulatedLoader;

#[async_trait::async_trait]
impl ApiLoader for SimulatedLoader {
    async fn load(&self, url: &str) -> Result<()> {
        log::info!("loading editor API from {}", url);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(())
    }
}

/// Simulated create-instance pipeline: builds a fresh widget, installs it
/// through the manager, and announces readiness.
struct SimulatedFactory {
    manager: Mutex<Option<EditorManager>>,
    bus: EventBus,
    next_id: AtomicU64,
}

impl SimulatedFactory {
    fn new(bus: EventBus) -> Arc<Self> {
        Arc::new(Self {
            manager: Mutex::new(None),
            bus,
            next_id: AtomicU64::new(1),
        })
    }

    fn bind(&self, manager: EditorManager) {
        *self.manager.lock().unwrap_or_else(|e| e.into_inner()) = Some(manager);
    }

    fn build_widget(&self, config: &EditorConfig) -> Arc<SimulatedEditor> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        SimulatedEditor::new(id, self.bus.clone(), config)
    }
}

impl EditorFactory for SimulatedFactory {
    fn spawn_editor(&self, config: EditorConfig) {
        let manager = self
            .manager
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let Some(manager) = manager else {
            log::error!("factory invoked before a manager was bound");
            return;
        };
        let widget = self.build_widget(&config);
        let bus = self.bus.clone();
        tokio::spawn(async move {
            match manager.create(widget, config) {
                Ok(_) => bus.emit(Topic::DocumentReady, BusPayload::Ready),
                Err(e) => log::error!("factory failed to install editor: {}", e),
            }
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger with debug fallback for development
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Info);
        logger.filter_module("dochost", LevelFilter::Debug);
    }
    logger.init();

    let config = HostConfig::load().await?;
    let bus = EventBus::new();

    let mut surface = MemorySurface::new();
    surface.seed_root_child(&config.mount.parent_id);

    let factory = SimulatedFactory::new(bus.clone());
    let editor_manager = EditorManager::new(
        bus.clone(),
        Box::new(SimulatedLoader),
        Box::new(factory.clone()),
        Box::new(surface),
        config,
    );
    factory.bind(editor_manager.clone());
    manager::init_global(editor_manager.clone());

    // Mirror the page-level loading spinner.
    let mut loading_events = bus.on(Topic::LoadingChange);
    tokio::spawn(async move {
        while let Some(payload) = loading_events.recv().await {
            if let BusPayload::Loading { loading } = payload {
                log::info!("spinner: {}", if loading { "shown" } else { "hidden" });
            }
        }
    });

    let documents = DocumentStore::new();
    documents.set(DocumentInfo {
        file_name: "demo.docx".to_string(),
        url: None,
    });

    editor_manager.load_api().await?;

    let initial = EditorConfig {
        file_name: documents.get().file_name,
        file_type: FileType::Docx,
        content: BinaryContent::Text("Hello from the demo document.".to_string()),
        media: None,
        read_only: false,
        language: None,
    };
    let widget = factory.build_widget(&initial);
    let proxy = editor_manager.create(widget, initial)?;
    log::info!("editor live: {}", proxy.is_live());

    let exported = editor_manager.export().await?;
    log::info!(
        "exported '{}' ({} bytes)",
        exported.file_name,
        exported.content.len()
    );

    // Transient in-place lockout, then the full mode switch.
    editor_manager.set_permissions(false);
    editor_manager.set_permissions(true);

    editor_manager.set_read_only(true).await?;
    log::info!("read-only: {}", editor_manager.read_only());

    editor_manager.set_read_only(false).await?;
    log::info!("read-only: {}", editor_manager.read_only());

    editor_manager.print();

    let final_export = editor_manager.export().await?;
    log::info!(
        "final export '{}' ({} bytes), instance #{}",
        final_export.file_name,
        final_export.content.len(),
        editor_manager.instance_seq()
    );

    editor_manager.destroy();
    manager::reset_global();
    Ok(())
}
