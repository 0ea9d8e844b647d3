// Dochost library exports

pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod proxy;
pub mod surface;
pub mod vendor;

pub use config::{HostConfig, TimeoutConfig};
pub use error::HostError;
pub use events::{BusPayload, EventBus, Subscription, Topic};
pub use manager::{EditorManager, LifecycleState};
pub use proxy::EditorProxy;
pub use surface::{ensure_mount, MemorySurface, MountConfig, Provisioned, SurfaceBackend};
pub use vendor::{
    ApiLoader, BinaryContent, EditorCommand, EditorConfig, EditorFactory, EditorHandle,
    ExportedDocument,
};
