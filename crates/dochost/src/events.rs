//! エディタホストと UI を疎結合にするプロセス内イベントバス。
//! 保存完了やローディング表示の通知をトピック単位で配信する。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::HostError;
use crate::vendor::ExportedDocument;

/// Bus topics. The wire names are fixed by the page-level consumers and must
/// stay exactly as they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "saveDocument")]
    SaveDocument,
    #[serde(rename = "documentReady")]
    DocumentReady,
    #[serde(rename = "loadingChange")]
    LoadingChange,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::SaveDocument => "saveDocument",
            Topic::DocumentReady => "documentReady",
            Topic::LoadingChange => "loadingChange",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message payloads carried by the bus, one variant per topic family.
#[derive(Debug, Clone, PartialEq)]
pub enum BusPayload {
    Loading { loading: bool },
    Document(ExportedDocument),
    Ready,
}

struct Registry {
    next_id: u64,
    subscribers: HashMap<Topic, Vec<(u64, mpsc::UnboundedSender<BusPayload>)>>,
}

/// In-memory publish/subscribe channel.
///
/// `emit` delivers synchronously to the subscribers registered at that
/// moment; there is no buffering for future subscribers and no persistence.
/// Cloning is cheap and all clones share the same registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                subscribers: HashMap::new(),
            })),
        }
    }

    /// Delivers `payload` to every current subscriber of `topic`.
    pub fn emit(&self, topic: Topic, payload: BusPayload) {
        let mut registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(subscribers) = registry.subscribers.get_mut(&topic) {
            // A closed receiver means the subscription was dropped mid-flight.
            subscribers.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
        }
        log::trace!("bus emit: {}", topic);
    }

    /// Registers a subscriber and returns the capability to receive and to
    /// unsubscribe. Dropping the subscription also detaches it.
    pub fn on(&self, topic: Topic) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let id = registry.next_id;
            registry.next_id += 1;
            registry.subscribers.entry(topic).or_default().push((id, tx));
            id
        };
        Subscription {
            bus: self.clone(),
            topic,
            id,
            rx,
            detached: false,
        }
    }

    /// Resolves with the next payload emitted for `topic`, or fails with
    /// [`HostError::EventTimeout`] once `timeout` elapses. The temporary
    /// subscription is removed on both paths.
    pub async fn wait_for(&self, topic: Topic, timeout: Duration) -> Result<BusPayload, HostError> {
        let mut subscription = self.on(topic);
        let outcome = tokio::time::timeout(timeout, subscription.recv()).await;
        subscription.unsubscribe();
        match outcome {
            Ok(Some(payload)) => Ok(payload),
            Ok(None) | Err(_) => Err(HostError::EventTimeout {
                topic,
                waited: timeout,
            }),
        }
    }

    /// Number of live subscriptions for `topic`; used for leak diagnostics.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        let registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        registry
            .subscribers
            .get(&topic)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered subscriber for one topic.
pub struct Subscription {
    bus: EventBus,
    topic: Topic,
    id: u64,
    rx: mpsc::UnboundedReceiver<BusPayload>,
    detached: bool,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Receives the next payload; `None` once detached and drained.
    pub async fn recv(&mut self) -> Option<BusPayload> {
        self.rx.recv().await
    }

    /// Non-blocking receive for already-buffered payloads.
    pub fn try_recv(&mut self) -> Option<BusPayload> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;
        let mut registry = self.bus.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(subscribers) = registry.subscribers.get_mut(&self.topic) {
            subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
