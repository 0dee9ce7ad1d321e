use crate::domain::models::Document;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    DocumentChanged { document: Document },
}

#[derive(Debug, Clone)]
pub struct DocumentEvents {
    sender: broadcast::Sender<DocumentEvent>,
}

impl DocumentEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, document: Document) {
        let _ = self.sender.send(DocumentEvent::DocumentChanged { document });
    }
}

impl Default for DocumentEvents {
    fn default() -> Self {
        Self::new()
    }
}
