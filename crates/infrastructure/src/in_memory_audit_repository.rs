use async_trait::async_trait;
use tessera_application::{AuditEvent, AuditRepository};
use tessera_core::AppResult;
use tokio::sync::RwLock;

/// Append-only in-memory audit log.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded event in append order.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}
