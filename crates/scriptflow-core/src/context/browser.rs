//! The single attached page shared by a script session.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use scriptflow_protocols::error::EngineError;
use scriptflow_protocols::page::Page;

/// Holds at most one attached page.
#[derive(Default)]
pub struct BrowserHandle {
    page: RwLock<Option<Arc<dyn Page>>>,
}

impl BrowserHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `page`, detaching and returning the previous one.
    pub fn attach(&self, page: Arc<dyn Page>) -> Option<Arc<dyn Page>> {
        debug!(page = page.id(), "Attaching page");
        self.page.write().replace(page)
    }

    pub fn detach(&self) -> Option<Arc<dyn Page>> {
        self.page.write().take()
    }

    pub fn is_attached(&self) -> bool {
        self.page.read().is_some()
    }

    /// The attached page.
    pub fn page(&self) -> Result<Arc<dyn Page>, EngineError> {
        self.page
            .read()
            .clone()
            .ok_or_else(|| EngineError::page("No page attached").with_retry(false))
    }
}

impl std::fmt::Debug for BrowserHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let page = self.page.read();
        f.debug_struct("BrowserHandle")
            .field("page", &page.as_ref().map(|p| p.id().to_string()))
            .finish()
    }
}
