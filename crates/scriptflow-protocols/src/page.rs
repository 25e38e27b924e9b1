//! Browser page capability.
//!
//! The engine never talks to a browser directly. Actions and pipes reach the
//! currently attached page through this trait; transport, navigation waits
//! and protocol details belong to the implementation.

use async_trait::async_trait;

use crate::element::NodeRef;
use crate::error::EngineError;

#[async_trait]
pub trait Page: Send + Sync {
    /// Identifier of the page (tab/target id).
    fn id(&self) -> &str;

    /// Current URL of the page.
    async fn url(&self) -> Result<String, EngineError>;

    /// Navigate and wait until the new document is available.
    async fn navigate(&self, url: &str) -> Result<(), EngineError>;

    /// Nodes matching `selector` below `scope`. A document scope queries the
    /// whole page.
    async fn query_all(&self, scope: &NodeRef, selector: &str) -> Result<Vec<NodeRef>, EngineError>;

    /// Text content of a node.
    async fn text_content(&self, node: &NodeRef) -> Result<String, EngineError>;

    /// Raw protocol command.
    async fn send_command(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, EngineError>;
}
