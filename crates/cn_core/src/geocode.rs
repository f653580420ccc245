use async_trait::async_trait;
use crate::types::Coordinates;
use crate::Result;

#[async_trait]
pub trait GeocodeResolver: Send + Sync {
    fn name(&self) -> &str;

    /// Resolve a free-text place name. Fails when nothing matches.
    async fn resolve(&self, text: &str) -> Result<Coordinates>;
}
