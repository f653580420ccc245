use async_trait::async_trait;
use cn_core::{ArticleStore, EventStore, Result};
use std::sync::Arc;
use tracing::info;

pub mod backends;
pub mod ranking;
pub mod seed;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: ArticleStore + EventStore + Sized + 'static {
    fn name() -> &'static str;

    async fn connect(url: Option<&str>) -> Result<Self>;
}

/// Article and event stores backed by the same backend instance.
#[derive(Clone)]
pub struct Storage {
    pub articles: Arc<dyn ArticleStore>,
    pub events: Arc<dyn EventStore>,
}

impl Storage {
    pub fn from_backend<T: StorageBackend>(backend: T) -> Self {
        let shared = Arc::new(backend);
        let articles: Arc<dyn ArticleStore> = shared.clone();
        let events: Arc<dyn EventStore> = shared;
        Self { articles, events }
    }
}

async fn connect<T: StorageBackend>(url: Option<&str>) -> Result<Storage> {
    let backend = T::connect(url).await?;
    info!("💾 Storage backend ready (using {})", T::name());
    Ok(Storage::from_backend(backend))
}

pub async fn create_storage(kind: &str, url: Option<&str>) -> Result<Storage> {
    match kind {
        "memory" => connect::<InMemoryStorage>(url).await,
        #[cfg(feature = "sqlite")]
        "sqlite" => connect::<SQLiteStorage>(url).await,
        other => Err(cn_core::Error::validation(format!(
            "Unsupported storage backend '{}'",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, Storage, StorageBackend};
}
