pub mod error;
pub mod geocode;
pub mod inference;
pub mod storage;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use geocode::GeocodeResolver;
pub use inference::CompletionClient;
pub use storage::{ArticleStore, EventStore};
pub use types::{
    format_timestamp, parse_timestamp, Article, Coordinates, EventKind, GeoWindow, Intent,
    IntentResult, Limit, UserEvent,
};
