pub mod dispatcher;
pub mod geocode;
pub mod service;
pub mod trending;

#[cfg(test)]
mod test_support;

pub use dispatcher::{RetrievalDispatcher, RetrievalStrategy, DEFAULT_NEARBY_RADIUS_KM};
pub use geocode::{create_geocoder, NominatimGeocoder, StaticGeocoder};
pub use service::{NewsService, ServiceOptions};
pub use trending::{rank_events, TrendingAggregator, TrendingScore};

pub mod prelude {
    pub use super::{create_geocoder, NewsService, ServiceOptions};
    pub use cn_core::{Article, Error, EventKind, Limit, Result, UserEvent};
}
