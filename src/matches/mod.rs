pub mod api_football;
pub mod fallback;
pub mod filters;
pub mod gateway;
pub mod models;
pub mod provider;

pub use api_football::ApiFootball;
pub use filters::{DateRange, InputError, StatusFilter};
pub use gateway::Gateway;
pub use models::{DataSource, FetchResult, Match, MatchSnapshot, StatusCode};
pub use provider::{FixtureProvider, FixtureQuery, ProviderError};
