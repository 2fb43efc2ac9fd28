//! Application services - Use case implementations

pub mod fallback;
mod location_resolver;
mod map_reconciler;
mod navigation_session;
mod realtime_channel;
mod recent_searches;
mod route_provider;
mod search_orchestrator;
mod simulated_results;

#[cfg(test)]
mod test_support;

pub use fallback::{AttemptFailure, Fallback, first_success};
pub use location_resolver::LocationResolver;
pub use map_reconciler::{
    DEFAULT_ROUTE_COLOR, MapReconciler, ReconcilerConfig, SelectCallback, SyncReport,
    format_distance, format_duration,
};
pub use navigation_session::{NavigationConfig, NavigationSession, NavigationTicker};
pub use realtime_channel::{
    ChannelEvent, ConnectionState, RealtimeChannel, RealtimeConfig, SEARCH_REQUEST, SEARCH_RESULTS,
};
pub use recent_searches::{DEFAULT_HISTORY_SIZE, RecentSearches};
pub use route_provider::{RouteProvider, RouteSelection, RouteStats, RoutingConfig};
pub use search_orchestrator::{SearchConfig, SearchOrchestrator, SearchOutcome, SearchStatus, refine};
pub use simulated_results::SimulatedResults;
