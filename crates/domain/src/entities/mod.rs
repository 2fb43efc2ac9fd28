//! Domain entities - Objects with identity and lifecycle

mod navigation;
mod place;
mod route;

pub use navigation::{NavigationState, NavigationStatus};
pub use place::{PlaceResult, PlaceSource, SearchFilters};
pub use route::{Maneuver, Route, RouteQuery, Step};
