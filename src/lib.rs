//! Landmine-victim dashboard data layer: department name normalization,
//! the GeoJSON department registry, metric reconciliation onto the map and
//! trailing-window aggregation of the monthly series.

pub mod aggregate;
pub mod cache;
pub mod columns;
pub mod config;
pub mod error;
pub mod geo;
pub mod loader;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod util;

pub use aggregate::{MonthlyRow, aggregate_window};
pub use cache::RegistryCache;
pub use error::{DataError, Result};
pub use geo::{GeoRegistry, GeoRegistryEntry, build_registry};
pub use normalize::{CanonicalName, normalize};
pub use reconcile::{CollisionPolicy, JoinedMapRow, MetricRow, Reconciliation, reconcile};
