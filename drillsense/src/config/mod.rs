//! Coupon configuration: JSON loading, site overlay and the typed view.

pub mod loader;
pub mod schema;

pub use loader::{load_config, merge_site, ConfigSources, DEFAULT_CONFIG_FILE};
pub use schema::CouponConfig;
