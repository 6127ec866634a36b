pub mod loaders;
pub mod locator;
pub mod locator_config;
pub mod query;
pub mod result;

pub use loaders::resolve_locator_config;
pub use locator::{Locator, Query};
pub use locator_config::{roles, LocatorConfig, Role};
pub use query::{Category, DateRange, EntityQuery};
pub use result::{BatchSummary, DownloadResult, EntityFailure};
