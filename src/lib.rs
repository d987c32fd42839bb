pub mod config;
pub mod filter;
pub mod geolocation;
pub mod input;
pub mod models;
pub mod output;

// Re-export commonly used types
pub use config::Config;
pub use filter::{FilterConfig, FilterOutcome, FilterPipeline};
pub use geolocation::{GeoIpService, IpApiClient, Locator};
pub use input::{parse_auth_log, read_auth_log};
pub use models::{AuthEntry, AuthLog, DatedEntries, Location};
pub use output::{OutputFormat, OutputHandler};
