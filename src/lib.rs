pub mod config;
pub mod router;

pub use config::RouteConfig;
pub use router::Router;
