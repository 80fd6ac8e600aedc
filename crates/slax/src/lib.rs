//! 🚨 slax: SLA and daily-operations reporting over a ticketing API and a priority inbox.
//!
//! One [`Dashboard`] per process. Call [`Dashboard::refresh`] whenever you want fresh numbers;
//! the caches decide whether "fresh" means a network round-trip. Render the resulting
//! [`DashboardReport`] with [`render`], or serialize it and let somebody else worry about fonts.

pub mod aggregate;
pub mod app_config;
pub mod backends;
pub mod cache;
pub mod clock;
pub mod common;
pub mod crossref;
pub mod dashboard;
pub mod error;
pub mod fetcher;
pub mod queries;
pub mod render;
pub mod sla;
pub mod ticket_key;
pub mod transforms;

pub use app_config::{AppConfig, load_config};
pub use dashboard::{Dashboard, DashboardReport, TicketDetails};
pub use error::{CycleError, FetchError, FetchResult};
pub use sla::SlaFilter;
