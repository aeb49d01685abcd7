//! Process-wide caches shared by every request.
//!
//! Both caches are constructed once at startup and handed to the request
//! pipeline through the gateway state; nothing here is a global.

mod profile;
mod services;

pub use profile::{DEFAULT_MAX_ENTRIES, ProfileCache, spawn_sweeper};
pub use services::{SERVICE_NAMES_TTL, ServiceNameCache};
