#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod roster_service;
pub mod tips_service;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use error::{RosterError, TipsError};
pub use roster_service::RosterService;
pub use tips_service::{TIPS_FALLBACK, TipsConfig, TipsService};
