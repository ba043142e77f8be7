pub mod application;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infrastructure;

pub use application::auth_service::SessionManager;
pub use application::builder_service::RequestBuilderService;
pub use application::lifecycle::{ActionOutcome, LifecycleEngine};
pub use application::rack_service::RackService;
pub use application::settings_service::SettingsService;
pub use config::{AppConfig, ConfigResolver};
pub use errors::AppError;
pub use infrastructure::{FileSessionStore, HttpBackend, MemorySessionStore};

/// Resolve the backend endpoint and build the HTTP adapter for it.
pub async fn connect(config: &AppConfig) -> Result<HttpBackend, AppError> {
    let endpoint = ConfigResolver::new(config)?.resolve().await;
    log::info!("Using backend at {}", endpoint.base_url());
    HttpBackend::new(endpoint.base_url(), config.request_timeout)
}
