use std::collections::BTreeMap;
use std::sync::Arc;

use dotenvy::dotenv;
use stock_requests::domain::ports::{AutoConfirm, RequestFeed};
use stock_requests::domain::request::Request;
use stock_requests::domain::session::{HomeView, Role};
use stock_requests::{
    connect, AppConfig, AppError, FileSessionStore, LifecycleEngine, RackService, SessionManager,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env()?;
    let backend = connect(&config).await?;

    let sessions = SessionManager::new(backend.clone(), FileSessionStore::new(&config.session_file));
    let mut session = match sessions.restore()? {
        Some(session) => session,
        None => match &config.credentials {
            Some(credentials) => sessions.login(credentials).await?,
            None => {
                log::error!("No stored session; set STOCK_USERNAME and STOCK_PASSWORD to sign in");
                return Err(AppError::NotAuthenticated);
            }
        },
    };

    loop {
        let Some(home) = session.role.home_view() else {
            log::warn!("Role {} has no view to watch", session.role);
            return Ok(());
        };
        log::info!("Watching as {} ({:?})", session.user_name, home);

        let feed = match home {
            HomeView::ReviewQueue => RequestFeed::Active,
            HomeView::Dashboard | HomeView::CreateRequest => RequestFeed::All,
        };
        let engine = Arc::new(LifecycleEngine::new(
            backend.clone(),
            session.clone(),
            feed,
            Box::new(AutoConfirm),
        ));
        let mut requests_sync = engine.spawn_sync(config.poll_interval);
        let mut changes = engine.subscribe();

        let admin = session.role == Role::Admin;
        let racks = Arc::new(RackService::new(backend.clone(), session.clone()));
        let _racks_sync = admin.then(|| racks.spawn_sync(config.catalog_poll_interval));

        let rejected = loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    log_summary(&engine.requests());
                    if admin {
                        log::info!("{} rack slot(s) on record", racks.slots().len());
                    }
                }
                err = requests_sync.rejected() => break err,
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Shutting down");
                    return Ok(());
                }
            }
        };

        log::warn!("Backend rejected the session of {}: {rejected}", session.user_name);
        session = sessions.reauthenticate(config.credentials.as_ref()).await?;
    }
}

fn log_summary(requests: &[Request]) {
    let mut by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
    for request in requests {
        *by_status.entry(request.overall_status().as_str()).or_default() += 1;
    }
    let summary = by_status
        .iter()
        .map(|(status, count)| format!("{status}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    log::info!("{} request(s) ({summary})", requests.len());
}
