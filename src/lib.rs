pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sqlx::PgPool;

use crate::database::pg::PgStore;
use crate::database::store::ApplicationStore;
use crate::services::{
    application_service::ApplicationService, job_service::JobService,
    notification_service::{NotificationService, Notifier},
};

#[derive(Clone)]
pub struct AppState {
    pub application_service: ApplicationService,
    pub job_service: JobService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let store: Arc<dyn ApplicationStore> = Arc::new(PgStore::new(pool.clone()));
        let notifier: Arc<dyn Notifier> = Arc::new(NotificationService::new(
            pool,
            config.email_gateway_url.clone(),
        ));
        Self::with_store(store, notifier)
    }

    /// Wire the services over any store/notifier implementations. Used with
    /// the in-memory backends in tests.
    pub fn with_store(store: Arc<dyn ApplicationStore>, notifier: Arc<dyn Notifier>) -> Self {
        let application_service = ApplicationService::new(store.clone(), notifier);
        let job_service = JobService::new(store);
        Self {
            application_service,
            job_service,
        }
    }
}
