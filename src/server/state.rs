use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::notification::TransitionNotifier;
use crate::postgres::PostgresPool;
use crate::push::create_push_sender;
use crate::store::create_stores;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub notifier: Arc<TransitionNotifier>,
    pub postgres_pool: Option<PostgresPool>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        settings: Settings,
        notifier: Arc<TransitionNotifier>,
        postgres_pool: Option<PostgresPool>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            notifier,
            postgres_pool,
            start_time: Instant::now(),
        }
    }

    /// Build the process-wide state: database pool (when configured), stores,
    /// push sender and the notifier that ties them together.
    pub async fn from_settings(settings: Settings) -> Self {
        let postgres_pool = match (settings.store.backend.as_str(), &settings.database) {
            ("postgres", Some(database)) => match PostgresPool::new(database).await {
                Ok(pool) => Some(pool),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    None
                }
            },
            _ => None,
        };

        let stores = create_stores(
            &settings.store,
            postgres_pool.as_ref().map(|p| p.pool().clone()),
        );
        let push = create_push_sender(&settings.push);
        let notifier = Arc::new(TransitionNotifier::new(stores, push));

        Self::new(settings, notifier, postgres_pool)
    }
}
