use crate::accounts::{AccountStore, PgAccountStore};
use crate::config::AppConfig;
use crate::db;
use crate::mail::{Mailer, SmtpMailer};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn AccountStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = db::connect(&config.database_url).await?;
        db::migrate(&pool).await?;

        let store = Arc::new(PgAccountStore::new(pool)) as Arc<dyn AccountStore>;
        let mailer = Arc::new(SmtpMailer::new(&config.smtp)?) as Arc<dyn Mailer>;

        Ok(Self::from_parts(config, store, mailer))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            store,
            mailer,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::accounts::memory::InMemoryAccountStore;
        use crate::mail::testing::RecordingMailer;

        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(RecordingMailer::new()),
        )
    }
}
