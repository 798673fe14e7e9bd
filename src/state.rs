use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, LocationService, Mailer, SeaOrmAuthService, SeaOrmLocationService, TokenIssuer,
    mailer,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub tokens: Arc<TokenIssuer>,

    pub mailer: Arc<dyn Mailer>,

    pub auth_service: Arc<dyn AuthService>,

    pub location_service: Arc<dyn LocationService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let mailer = mailer::from_config(&config.email);
        Self::with_mailer(config, mailer).await
    }

    /// Builds the state around a caller-supplied mailer (tests capture mail this way).
    pub async fn with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        config.validate()?;

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let config = Arc::new(config);
        let tokens = Arc::new(TokenIssuer::from_config(&config.auth));

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.clone(),
            tokens.clone(),
            mailer.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        let location_service = Arc::new(SeaOrmLocationService::new(store.clone()))
            as Arc<dyn LocationService + Send + Sync + 'static>;

        Ok(Self {
            config,
            store,
            tokens,
            mailer,
            auth_service,
            location_service,
        })
    }
}
