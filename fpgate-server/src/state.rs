use std::{fmt, sync::Arc};

use anyhow::Context;
use fpgate_core::{
    EnvSecretSource, InMemoryFingerprintRegistry, SecretSource,
    SessionTokenCodec,
};

use crate::config::{Config, SESSION_SECRET_ENV};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<InMemoryFingerprintRegistry>,
    pub sessions: SessionTokenCodec,
    pub http: reqwest::Client,
}

impl AppState {
    /// Production wiring: session secret sourced from the environment on
    /// every request.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_secret_source(
            config,
            Arc::new(EnvSecretSource::new(SESSION_SECRET_ENV)),
        )
    }

    /// Wiring with an explicit secret source; tests inject a static one.
    pub fn with_secret_source(
        config: Config,
        secrets: Arc<dyn SecretSource>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.relay_timeout)
            .build()
            .context("failed to build outbound HTTP client")?;

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(InMemoryFingerprintRegistry::new()),
            sessions: SessionTokenCodec::new(secrets),
            http,
        })
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
