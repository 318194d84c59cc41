use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Parser;

use crate::kms::{HttpKms, InMemoryKms, KeyManagementService};
use crate::server::ServiceMode;

#[derive(Debug, Clone, Parser)]
#[clap(name = "kms-signer", about = "Casper deploy signing backed by a key management service")]
pub struct Config {
    #[clap(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,
    #[clap(long, env = "PORT", default_value = "4000")]
    pub port: u16,

    #[clap(long, env = "AWS_REGION")]
    pub aws_region: Option<String>,
    /// Overrides the regional endpoint derived from --aws-region.
    #[clap(long, env = "KMS_ENDPOINT")]
    pub kms_endpoint: Option<String>,

    #[clap(long, env = "DEV_MODE")]
    pub dev_mode: bool,
    /// `development` also turns on dev mode.
    #[clap(long, env = "NODE_ENV")]
    pub node_env: Option<String>,

    // Replaces the KMS with in-memory keys. Never in production.
    #[clap(long, env = "MOCK_TESTING_MODE")]
    pub mock_testing_mode: bool,
    #[clap(long, env = "MOCK_KMS_SEED", default_value = "mock-kms")]
    pub mock_seed: String,
}

impl Config {
    pub fn mode(&self) -> ServiceMode {
        ServiceMode {
            dev_mode: self.dev_mode || self.node_env.as_deref() == Some("development"),
            mock_testing_mode: self.mock_testing_mode,
        }
    }

    /// Backend selected by the flags.
    pub fn key_management_service(&self) -> Result<Arc<dyn KeyManagementService>> {
        if self.mock_testing_mode {
            if self.mode().dev_mode {
                tracing::warn!("DO NOT USE MOCK_TESTING_MODE IN PRODUCTION");
            }
            tracing::warn!("MOCK_TESTING_MODE ACTIVE");
            return Ok(Arc::new(InMemoryKms::new(self.mock_seed.clone())));
        }

        let kms = match (&self.kms_endpoint, &self.aws_region) {
            (Some(endpoint), _) => HttpKms::new(endpoint.clone()),
            (None, Some(region)) => HttpKms::for_region(region),
            (None, None) => bail!("either --kms-endpoint or --aws-region is required outside mock testing mode"),
        };
        tracing::info!(endpoint = kms.endpoint(), "using remote key management service");
        Ok(Arc::new(kms))
    }
}
