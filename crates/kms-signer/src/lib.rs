pub mod codec;
pub mod config;
pub mod deploy;
pub mod error;
pub mod keys;
pub mod kms;
pub mod server;

pub use config::Config;
pub use error::SignerServerError;
pub use keys::KeysService;
pub use kms::{HttpKms, InMemoryKms, KeyManagementService};
pub use server::{AppState, ServiceMode, router, run, serve};
