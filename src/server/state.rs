//! Shared application state: the long-lived collaborator handles and the
//! process configuration, built once at startup and cloned cheaply (every
//! field is an `Arc`) into each request handler.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::pipeline::Collaborators;
use crate::providers::{create_object_store, create_ocr_backend};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub collaborators: Arc<Collaborators>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let object_store = Arc::from(create_object_store(&config.storage)?);
        let ocr = Arc::from(create_ocr_backend());

        Ok(Self {
            config: Arc::new(config),
            collaborators: Arc::new(Collaborators { object_store, ocr }),
        })
    }

    /// Readiness is trivial here: once constructed, every collaborator
    /// handle is already live (object store/OCR backend selection never
    /// blocks on a remote call).
    pub fn is_ready(&self) -> bool {
        true
    }
}
