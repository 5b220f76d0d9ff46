use std::sync::Arc;

use tokio::net::TcpListener;
use wopi_crypto::AccessTokenSigner;
use wopi_lock::{LockCoordinator, LockTable};
use wopi_store::{DocumentStore, FsDocumentStore, InMemoryDocumentStore};
use wopi_types::DocumentId;

use crate::auth::{AllowAllVerifier, CredentialVerifier, SignedTokenVerifier};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::sample::sample_docx;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: LockCoordinator,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub signer: AccessTokenSigner,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// The configured sample document id, if any.
    pub fn sample_id(&self) -> ServerResult<Option<DocumentId>> {
        self.config
            .sample_document
            .as_deref()
            .map(DocumentId::new)
            .transpose()
            .map_err(|e| ServerError::Config(format!("sample_document: {e}")))
    }
}

/// WOPI host server.
pub struct WopiServer {
    state: AppState,
}

impl WopiServer {
    /// Build a server over the store named by `config.files_dir`, or an
    /// in-memory store when none is configured.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store: Arc<dyn DocumentStore> = match &config.files_dir {
            Some(dir) => Arc::new(FsDocumentStore::open(dir)?),
            None => Arc::new(InMemoryDocumentStore::new()),
        };
        Self::with_store(config, store)
    }

    pub fn with_store(config: ServerConfig, store: Arc<dyn DocumentStore>) -> ServerResult<Self> {
        let secret = match &config.auth.secret {
            Some(secret) => secret.clone(),
            None => {
                tracing::warn!("no access-token secret configured, generated one for this process");
                AccessTokenSigner::generate_secret()
            }
        };
        let signer =
            AccessTokenSigner::new(secret).map_err(|e| ServerError::Config(format!("auth.secret: {e}")))?;

        let verifier: Arc<dyn CredentialVerifier> = if config.auth.allow_all {
            tracing::warn!("access-token checks are disabled");
            Arc::new(AllowAllVerifier)
        } else {
            Arc::new(SignedTokenVerifier::new(signer.clone(), config.auth.user_id.clone()))
        };
        if config.admin_enabled() {
            tracing::warn!("unauthenticated admin endpoints are mounted under /api");
        }

        let coordinator = LockCoordinator::new(Arc::new(LockTable::new()), store)
            .with_matcher(config.locks.matcher());

        let state = AppState {
            coordinator,
            verifier,
            signer,
            config: Arc::new(config),
        };
        seed_sample(&state)?;
        Ok(Self { state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let addr = self.state.config.bind_addr;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, public_base = %self.state.config.public_base, "WOPI host listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

fn seed_sample(state: &AppState) -> ServerResult<()> {
    let Some(id) = state.sample_id()? else {
        return Ok(());
    };
    let store = state.coordinator.store();
    if !store.exists(&id)? {
        let version = store.write(&id, &sample_docx()?)?;
        tracing::info!(document = %id, %version, "seeded sample document");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.auth.secret = Some("test-secret".into());
        config
    }

    #[test]
    fn seeds_sample_document() {
        let server = WopiServer::new(config()).unwrap();
        let id = DocumentId::new("sample.docx").unwrap();
        let stored = server.state().coordinator.store().read(&id).unwrap().unwrap();
        assert_eq!(stored, sample_docx().unwrap());
    }

    #[test]
    fn keeps_existing_sample_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sample.docx"), b"edited").unwrap();

        let mut config = config();
        config.files_dir = Some(dir.path().to_path_buf());
        let server = WopiServer::new(config).unwrap();

        let id = DocumentId::new("sample.docx").unwrap();
        let stored = server.state().coordinator.store().read(&id).unwrap().unwrap();
        assert_eq!(stored, b"edited");
    }

    #[test]
    fn no_sample_when_disabled() {
        let mut config = config();
        config.sample_document = None;
        let server = WopiServer::new(config).unwrap();
        assert!(server.state().coordinator.store().list().unwrap().is_empty());
    }

    #[test]
    fn invalid_sample_name_is_config_error() {
        let mut config = config();
        config.sample_document = Some("../escape".into());
        assert!(matches!(WopiServer::new(config), Err(ServerError::Config(_))));
    }

    #[test]
    fn generates_secret_when_missing() {
        let server = WopiServer::new(ServerConfig::default()).unwrap();
        let id = DocumentId::new("sample.docx").unwrap();
        let token = server.state().signer.issue(&id, "test-user");
        assert!(server.state().signer.verify(&token, &id, "test-user"));
    }

    #[test]
    fn router_builds() {
        let server = WopiServer::new(config()).unwrap();
        let _router = server.router();
    }
}
