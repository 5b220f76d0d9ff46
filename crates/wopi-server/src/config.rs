use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;
use wopi_types::{DocumentId, ExactMatch, StructuredIdentity, TokenMatcher};

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_EDITOR_URL: &str =
    "https://word-edit.officeapps.live.com/we/wordeditorframe.aspx";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Base URL editors use to reach this host; embedded in `WOPISrc`.
    pub public_base: String,
    /// Document directory. `None` keeps documents in memory.
    pub files_dir: Option<PathBuf>,
    /// Document seeded at start-up when missing.
    pub sample_document: Option<String>,
    pub editor_url: String,
    pub max_upload_bytes: usize,
    /// Mount the unauthenticated `/api/*` convenience endpoints.
    pub admin_api: bool,
    pub auth: AuthConfig,
    pub locks: LockConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            public_base: "http://localhost:8080".into(),
            files_dir: None,
            sample_document: Some("sample.docx".into()),
            editor_url: DEFAULT_EDITOR_URL.into(),
            max_upload_bytes: 50 * 1024 * 1024,
            admin_api: false,
            auth: AuthConfig::default(),
            locks: LockConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Whether the `/api/*` convenience endpoints are served. A host
    /// that already skips token checks gets them too.
    pub fn admin_enabled(&self) -> bool {
        self.admin_api || self.auth.allow_all
    }

    /// Apply `PORT`, `PUBLIC_BASE`, `WOPI_SECRET`, `WOPI_FILES_DIR` and
    /// `WOPI_ADMIN_API` from the process environment.
    pub fn apply_env(&mut self) -> ServerResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup, using the environment names.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ServerResult<()> {
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ServerError::Config(format!("PORT is not a port number: {port:?}")))?;
            self.bind_addr.set_port(port);
        }
        if let Some(base) = lookup("PUBLIC_BASE") {
            self.public_base = base;
        }
        if let Some(secret) = lookup("WOPI_SECRET") {
            self.auth.secret = Some(secret);
        }
        if let Some(dir) = lookup("WOPI_FILES_DIR") {
            self.files_dir = Some(PathBuf::from(dir));
        }
        if let Some(flag) = lookup("WOPI_ADMIN_API") {
            self.admin_api = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(ServerError::Config(format!(
                        "WOPI_ADMIN_API is not a boolean: {flag:?}"
                    )))
                }
            };
        }
        Ok(())
    }

    /// The `WOPISrc` an editor uses to reach `id` on this host.
    pub fn wopi_src(&self, id: &DocumentId) -> ServerResult<Url> {
        let mut url = Url::parse(&self.public_base)
            .map_err(|e| ServerError::Config(format!("public_base {:?}: {e}", self.public_base)))?;
        url.path_segments_mut()
            .map_err(|_| ServerError::Config(format!("public_base {:?} cannot be a base", self.public_base)))?
            .pop_if_empty()
            .extend(["wopi", "files", id.as_str()]);
        Ok(url)
    }

    /// The editor frame URL that opens `id` with `access_token`.
    pub fn editor_launch_url(&self, id: &DocumentId, access_token: &str) -> ServerResult<Url> {
        let src = self.wopi_src(id)?;
        Url::parse_with_params(
            &self.editor_url,
            &[
                ("WOPISrc", src.as_str()),
                ("access_token", access_token),
                ("ui", "en-US"),
                ("rs", "en-US"),
            ],
        )
        .map_err(|e| ServerError::Config(format!("editor_url {:?}: {e}", self.editor_url)))
    }
}

/// Access-token settings and the identity reported to editors.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC key for access tokens. Generated at start-up when unset.
    pub secret: Option<String>,
    pub user_id: String,
    pub user_name: String,
    pub owner_id: String,
    /// Skip access-token checks entirely.
    pub allow_all: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            user_id: "test-user".into(),
            user_name: "Test User".into(),
            owner_id: "test-owner".into(),
            allow_all: false,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .field("user_name", &self.user_name)
            .field("owner_id", &self.owner_id)
            .field("allow_all", &self.allow_all)
            .finish()
    }
}

/// How lock tokens are compared.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Fields of a structured token that identify the editing session.
    pub identity_fields: Vec<String>,
    /// Compare raw token text only.
    pub exact: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            identity_fields: vec![StructuredIdentity::DEFAULT_FIELD.to_string()],
            exact: false,
        }
    }
}

impl LockConfig {
    pub fn matcher(&self) -> Arc<dyn TokenMatcher> {
        if self.exact {
            Arc::new(ExactMatch)
        } else {
            Arc::new(StructuredIdentity::new(self.identity_fields.iter().cloned()))
        }
    }
}
