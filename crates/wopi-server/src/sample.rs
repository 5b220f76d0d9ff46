//! The seed document written at start-up and by `/api/reset-sample`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{ServerError, ServerResult};

/// A minimal Word document (zip container with a mimetype entry).
const SAMPLE_DOCX_BASE64: &str = "UEsDBBQAAAAIAJySrVHHW+cgBAAAAAQAAAAIAAAAbWltZXR5cGVhcHBsaWNhdGlvbi92bmQub3BlbnhtbGZvcm1hdHMtb2ZmaWNlZG9jdW1lbnQud29yZHByb2Nlc3NpbmdtbC5kb2N1bWVudFBLBQYAAAAAAQABAD4AAAA0AAAAAAA=";

pub fn sample_docx() -> ServerResult<Vec<u8>> {
    STANDARD
        .decode(SAMPLE_DOCX_BASE64)
        .map_err(|e| ServerError::Internal(format!("sample document is corrupt: {e}")))
}
