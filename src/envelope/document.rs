//! The fixed document offered for signature
//!
//! The asset is read once at startup. It is not user supplied, so a missing
//! or empty file is a configuration error rather than a request failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::builder::EnvelopeTemplate;
use crate::types::{GatewayError, Result};

/// Document bytes shared by every submission
#[derive(Debug, Clone)]
pub struct DocumentAsset {
    path: PathBuf,
    bytes: Arc<[u8]>,
}

impl DocumentAsset {
    /// Read the document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            GatewayError::Config(format!("Cannot read document {}: {}", path.display(), e))
        })?;

        if bytes.is_empty() {
            return Err(GatewayError::Config(format!(
                "Document {} is empty",
                path.display()
            )));
        }

        info!(path = %path.display(), size = bytes.len(), "Loaded signable document");
        Ok(Self::from_bytes(path, bytes))
    }

    pub fn from_bytes(path: impl Into<PathBuf>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log when the anchor count does not match the template
    pub fn audit_anchor(&self, template: &EnvelopeTemplate) -> bool {
        let check = template.check_anchor(&self.bytes);
        if !check.is_satisfied() {
            warn!(
                path = %self.path.display(),
                anchor = %template.anchor.anchor_string,
                expected = check.expected,
                found = check.found,
                "Anchor occurrence count differs from template; signature placement may be wrong"
            );
        }
        check.is_satisfied()
    }
}
