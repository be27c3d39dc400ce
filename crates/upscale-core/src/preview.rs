//! Preview resources.
//!
//! A preview is a revocable reference to a selected file that a front end can
//! render before the file is uploaded. The session owns exactly one live
//! handle at a time and revokes it on replacement, reset and drop.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use crate::models::SelectedFile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewHandle {
    pub id: Uuid,
    pub url: String,
}

/// Allocates and releases preview handles.
pub trait PreviewStore: Send {
    fn create(&mut self, file: &SelectedFile) -> PreviewHandle;

    /// Release a handle. Revoking an unknown handle is a no-op.
    fn revoke(&mut self, handle: &PreviewHandle);
}

/// In-process registry mapping `preview://<uuid>` URLs to local paths.
#[derive(Debug, Default)]
pub struct LocalPreviewStore {
    live: HashMap<Uuid, PathBuf>,
}

impl LocalPreviewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreviewStore for LocalPreviewStore {
    fn create(&mut self, file: &SelectedFile) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.live.insert(id, file.path.clone());
        tracing::debug!(preview_id = %id, file = %file.file_name, "Preview created");
        PreviewHandle {
            id,
            url: format!("preview://{}", id),
        }
    }

    fn revoke(&mut self, handle: &PreviewHandle) {
        if self.live.remove(&handle.id).is_some() {
            tracing::debug!(preview_id = %handle.id, "Preview revoked");
        }
    }
}
