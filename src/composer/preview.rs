//! Preview handles for image-like attachments.
//!
//! Every stored image gets a `blob:quill/<uuid>` handle that the attachment
//! bar uses as its display key. Handles are tracked here until revoked so
//! tests can assert nothing leaks across clear/replace/reset.

use std::collections::HashSet;

use log::debug;

const PREVIEW_SCHEME: &str = "blob:quill/";

#[derive(Debug, Default)]
pub struct PreviewRegistry {
    live: HashSet<String>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a fresh handle and marks it live.
    pub fn create(&mut self) -> String {
        let uri = format!("{PREVIEW_SCHEME}{}", uuid::Uuid::new_v4());
        self.live.insert(uri.clone());
        debug!("Preview created: {uri}");
        uri
    }

    /// Releases a handle. Returns false if it was not live.
    pub fn revoke(&mut self, uri: &str) -> bool {
        let removed = self.live.remove(uri);
        if removed {
            debug!("Preview revoked: {uri}");
        }
        removed
    }

    pub fn is_live(&self, uri: &str) -> bool {
        self.live.contains(uri)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
