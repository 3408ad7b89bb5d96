use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{CollectionKey, Role},
    protocol::{CandidateEntity, ChangeEntry, GalleryQuery, Page, PageRequest, SessionInfo},
};

pub mod cdn;
pub mod commit;
pub mod debounce;
pub mod drag;
pub mod error;
pub mod gallery;
pub mod http;
pub mod screen;
pub mod source;
pub mod store;

pub use cdn::{CdnImageResolver, ImageUrlResolver, PassthroughResolver};
pub use error::{CurationError, SourceKind};
pub use gallery::GalleryFeed;
pub use http::HttpCurationApi;
pub use screen::{CurationEvent, CurationScreen, SaveOutcome, ScreenView};

const DEFAULT_PAGE_SIZE: u32 = 12;
const DEFAULT_SUCCESS_NOTICE: Duration = Duration::from_secs(3);
const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Remote authority for curated collections and the public gallery listing.
#[async_trait]
pub trait CurationApi: Send + Sync {
    async fn fetch_candidates(
        &self,
        collection: &CollectionKey,
        page: PageRequest,
    ) -> Result<Page<CandidateEntity>>;
    async fn fetch_current_selection(
        &self,
        collection: &CollectionKey,
        page: PageRequest,
    ) -> Result<Page<CandidateEntity>>;
    /// Applies the whole change set; the server is expected to apply it all-or-nothing.
    async fn commit_selection(
        &self,
        collection: &CollectionKey,
        changes: &[ChangeEntry],
    ) -> Result<()>;
    async fn fetch_gallery(
        &self,
        query: &GalleryQuery,
        page: PageRequest,
    ) -> Result<Page<CandidateEntity>>;
}

/// Resolves the caller's credential into a role.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session(&self) -> Result<SessionInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurationConfig {
    pub page_size: u32,
    pub success_notice: Duration,
    pub search_debounce: Duration,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            success_notice: DEFAULT_SUCCESS_NOTICE,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}

/// Who is driving a screen. Passed in explicitly rather than read from a global session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurationAccess {
    pub role: Role,
}

impl CurationAccess {
    pub fn new(role: Role) -> Self {
        Self { role }
    }

    pub fn from_session(session: &SessionInfo) -> Self {
        Self::new(session.role)
    }

    pub fn can_edit(&self) -> bool {
        self.role.can_curate()
    }
}

#[cfg(test)]
#[path = "tests/fake_api.rs"]
mod fake_api;
