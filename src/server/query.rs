//! Async facade for historical log queries
//!
//! Segment listing and pagination do blocking disk reads; this wrapper runs
//! them on the blocking pool so a large page fetch never sits on a runtime
//! worker next to the live broadcast path.

use crate::pager::{PageResult, Paginator};
use crate::store::{RotationStore, SegmentMeta, StoreError};
use std::io;
use std::path::Path;

#[derive(Clone)]
pub struct QueryService {
    store: RotationStore,
    paginator: Paginator,
}

impl QueryService {
    pub fn new(log_dir: impl AsRef<Path>) -> Self {
        let store = RotationStore::new(log_dir.as_ref());
        let paginator = Paginator::new(store.clone());
        QueryService { store, paginator }
    }

    /// Enumerate segments, newest first
    pub async fn list_segments(&self) -> Result<Vec<SegmentMeta>, StoreError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.list_segments())
            .await
            .map_err(join_error)?
    }

    /// Fetch one page of a segment
    pub async fn paginate(
        &self,
        name: &str,
        page: usize,
        page_size: usize,
    ) -> Result<PageResult, StoreError> {
        let paginator = self.paginator.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || paginator.paginate(&name, page, page_size))
            .await
            .map_err(join_error)?
    }
}

fn join_error(e: tokio::task::JoinError) -> StoreError {
    StoreError::Io(io::Error::new(io::ErrorKind::Other, e))
}
