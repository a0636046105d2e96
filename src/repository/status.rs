//! Status update operations.
//!
//! Media and comments are appended under the entity lock, so concurrent
//! appends to one update never lose each other.

use tracing::instrument;

use crate::domain::{Comment, MediaItem, RecordId, StatusUpdate, TrackableRecord};
use crate::error::Result;
use crate::repository::StatusRepository;

impl StatusRepository {
    /// Attaches a media item.
    #[instrument(skip(self, item), fields(id = id.get()))]
    pub async fn add_media(&self, id: RecordId, item: MediaItem) -> Result<TrackableRecord<StatusUpdate>> {
        self.update(id, move |status| status.media.push(item)).await
    }

    /// Appends a comment.
    #[instrument(skip(self, comment), fields(id = id.get()))]
    pub async fn add_comment(&self, id: RecordId, comment: Comment) -> Result<TrackableRecord<StatusUpdate>> {
        self.update(id, move |status| status.comments.push(comment)).await
    }
}
