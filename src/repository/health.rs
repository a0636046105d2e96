//! Health record queries.

use crate::domain::{HealthEntry, HealthRecordKind, PetId, TrackableRecord};
use crate::error::Result;
use crate::repository::HealthRepository;

impl HealthRepository {
    /// Records of `pet_id` of one kind, in identity order.
    pub async fn list_by_kind(
        &self,
        pet_id: &PetId,
        kind: HealthRecordKind,
    ) -> Result<Vec<TrackableRecord<HealthEntry>>> {
        let mut records = self.list_for_pet(pet_id).await?;
        records.retain(|record| record.payload.kind == kind);
        Ok(records)
    }

    /// Records of `pet_id` whose follow-up date has arrived, most overdue
    /// first.
    pub async fn due_for_follow_up(&self, pet_id: &PetId) -> Result<Vec<TrackableRecord<HealthEntry>>> {
        let now = self.now();
        let mut due = self.list_for_pet(pet_id).await?;
        due.retain(|record| record.payload.next_due.is_some_and(|next| next <= now));
        due.sort_by_key(|record| record.payload.next_due);
        Ok(due)
    }
}
