//! Care instruction queries.

use crate::domain::{CareCategory, CareInstruction, PetId, TrackableRecord};
use crate::error::Result;
use crate::repository::CareRepository;

impl CareRepository {
    /// Instructions of `pet_id` in one category, in identity order.
    pub async fn list_by_category(
        &self,
        pet_id: &PetId,
        category: CareCategory,
    ) -> Result<Vec<TrackableRecord<CareInstruction>>> {
        let mut records = self.list_for_pet(pet_id).await?;
        records.retain(|record| record.payload.category == category);
        Ok(records)
    }
}
