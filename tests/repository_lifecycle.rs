//! Status, health and care repositories end to end.

mod common;

use chrono::Duration;
use pretty_assertions::assert_eq;

use common::{fixture, start};
use pawtrack::domain::{
    CareCategory, CareInstruction, Comment, HealthEntry, HealthRecordKind, MediaItem, Mood,
    PetId, StatusUpdate, TrackableRecord,
};
use pawtrack::error::TrackingError;
use pawtrack::jobs::JobExecutor;
use pawtrack::remote::RemoteError;

mod status {
    use super::*;
    use pretty_assertions::assert_eq;

    fn status_draft() -> TrackableRecord<StatusUpdate> {
        TrackableRecord::new_at(
            PetId::new("P1"),
            StatusUpdate::new(Mood::Playful, "First day home"),
            start(),
        )
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let f = fixture();
        let created = f.services.status.create(status_draft()).await.unwrap();
        let id = created.id.unwrap();

        let mut tasks = Vec::new();
        for n in 0..8 {
            let repo = f.services.status.clone();
            tasks.push(tokio::spawn(async move {
                if n % 2 == 0 {
                    repo.add_comment(id, Comment::new("adopter", format!("note {n}")))
                        .await
                        .map(|_| ())
                } else {
                    repo.add_media(id, MediaItem::new(format!("https://img.example/{n}.jpg")))
                        .await
                        .map(|_| ())
                }
            }));
        }
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let stored = f.services.status.local(id).await.unwrap().unwrap();
        assert_eq!(stored.payload.comments.len(), 4);
        assert_eq!(stored.payload.media.len(), 4);
        let remote = f.status.snapshot(id).unwrap();
        assert_eq!(remote.payload, stored.payload);
    }

    #[tokio::test]
    async fn test_append_to_deleted_update_is_not_found() {
        let f = fixture();
        let created = f.services.status.create(status_draft()).await.unwrap();
        let id = created.id.unwrap();
        f.services.status.delete(id).await.unwrap();

        let err = f
            .services
            .status
            .add_comment(id, Comment::new("adopter", "still there?"))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_status_updates_never_schedule_jobs() {
        let f = fixture();
        f.services.status.create(status_draft()).await.unwrap();
        assert!(f.executor.active_jobs().await.is_empty());
    }
}

mod health {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(kind: HealthRecordKind, title: &str, next_due: Option<i64>) -> TrackableRecord<HealthEntry> {
        TrackableRecord::new_at(
            PetId::new("P2"),
            HealthEntry {
                kind,
                title: title.to_string(),
                notes: None,
                recorded_on: start() - Duration::days(365),
                veterinarian: None,
                next_due: next_due.map(|days| start() + Duration::days(days)),
            },
            start(),
        )
    }

    #[tokio::test]
    async fn test_list_by_kind_filters() {
        let f = fixture();
        let pet = PetId::new("P2");
        f.services
            .health
            .create(entry(HealthRecordKind::Vaccination, "Rabies", None))
            .await
            .unwrap();
        f.services
            .health
            .create(entry(HealthRecordKind::VetVisit, "Limp", None))
            .await
            .unwrap();

        let vaccinations = f
            .services
            .health
            .list_by_kind(&pet, HealthRecordKind::Vaccination)
            .await
            .unwrap();
        assert_eq!(vaccinations.len(), 1);
        assert_eq!(vaccinations[0].payload.title, "Rabies");
    }

    #[tokio::test]
    async fn test_due_for_follow_up_orders_most_overdue_first() {
        let f = fixture();
        let pet = PetId::new("P2");
        for (title, due) in [("Booster", Some(-3)), ("Dental", Some(-10)), ("Annual", Some(30)), ("Chip", None)] {
            f.services
                .health
                .create(entry(HealthRecordKind::Checkup, title, due))
                .await
                .unwrap();
        }

        let due: Vec<String> = f
            .services
            .health
            .due_for_follow_up(&pet)
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.payload.title)
            .collect();
        assert_eq!(due, vec!["Dental".to_string(), "Booster".to_string()]);
    }
}

mod care {
    use super::*;
    use pretty_assertions::assert_eq;

    fn instruction(category: CareCategory, title: &str) -> TrackableRecord<CareInstruction> {
        TrackableRecord::new_at(
            PetId::new("P3"),
            CareInstruction {
                category,
                title: title.to_string(),
                content: String::new(),
            },
            start(),
        )
    }

    #[tokio::test]
    async fn test_list_by_category_falls_back_to_cache() {
        let f = fixture();
        let pet = PetId::new("P3");
        f.services
            .care
            .create(instruction(CareCategory::Feeding, "Breakfast"))
            .await
            .unwrap();
        f.services
            .care
            .create(instruction(CareCategory::Training, "Sit"))
            .await
            .unwrap();
        f.services.care.list_for_pet(&pet).await.unwrap();

        f.care.set_offline(true);
        let feeding = f
            .services
            .care
            .list_by_category(&pet, CareCategory::Feeding)
            .await
            .unwrap();
        assert_eq!(feeding.len(), 1);
    }

    #[tokio::test]
    async fn test_created_records_join_a_cached_pet_list() {
        let f = fixture();
        let pet = PetId::new("P3");
        f.services
            .care
            .create(instruction(CareCategory::Feeding, "Breakfast"))
            .await
            .unwrap();
        f.services.care.list_for_pet(&pet).await.unwrap();
        f.services
            .care
            .create(instruction(CareCategory::Grooming, "Brush"))
            .await
            .unwrap();

        f.care.set_offline(true);
        let cached = f.services.care.list_for_pet(&pet).await.unwrap();
        assert_eq!(cached.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_of_unknown_record_succeeds() {
        let f = fixture();
        let id = pawtrack::RecordId::new(99).unwrap();
        f.services.care.delete(id).await.unwrap();

        f.care.fail_next(RemoteError::Timeout);
        assert!(f.services.care.delete(id).await.is_err());
    }
}
