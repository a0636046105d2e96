//! Remote-first reads with last-known-good fallback, through the
//! repositories.

mod common;

use chrono::Duration;
use pretty_assertions::assert_eq;

use common::{fixture, fixture_with, start};
use pawtrack::cache::Source;
use pawtrack::clock::Clock;
use pawtrack::config::TrackingConfig;
use pawtrack::domain::{
    CareCategory, CareInstruction, HealthEntry, HealthRecordKind, PetId, TrackableRecord,
};
use pawtrack::error::TrackingError;
use pawtrack::remote::RemoteError;

fn health(pet: &str, kind: HealthRecordKind, title: &str) -> TrackableRecord<HealthEntry> {
    TrackableRecord::new_at(
        PetId::new(pet),
        HealthEntry {
            kind,
            title: title.to_string(),
            notes: None,
            recorded_on: start() - Duration::days(30),
            veterinarian: Some("Dr. Okafor".to_string()),
            next_due: None,
        },
        start(),
    )
}

mod fallback {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_remote_failure_serves_cached_pet_list() {
        let f = fixture();
        let pet = PetId::new("P2");
        for title in ["Rabies", "Distemper", "Annual checkup"] {
            f.services
                .health
                .create(health("P2", HealthRecordKind::Vaccination, title))
                .await
                .unwrap();
        }
        let live = f.services.health.list_for_pet(&pet).await.unwrap();
        assert_eq!(live.len(), 3);

        f.health.set_offline(true);
        let fetched = f.services.health.list_for_pet_with_source(&pet).await.unwrap();
        assert_eq!(fetched.value, live);
        assert!(matches!(fetched.source, Source::Cache { .. }));

        let plain = f.services.health.list_for_pet(&pet).await.unwrap();
        assert_eq!(plain, live);
    }

    #[tokio::test]
    async fn test_remote_success_refreshes_cache() {
        let f = fixture();
        let pet = PetId::new("P3");
        let created = f
            .services
            .health
            .create(health("P3", HealthRecordKind::Checkup, "Weigh-in"))
            .await
            .unwrap();
        f.services.health.list_for_pet(&pet).await.unwrap();

        let mut changed = created.clone();
        changed.payload.notes = Some("Lost 200g".to_string());
        f.health.seed(changed.clone());

        let live = f.services.health.list_for_pet_with_source(&pet).await.unwrap();
        assert_eq!(live.source, Source::Remote);
        assert_eq!(live.value, vec![changed.clone()]);

        f.health.set_offline(true);
        assert_eq!(f.services.health.list_for_pet(&pet).await.unwrap(), vec![changed]);
    }

    #[tokio::test]
    async fn test_failure_with_empty_cache_returns_original_error() {
        let f = fixture();
        let pet = PetId::new("P9");
        f.services.health.list_for_pet(&pet).await.unwrap();

        f.health.fail_next(RemoteError::Rejected {
            status: 500,
            message: "internal".to_string(),
        });
        let err = f.services.health.list_for_pet(&pet).await.unwrap_err();
        assert_eq!(
            err.remote(),
            Some(&RemoteError::Rejected {
                status: 500,
                message: "internal".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_never_cached_scope_fails_with_remote_error() {
        let f = fixture();
        f.health.set_offline(true);
        let err = f
            .services
            .health
            .list_for_pet(&PetId::new("P4"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrackingError::Remote(RemoteError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_cache_timestamp_reflects_last_success() {
        let f = fixture();
        let pet = PetId::new("P5");
        f.services
            .care
            .create(TrackableRecord::new_at(
                pet.clone(),
                CareInstruction {
                    category: CareCategory::Exercise,
                    title: "Fetch".to_string(),
                    content: "Twice a day".to_string(),
                },
                start(),
            ))
            .await
            .unwrap();
        f.services.care.list_for_pet(&pet).await.unwrap();
        let fetched_at = f.clock.now();

        f.clock.advance(Duration::hours(6));
        f.care.set_offline(true);
        let stale = f.services.care.list_for_pet_with_source(&pet).await.unwrap();
        assert_eq!(stale.source, Source::Cache { stored_at: fetched_at });
    }
}

mod authoritative {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_remote_not_found_is_not_papered_over() {
        let f = fixture();
        let created = f
            .services
            .health
            .create(health("P1", HealthRecordKind::Surgery, "Spay"))
            .await
            .unwrap();
        let id = created.id.unwrap();
        f.services.health.get(id).await.unwrap();

        f.health.fail_next(RemoteError::NotFound {
            resource: format!("health {id}"),
        });
        assert!(f.services.health.get(id).await.unwrap_err().is_not_found());

        f.health.set_offline(true);
        let err = f.services.health.get(id).await.unwrap_err();
        assert!(err.remote().is_some());
    }
}

mod configuration {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_disabled_cache_never_falls_back() {
        let mut config = TrackingConfig::default();
        config.cache.enabled = false;
        let f = fixture_with(config);
        let pet = PetId::new("P1");
        f.services
            .health
            .create(health("P1", HealthRecordKind::Medication, "Antibiotics"))
            .await
            .unwrap();
        f.services.health.list_for_pet(&pet).await.unwrap();

        f.health.set_offline(true);
        assert!(f.services.health.list_for_pet(&pet).await.is_err());
    }

    #[tokio::test]
    async fn test_clear_drops_every_cached_scope() {
        let f = fixture();
        let pet = PetId::new("P1");
        f.services
            .health
            .create(health("P1", HealthRecordKind::Checkup, "Teeth"))
            .await
            .unwrap();
        f.services.health.list_for_pet(&pet).await.unwrap();

        assert!(f.services.cache.clear().await.unwrap() >= 2);
        f.health.set_offline(true);
        assert!(f.services.health.list_for_pet(&pet).await.is_err());
        assert!(!f.backend.is_empty());
    }
}
