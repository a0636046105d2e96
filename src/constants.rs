//! Key formats and default values shared across the crate.

/// Suffix appended to a record kind to build the bulk-cancellation tag.
///
/// A reminder with identity `5` is scheduled under key `reminder:5` and
/// tagged `reminder-tag:5`.
pub const JOB_TAG_SUFFIX: &str = "-tag";

/// Storage key prefix for persisted records: `record:{kind}:{id}`.
pub const RECORD_KEY_PREFIX: &str = "record";

/// Storage key prefix for identity sequences: `seq:{kind}`.
pub const SEQUENCE_KEY_PREFIX: &str = "seq";

/// Default storage namespace for cache entries.
pub const DEFAULT_CACHE_NAMESPACE: &str = "cache";

/// Default notification title when a reminder has an empty title.
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Pet care reminder";

/// Prefix for environment variables read by
/// [`TrackingConfig::from_env`](crate::config::TrackingConfig::from_env).
pub const ENV_PREFIX: &str = "PAWTRACK_";
