//! Publication controller and notification fanout.
//!
//! Each publish moves a schedule record one step along
//! draft(0) -> published(1) -> republished(2) -> ... in place, via a
//! conditional write keyed on the version that was read. First publishes go
//! to reviewers only; republishes go to everyone.

use crate::db::{DbUser, NewNotification, ScheduleStore, UserRole};
use crate::scheduler::ScheduleError;
use chrono::Utc;
use tracing::{info, warn};

/// What a successful publish reports back to the caller.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub version: i64,
    pub recipients: usize,
}

/// Publishes the schedule with the given id.
///
/// The version bump and publish timestamp are committed atomically against
/// the version read at entry; a concurrent publisher surfaces as a retryable
/// [`ScheduleError::PublishConflict`] instead of a lost update. Notification
/// delivery is best-effort: a fanout failure is logged and never reverses the
/// already-committed publish.
pub fn publish_schedule(
    store: &ScheduleStore,
    schedule_id: &str,
) -> Result<PublishOutcome, ScheduleError> {
    let current = store
        .find_by_id(schedule_id)?
        .ok_or_else(|| ScheduleError::ScheduleNotFound(schedule_id.to_string()))?;

    publish_at_version(store, schedule_id, current.version, current.level)
}

/// The conditional half of a publish, keyed on the version the caller read.
/// Split out so the conflict path is reachable without a real interleaving.
fn publish_at_version(
    store: &ScheduleStore,
    schedule_id: &str,
    expected_version: i64,
    level: i64,
) -> Result<PublishOutcome, ScheduleError> {
    let new_version = expected_version + 1;
    let published_at = Utc::now();

    let rows = store.publish_schedule(schedule_id, expected_version, published_at)?;
    if rows == 0 {
        // The conditional write missed: either the row vanished or another
        // publisher bumped the version first.
        return if store.find_by_id(schedule_id)?.is_some() {
            Err(ScheduleError::PublishConflict {
                id: schedule_id.to_string(),
                expected: expected_version,
            })
        } else {
            Err(ScheduleError::ScheduleNotFound(schedule_id.to_string()))
        };
    }

    let recipients = select_recipients(store, new_version)?;
    let notifications = fan_out(&recipients, new_version, level);

    match store.insert_notifications(&notifications) {
        Ok(count) => {
            info!(
                schedule_id,
                version = new_version,
                recipients = count,
                "Schedule published, notifications sent"
            );
        }
        Err(e) => {
            // The publish is already committed; notification failure must not
            // undo it.
            warn!(
                schedule_id,
                version = new_version,
                error = %e,
                "Notification fanout failed after a committed publish"
            );
        }
    }

    Ok(PublishOutcome {
        version: new_version,
        recipients: recipients.len(),
    })
}

/// First-ever publish of a record goes to the reviewing roles only; every
/// later version goes to all users, students included.
fn select_recipients(store: &ScheduleStore, new_version: i64) -> Result<Vec<DbUser>, ScheduleError> {
    let recipients = if new_version == 1 {
        store.get_users(Some(&[UserRole::Scheduler, UserRole::LoadCommittee]))?
    } else {
        store.get_users(None)?
    };
    Ok(recipients)
}

/// Builds one notification per recipient for a publish of `version`.
fn fan_out(recipients: &[DbUser], version: i64, level: i64) -> Vec<NewNotification> {
    let message = if version == 1 {
        format!("Initial schedule for Level {level} has been published.")
    } else {
        format!("Updated schedule (v{version}) for Level {level} is now available.")
    };

    recipients
        .iter()
        .map(|user| NewNotification {
            user_id: user.user_id.clone(),
            title: format!("Schedule Version {version} Published"),
            message: message.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewSchedule;
    use serde_json::json;

    fn store_with_users() -> ScheduleStore {
        let store = ScheduleStore::open_in_memory();
        store.seed_user("u1", "Amal", UserRole::Scheduler);
        store.seed_user("u2", "Badr", UserRole::LoadCommittee);
        store.seed_user("u3", "Celine", UserRole::Faculty);
        store.seed_user("u4", "Dina", UserRole::Student);
        store
    }

    fn insert_draft(store: &ScheduleStore) -> String {
        store
            .insert_schedules(&[NewSchedule {
                level: 4,
                section: "Group 1".to_string(),
                grid: json!({ "Sunday": {} }),
            }])
            .unwrap()
            .remove(0)
    }

    #[test]
    fn first_publish_notifies_reviewers_only() {
        let store = store_with_users();
        let id = insert_draft(&store);

        let outcome = publish_schedule(&store, &id).unwrap();
        assert_eq!(outcome.version, 1);
        assert_eq!(outcome.recipients, 2);
        assert_eq!(store.notification_count().unwrap(), 2);

        let published = store.find_by_id(&id).unwrap().unwrap();
        assert_eq!(published.version, 1);
        assert!(published.published_at.is_some());
    }

    #[test]
    fn republish_notifies_everyone() {
        let store = store_with_users();
        let id = insert_draft(&store);

        publish_schedule(&store, &id).unwrap();
        let outcome = publish_schedule(&store, &id).unwrap();

        assert_eq!(outcome.version, 2);
        assert_eq!(outcome.recipients, 4);
        // 2 reviewer notifications from v1, 4 from v2.
        assert_eq!(store.notification_count().unwrap(), 6);
    }

    #[test]
    fn unknown_id_is_not_found_with_zero_notifications() {
        let store = store_with_users();

        let err = publish_schedule(&store, "no-such-id").unwrap_err();
        assert!(matches!(err, ScheduleError::ScheduleNotFound(_)));
        assert_eq!(store.notification_count().unwrap(), 0);
    }

    #[test]
    fn fanout_failure_does_not_undo_a_committed_publish() {
        let store = store_with_users();
        let id = insert_draft(&store);
        store.fail_notification_inserts();

        // The publish itself still succeeds and reports its audience.
        let outcome = publish_schedule(&store, &id).unwrap();
        assert_eq!(outcome.version, 1);
        assert_eq!(outcome.recipients, 2);

        // The version bump is persisted; no notification row landed.
        let published = store.find_by_id(&id).unwrap().unwrap();
        assert_eq!(published.version, 1);
        assert!(published.published_at.is_some());
        assert_eq!(store.notification_count().unwrap(), 0);
    }

    #[test]
    fn losing_a_version_race_is_a_conflict() {
        let store = store_with_users();
        let id = insert_draft(&store);

        // Another publisher bumped the record after our read of version 0.
        publish_schedule(&store, &id).unwrap();

        let err = publish_at_version(&store, &id, 0, 4).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::PublishConflict { expected: 0, .. }
        ));

        // The loser changed nothing: still at version 1, and only the
        // winner's reviewer notifications exist.
        let current = store.find_by_id(&id).unwrap().unwrap();
        assert_eq!(current.version, 1);
        assert_eq!(store.notification_count().unwrap(), 2);
    }

    #[test]
    fn missed_cas_on_a_vanished_row_is_not_found() {
        let store = store_with_users();
        let err = publish_at_version(&store, "gone", 0, 4).unwrap_err();
        assert!(matches!(err, ScheduleError::ScheduleNotFound(_)));
        assert_eq!(store.notification_count().unwrap(), 0);
    }

    #[test]
    fn fanout_messages_differ_by_version() {
        let recipients = vec![DbUser {
            user_id: "u1".to_string(),
            name: "Amal".to_string(),
            role: UserRole::Scheduler,
        }];

        let initial = fan_out(&recipients, 1, 4);
        assert_eq!(initial[0].title, "Schedule Version 1 Published");
        assert_eq!(
            initial[0].message,
            "Initial schedule for Level 4 has been published."
        );

        let updated = fan_out(&recipients, 3, 4);
        assert_eq!(updated[0].title, "Schedule Version 3 Published");
        assert_eq!(
            updated[0].message,
            "Updated schedule (v3) for Level 4 is now available."
        );
    }
}
