/// Database types for scheduling data

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone)]
pub struct DbLevel {
    pub level_num: i64,
    pub student_count: i64,
}

#[derive(Debug, Clone)]
pub struct DbCourse {
    pub code: String,
    pub name: String,
    pub department: String,
    pub duration_hours: i64,
}

/// An external-department section with fixed meeting times.
///
/// `group_num` is the structured group affiliation; when the row predates the
/// structured column it is derived from the `-G<n>` suffix of `sec_num`.
#[derive(Debug, Clone)]
pub struct DbSection {
    pub sec_num: String,
    pub course_code: String,
    pub group_num: Option<u32>,
    pub slots: Vec<TimeSlot>,
}

/// A typed weekly meeting time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlot {
    pub day: String,
    pub start_hr: u8,
    pub start_min: u8,
    pub end_hr: u8,
    pub end_min: u8,
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Renders the legacy "<Day> <start>-<end>" label, e.g. "Sunday 8:00-8:50"
        write!(
            f,
            "{} {}:{:02}-{}:{:02}",
            self.day, self.start_hr, self.start_min, self.end_hr, self.end_min
        )
    }
}

#[derive(Debug, Clone)]
pub struct DbRule {
    pub rule_id: i64,
    pub rule_description: String,
}

/// Roles a user can hold. First publishes notify reviewers only
/// (Scheduler + LoadCommittee); republishes notify everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Scheduler,
    LoadCommittee,
    Faculty,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Scheduler => "Scheduler",
            UserRole::LoadCommittee => "LoadCommittee",
            UserRole::Faculty => "Faculty",
            UserRole::Student => "Student",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown user role: {0}")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Scheduler" => Ok(UserRole::Scheduler),
            "LoadCommittee" => Ok(UserRole::LoadCommittee),
            "Faculty" => Ok(UserRole::Faculty),
            "Student" => Ok(UserRole::Student),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbUser {
    pub user_id: String,
    pub name: String,
    pub role: UserRole,
}

/// The versioned schedule record. Version 0 is an unpublished draft; each
/// publish increments the version in place. Regeneration never reuses a row.
#[derive(Debug, Clone, Serialize)]
pub struct DbSchedule {
    #[serde(rename = "id")]
    pub schedule_id: String,
    pub level: i64,
    pub section: String,
    pub grid: Value,
    pub version: i64,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A freshly generated schedule awaiting insertion at version 0.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub level: i64,
    pub section: String,
    pub grid: Value,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
}
