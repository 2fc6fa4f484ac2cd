/// Database module for schedule, notification, and reference data access

mod types;

pub use types::{
    DbCourse, DbLevel, DbRule, DbSchedule, DbSection, DbUser, NewNotification, NewSchedule,
    TimeSlot, UserRole,
};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Result, Row};
use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Mutex;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("../../sql/init_schedule.sql");

pub struct ScheduleStore {
    db: Mutex<Connection>,
}

impl ScheduleStore {
    /// Creates a new ScheduleStore and initializes the database schema
    pub fn new(db_path: &str) -> Self {
        let conn = Connection::open(db_path).expect("Failed to open database");
        Self::from_connection(conn)
    }

    /// Opens an in-memory store (used by tests and local experimentation)
    pub fn open_in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("Failed to open in-memory database");
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Self {
        conn.execute_batch(SCHEMA_SQL)
            .expect("Failed to initialize database schema");
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Looks up a level by number. The student count is recomputed by an
    /// external collaborator and only read here.
    pub fn get_level(&self, level_num: i64) -> Result<Option<DbLevel>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT level_num, student_count FROM levels WHERE level_num = ?")?;
        let mut rows = stmt.query_map([level_num], |row| {
            Ok(DbLevel {
                level_num: row.get(0)?,
                student_count: row.get(1)?,
            })
        })?;
        rows.next().transpose()
    }

    /// Gets all courses attached to a level, in course-code order.
    pub fn get_courses_for_level(&self, level_num: i64) -> Result<Vec<DbCourse>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT c.code, c.name, c.department, c.duration_hours
             FROM courses c
             JOIN level_courses lc ON lc.course_code = c.code
             WHERE lc.level_num = ?
             ORDER BY c.code",
        )?;
        let courses = stmt.query_map([level_num], |row| {
            Ok(DbCourse {
                code: row.get(0)?,
                name: row.get(1)?,
                department: row.get(2)?,
                duration_hours: row.get(3)?,
            })
        })?;
        courses.collect()
    }

    /// Gets all sections (with their typed time slots) belonging to any of the
    /// given course codes.
    pub fn get_sections_for_courses(&self, course_codes: &[String]) -> Result<Vec<DbSection>> {
        if course_codes.is_empty() {
            return Ok(Vec::new());
        }

        let db = self.db.lock().unwrap();
        let placeholders = vec!["?"; course_codes.len()].join(", ");
        let sql = format!(
            "SELECT sec_num, course_code, group_num FROM sections
             WHERE course_code IN ({placeholders})
             ORDER BY sec_num"
        );
        let mut stmt = db.prepare(&sql)?;
        let sections: Vec<(String, String, Option<u32>)> = stmt
            .query_map(rusqlite::params_from_iter(course_codes.iter()), |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<_>>>()?;

        let mut result = Vec::new();
        for (sec_num, course_code, group_num) in sections {
            let mut slot_stmt = db.prepare(
                "SELECT day, start_hr, start_min, end_hr, end_min
                 FROM section_slots WHERE sec_num = ? ORDER BY slot_id",
            )?;
            let slots: Vec<TimeSlot> = slot_stmt
                .query_map([&sec_num], |row| {
                    Ok(TimeSlot {
                        day: row.get(0)?,
                        start_hr: row.get(1)?,
                        start_min: row.get(2)?,
                        end_hr: row.get(3)?,
                        end_min: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>>>()?;

            result.push(DbSection {
                sec_num,
                course_code,
                group_num,
                slots,
            });
        }

        Ok(result)
    }

    /// Gets all scheduling rules. Rule text is included verbatim in prompts.
    pub fn get_rules(&self) -> Result<Vec<DbRule>> {
        let db = self.db.lock().unwrap();
        let mut stmt =
            db.prepare("SELECT rule_id, rule_description FROM rules ORDER BY rule_id")?;
        let rules = stmt.query_map([], |row| {
            Ok(DbRule {
                rule_id: row.get(0)?,
                rule_description: row.get(1)?,
            })
        })?;
        rules.collect()
    }

    /// Gets users, optionally restricted to a set of roles.
    pub fn get_users(&self, roles: Option<&[UserRole]>) -> Result<Vec<DbUser>> {
        let db = self.db.lock().unwrap();
        let map_row = |row: &Row<'_>| -> Result<DbUser> {
            let role_str: String = row.get(2)?;
            let role = UserRole::from_str(&role_str)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
            Ok(DbUser {
                user_id: row.get(0)?,
                name: row.get(1)?,
                role,
            })
        };

        match roles {
            // An empty role filter matches nobody; "IN ()" is not valid SQL.
            Some([]) => Ok(Vec::new()),
            Some(roles) => {
                let placeholders = vec!["?"; roles.len()].join(", ");
                let sql = format!(
                    "SELECT user_id, name, role FROM users
                     WHERE role IN ({placeholders}) ORDER BY user_id"
                );
                let mut stmt = db.prepare(&sql)?;
                let users = stmt.query_map(
                    rusqlite::params_from_iter(roles.iter().map(|r| r.as_str())),
                    map_row,
                )?;
                users.collect()
            }
            None => {
                let mut stmt =
                    db.prepare("SELECT user_id, name, role FROM users ORDER BY user_id")?;
                let users = stmt.query_map([], map_row)?;
                users.collect()
            }
        }
    }

    /// Inserts a batch of freshly generated schedules as version-0 drafts.
    ///
    /// The batch is transactional: either every row lands or none does. The
    /// returned UUIDs can immediately be re-read via [`find_by_ids`].
    ///
    /// [`find_by_ids`]: ScheduleStore::find_by_ids
    pub fn insert_schedules(&self, batch: &[NewSchedule]) -> Result<Vec<String>> {
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        let now = Utc::now();
        let mut ids = Vec::with_capacity(batch.len());

        for schedule in batch {
            let id = Uuid::new_v4().to_string();
            let grid_json = serde_json::to_string(&schedule.grid)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            tx.execute(
                "INSERT INTO schedules (schedule_id, level, section, grid, version, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                (&id, schedule.level, &schedule.section, &grid_json, now),
            )?;
            ids.push(id);
        }

        tx.commit()?;
        Ok(ids)
    }

    /// Point lookup by schedule id.
    pub fn find_by_id(&self, schedule_id: &str) -> Result<Option<DbSchedule>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT schedule_id, level, section, grid, version, published_at, created_at
             FROM schedules WHERE schedule_id = ?",
        )?;
        let mut rows = stmt.query_map([schedule_id], map_schedule_row)?;
        rows.next().transpose()
    }

    /// Fetches schedules by id, preserving the order of `ids`.
    pub fn find_by_ids(&self, ids: &[String]) -> Result<Vec<DbSchedule>> {
        let mut result = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(schedule) = self.find_by_id(id)? {
                result.push(schedule);
            }
        }
        Ok(result)
    }

    /// Returns, for each distinct section under a level, the single record
    /// with the maximum version: rows are sorted by version descending and the
    /// first row seen per section wins.
    pub fn find_latest_by_level(&self, level: i64) -> Result<Vec<DbSchedule>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT schedule_id, level, section, grid, version, published_at, created_at
             FROM schedules WHERE level = ?
             ORDER BY version DESC, created_at DESC",
        )?;
        let rows: Vec<DbSchedule> = stmt
            .query_map([level], map_schedule_row)?
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        Ok(rows
            .into_iter()
            .filter(|s| seen.insert(s.section.clone()))
            .collect())
    }

    /// Returns all schedules for a level at or above `min_version`, newest
    /// version first. Serves the student-facing listing (version >= 2).
    pub fn find_by_level_min_version(
        &self,
        level: i64,
        min_version: i64,
    ) -> Result<Vec<DbSchedule>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT schedule_id, level, section, grid, version, published_at, created_at
             FROM schedules WHERE level = ? AND version >= ?
             ORDER BY version DESC",
        )?;
        let rows = stmt.query_map((level, min_version), map_schedule_row)?;
        rows.collect()
    }

    /// Replaces only the grid of an existing schedule. Version and publish
    /// timestamp are untouched. Returns false if the id does not exist.
    pub fn update_grid(&self, schedule_id: &str, grid: &Value) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let grid_json = serde_json::to_string(grid)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let rows = db.execute(
            "UPDATE schedules SET grid = ?1 WHERE schedule_id = ?2",
            (&grid_json, schedule_id),
        )?;
        Ok(rows > 0)
    }

    /// Conditionally bumps a schedule to `expected_version + 1` and stamps the
    /// publish time. The version predicate makes the read-modify-write atomic:
    /// zero rows affected means the id is gone or another publisher won.
    pub fn publish_schedule(
        &self,
        schedule_id: &str,
        expected_version: i64,
        published_at: DateTime<Utc>,
    ) -> Result<usize> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE schedules SET version = ?1, published_at = ?2
             WHERE schedule_id = ?3 AND version = ?4",
            (expected_version + 1, published_at, schedule_id, expected_version),
        )
    }

    /// Inserts one notification per recipient in a single transaction.
    pub fn insert_notifications(&self, batch: &[NewNotification]) -> Result<usize> {
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        let now = Utc::now();

        for notification in batch {
            tx.execute(
                "INSERT INTO notifications (user_id, title, message, created_at, read)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                (
                    &notification.user_id,
                    &notification.title,
                    &notification.message,
                    now,
                ),
            )?;
        }

        tx.commit()?;
        Ok(batch.len())
    }

    /// Counts stored notifications (monitoring and tests).
    pub fn notification_count(&self) -> Result<i64> {
        let db = self.db.lock().unwrap();
        db.query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))
    }
}

fn map_schedule_row(row: &Row<'_>) -> Result<DbSchedule> {
    let grid_json: String = row.get(3)?;
    let grid: Value = serde_json::from_str(&grid_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(DbSchedule {
        schedule_id: row.get(0)?,
        level: row.get(1)?,
        section: row.get(2)?,
        grid,
        version: row.get(4)?,
        published_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
impl ScheduleStore {
    pub fn seed_level(&self, level_num: i64, student_count: i64) {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO levels (level_num, student_count) VALUES (?1, ?2)",
            (level_num, student_count),
        )
        .unwrap();
    }

    pub fn seed_course(&self, code: &str, name: &str, department: &str, duration_hours: i64) {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO courses (code, name, department, duration_hours) VALUES (?1, ?2, ?3, ?4)",
            (code, name, department, duration_hours),
        )
        .unwrap();
    }

    pub fn seed_level_course(&self, level_num: i64, course_code: &str, enrolled: i64) {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO level_courses (level_num, course_code, enrolled) VALUES (?1, ?2, ?3)",
            (level_num, course_code, enrolled),
        )
        .unwrap();
    }

    pub fn seed_section(
        &self,
        sec_num: &str,
        course_code: &str,
        group_num: Option<u32>,
        slots: &[TimeSlot],
    ) {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO sections (sec_num, course_code, group_num) VALUES (?1, ?2, ?3)",
            (sec_num, course_code, group_num),
        )
        .unwrap();
        for slot in slots {
            db.execute(
                "INSERT INTO section_slots (sec_num, day, start_hr, start_min, end_hr, end_min)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    sec_num,
                    &slot.day,
                    slot.start_hr,
                    slot.start_min,
                    slot.end_hr,
                    slot.end_min,
                ),
            )
            .unwrap();
        }
    }

    /// Makes every notification insert fail, leaving the rest of the store
    /// intact. Lets tests exercise fanout failure after a committed publish.
    pub fn fail_notification_inserts(&self) {
        let db = self.db.lock().unwrap();
        db.execute_batch(
            "CREATE TRIGGER notifications_unavailable
             BEFORE INSERT ON notifications
             BEGIN SELECT RAISE(ABORT, 'notifications unavailable'); END",
        )
        .unwrap();
    }

    pub fn seed_rule(&self, description: &str) {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO rules (rule_description) VALUES (?1)",
            [description],
        )
        .unwrap();
    }

    pub fn seed_user(&self, user_id: &str, name: &str, role: UserRole) {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO users (user_id, name, role) VALUES (?1, ?2, ?3)",
            (user_id, name, role.as_str()),
        )
        .unwrap();
    }
}
