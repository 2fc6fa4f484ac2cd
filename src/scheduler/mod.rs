//! Schedule generation workflow.
//!
//! For one level: partition students into groups, resolve each group's fixed
//! external slots, build a prompt per group, ask the proposer, and insert the
//! accepted grids as version-0 drafts. Groups run sequentially, 1 through N.

pub mod groups;
pub mod prompt;

mod error;

pub use error::ScheduleError;

use crate::db::{DbCourse, DbSchedule, NewSchedule};
use crate::types::ServerState;
use std::collections::HashSet;
use tracing::{info, warn};

/// Generates schedules for every group of a level and persists them.
///
/// All proposer calls complete before anything is inserted, so a proposer
/// failure on any group leaves no partial schedule set behind. Inserts then
/// happen one batch per group, in group order; each batch is transactional
/// and the inserted rows are re-read by id before returning.
pub async fn generate_for_level(
    state: &ServerState,
    level: i64,
) -> Result<Vec<DbSchedule>, ScheduleError> {
    let level_data = state
        .store
        .get_level(level)?
        .ok_or(ScheduleError::LevelNotFound(level))?;

    let settings = &state.config.scheduling;
    let number_of_groups = groups::group_count(
        level_data.student_count as u32,
        settings.group_capacity,
        settings.empty_level_policy,
    );
    info!(level, number_of_groups, "Calculated number of groups");

    let courses = state.store.get_courses_for_level(level)?;
    let rules = state.store.get_rules()?;

    let (home_courses, external_courses) =
        partition_courses(courses, &settings.home_department);

    let external_codes: Vec<String> =
        external_courses.iter().map(|c| c.code.clone()).collect();
    let all_external_sections = state.store.get_sections_for_courses(&external_codes)?;

    // Data-completeness check: external courses with no sections at all can
    // never appear in any group's fixed-slot list.
    let codes_with_sections: HashSet<&str> = all_external_sections
        .iter()
        .map(|s| s.course_code.as_str())
        .collect();
    for course in &external_courses {
        if !codes_with_sections.contains(course.code.as_str()) {
            warn!(
                course = %course.code,
                name = %course.name,
                "External course has no predefined sections and will not be scheduled"
            );
        }
    }

    // Gather every group's proposal before touching the store.
    let mut per_group: Vec<Vec<NewSchedule>> = Vec::with_capacity(number_of_groups as usize);
    for group in 1..=number_of_groups {
        let fixed_sections = groups::sections_for_group(&all_external_sections, group);
        if fixed_sections.is_empty() && !external_courses.is_empty() {
            warn!(
                level,
                group, "No external sections found for this group; its schedule may be incomplete"
            );
        }

        let prompt_text =
            prompt::build_prompt(level, group, &home_courses, &fixed_sections, &rules);
        let proposals = state.proposer.propose(&prompt_text).await?;

        // The proposer's own section label is advisory; the group loop is
        // authoritative for both section and level.
        let batch: Vec<NewSchedule> = proposals
            .into_iter()
            .map(|p| NewSchedule {
                level,
                section: format!("Group {group}"),
                grid: p.grid,
            })
            .collect();
        per_group.push(batch);
    }

    let mut inserted_ids = Vec::new();
    for batch in &per_group {
        let ids = state.store.insert_schedules(batch)?;
        inserted_ids.extend(ids);
    }

    let schedules = state.store.find_by_ids(&inserted_ids)?;
    info!(
        level,
        schedules = schedules.len(),
        "All schedules saved as version-0 drafts"
    );

    Ok(schedules)
}

/// Splits a level's courses into home-department (freely schedulable) and
/// external-department (fixed) by exact department-name match.
fn partition_courses(
    courses: Vec<DbCourse>,
    home_department: &str,
) -> (Vec<DbCourse>, Vec<DbCourse>) {
    courses
        .into_iter()
        .partition(|c| c.department == home_department)
}
