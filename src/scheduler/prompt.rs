//! Prompt construction for the external schedule proposer.
//!
//! Pure and deterministic: the same inputs always yield the same text, which
//! is what makes the generation workflow testable against a stub proposer.

use crate::db::{DbCourse, DbRule, DbSection};
use std::fmt::Write;

/// Assembles the scheduling prompt for one group of a level.
///
/// The text carries four blocks: the home-department courses to place, the
/// group's fixed external sections (locked, not to be modified), the rule
/// list verbatim, and the enumerated constraints plus the strict output
/// format the proposer must honor.
pub fn build_prompt(
    level: i64,
    group: u32,
    home_courses: &[DbCourse],
    fixed_sections: &[DbSection],
    rules: &[DbRule],
) -> String {
    let mut prompt = String::new();

    writeln!(
        prompt,
        "You are an academic schedule generator for the Software Engineering Department."
    )
    .unwrap();
    writeln!(prompt, "The week starts from Sunday.").unwrap();
    writeln!(
        prompt,
        "The time slots are from 8:00 AM to 2:50 PM, each slot is 50 minutes."
    )
    .unwrap();
    writeln!(prompt).unwrap();
    writeln!(
        prompt,
        "Generate a weekly schedule for Level {level}, Group {group}."
    )
    .unwrap();
    writeln!(prompt, "Each course has a duration in hours.").unwrap();

    writeln!(prompt, "\n---\n").unwrap();
    writeln!(prompt, "Software Engineering Courses (to be scheduled):").unwrap();
    if home_courses.is_empty() {
        writeln!(prompt, "None").unwrap();
    } else {
        for course in home_courses {
            writeln!(
                prompt,
                "- {} ({}), Duration: {}h",
                course.name, course.code, course.duration_hours
            )
            .unwrap();
        }
    }

    writeln!(prompt, "\n---\n").unwrap();
    writeln!(
        prompt,
        "External Department Courses (fixed schedule for Group {group}, do NOT modify):"
    )
    .unwrap();
    if fixed_sections.is_empty() {
        writeln!(prompt, "None (no external sections found for this group)").unwrap();
    } else {
        for section in fixed_sections {
            writeln!(prompt, "- Course: {}", section.course_code).unwrap();
            writeln!(prompt, "  Section: {}", section.sec_num).unwrap();
            writeln!(prompt, "  Times:").unwrap();
            for slot in &section.slots {
                writeln!(prompt, "    - {slot}").unwrap();
            }
        }
    }

    writeln!(prompt, "\n---\n").unwrap();
    writeln!(prompt, "Rules:").unwrap();
    if rules.is_empty() {
        writeln!(prompt, "None").unwrap();
    } else {
        for rule in rules {
            writeln!(prompt, "- {}", rule.rule_description).unwrap();
        }
    }

    writeln!(prompt, "\n---\n").unwrap();
    writeln!(prompt, "Constraints:").unwrap();
    writeln!(
        prompt,
        "1. Do NOT modify the predefined external time slots for Group {group}."
    )
    .unwrap();
    writeln!(
        prompt,
        "2. Ensure no overlap between software engineering courses and the fixed external ones."
    )
    .unwrap();
    writeln!(
        prompt,
        "3. Avoid double-booking instructors or classrooms (verified downstream)."
    )
    .unwrap();
    writeln!(
        prompt,
        "4. The total scheduled time for each course must match its duration."
    )
    .unwrap();
    writeln!(
        prompt,
        "5. Use only the hours 08:00-14:50, in 50-minute-aligned slots."
    )
    .unwrap();
    writeln!(prompt, "6. Do not include any midterm slot.").unwrap();

    writeln!(prompt, "\n---\n").unwrap();
    writeln!(
        prompt,
        "The output must be pure JSON (no text, no Markdown) in the format:"
    )
    .unwrap();
    writeln!(prompt, "[").unwrap();
    writeln!(prompt, "  {{").unwrap();
    writeln!(prompt, "    \"section\": \"Group {group}\",").unwrap();
    writeln!(prompt, "    \"level\": {level},").unwrap();
    writeln!(prompt, "    \"grid\": {{").unwrap();
    writeln!(prompt, "      \"Sunday\": {{\"8:00-8:50\": \"CourseName\"}},").unwrap();
    writeln!(prompt, "      \"Monday\": {{}},").unwrap();
    writeln!(prompt, "      \"Tuesday\": {{}},").unwrap();
    writeln!(prompt, "      \"Wednesday\": {{}},").unwrap();
    writeln!(prompt, "      \"Thursday\": {{}}").unwrap();
    writeln!(prompt, "    }}").unwrap();
    writeln!(prompt, "  }}").unwrap();
    writeln!(prompt, "]").unwrap();

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TimeSlot;

    fn course(code: &str, name: &str, dept: &str, hours: i64) -> DbCourse {
        DbCourse {
            code: code.to_string(),
            name: name.to_string(),
            department: dept.to_string(),
            duration_hours: hours,
        }
    }

    fn fixture() -> (Vec<DbCourse>, Vec<DbSection>, Vec<DbRule>) {
        let home = vec![
            course("SWE211", "Intro to Software Engineering", "Software Engineering", 3),
            course("SWE314", "Software Security", "Software Engineering", 2),
        ];
        let fixed = vec![DbSection {
            sec_num: "L3-MATH106-G2".to_string(),
            course_code: "MATH106".to_string(),
            group_num: Some(2),
            slots: vec![TimeSlot {
                day: "Sunday".to_string(),
                start_hr: 8,
                start_min: 0,
                end_hr: 8,
                end_min: 50,
            }],
        }];
        let rules = vec![DbRule {
            rule_id: 1,
            rule_description: "Leave Tuesday 12:00-13:00 free for seminars".to_string(),
        }];
        (home, fixed, rules)
    }

    #[test]
    fn prompt_is_deterministic() {
        let (home, fixed, rules) = fixture();
        let a = build_prompt(3, 2, &home, &fixed, &rules);
        let b = build_prompt(3, 2, &home, &fixed, &rules);
        assert_eq!(a, b);
    }

    #[test]
    fn prompt_carries_all_blocks() {
        let (home, fixed, rules) = fixture();
        let prompt = build_prompt(3, 2, &home, &fixed, &rules);

        assert!(prompt.contains("Level 3, Group 2"));
        assert!(prompt.contains("- Intro to Software Engineering (SWE211), Duration: 3h"));
        assert!(prompt.contains("- Software Security (SWE314), Duration: 2h"));
        assert!(prompt.contains("Section: L3-MATH106-G2"));
        assert!(prompt.contains("- Sunday 8:00-8:50"));
        // Rule text appears verbatim.
        assert!(prompt.contains("- Leave Tuesday 12:00-13:00 free for seminars"));
        // Output contract names the group's section label and all five weekdays.
        assert!(prompt.contains("\"section\": \"Group 2\""));
        for day in ["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday"] {
            assert!(prompt.contains(&format!("\"{day}\"")), "missing {day}");
        }
    }

    #[test]
    fn empty_inputs_render_placeholders() {
        let prompt = build_prompt(5, 1, &[], &[], &[]);
        assert!(prompt.contains("None (no external sections found for this group)"));
        assert!(prompt.contains("Rules:\nNone"));
    }
}
