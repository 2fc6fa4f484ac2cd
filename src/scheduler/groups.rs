//! Group partitioning and fixed-slot resolution.

use crate::config::EmptyLevelPolicy;
use crate::db::DbSection;
use regex::Regex;
use std::sync::LazyLock;

static GROUP_SUFFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-G(\d+)$").unwrap());

/// Computes the number of parallel groups for a level: student count divided
/// by capacity, rounded up. What zero students yields is a policy choice.
pub fn group_count(student_count: u32, capacity: u32, policy: EmptyLevelPolicy) -> u32 {
    if student_count == 0 {
        return match policy {
            EmptyLevelPolicy::NoGroups => 0,
            EmptyLevelPolicy::OneGroup => 1,
        };
    }
    student_count.div_ceil(capacity)
}

/// Extracts the group affiliation encoded in a section identifier's trailing
/// "-G<n>" suffix (e.g. "L3-MATH106-G1" -> 1). Sections without exactly one
/// such suffix carry no group affiliation.
pub fn group_from_sec_num(sec_num: &str) -> Option<u32> {
    GROUP_SUFFIX_REGEX
        .captures(sec_num)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Returns exactly the sections affiliated with group `g`.
///
/// The structured `group_num` field wins when present; otherwise the
/// affiliation is derived from the identifier suffix. No fuzzy matching.
pub fn sections_for_group(sections: &[DbSection], group: u32) -> Vec<DbSection> {
    sections
        .iter()
        .filter(|s| {
            s.group_num
                .or_else(|| group_from_sec_num(&s.sec_num))
                .is_some_and(|g| g == group)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(sec_num: &str, group_num: Option<u32>) -> DbSection {
        DbSection {
            sec_num: sec_num.to_string(),
            course_code: "MATH106".to_string(),
            group_num,
            slots: Vec::new(),
        }
    }

    #[test]
    fn group_count_rounds_up() {
        let policy = EmptyLevelPolicy::NoGroups;
        assert_eq!(group_count(1, 25, policy), 1);
        assert_eq!(group_count(25, 25, policy), 1);
        assert_eq!(group_count(26, 25, policy), 2);
        assert_eq!(group_count(50, 25, policy), 2);
        assert_eq!(group_count(60, 25, policy), 3);
    }

    #[test]
    fn empty_level_policy_decides_zero_students() {
        assert_eq!(group_count(0, 25, EmptyLevelPolicy::NoGroups), 0);
        assert_eq!(group_count(0, 25, EmptyLevelPolicy::OneGroup), 1);
    }

    #[test]
    fn suffix_extraction() {
        assert_eq!(group_from_sec_num("L3-MATH106-G1"), Some(1));
        assert_eq!(group_from_sec_num("L3-PHYS103-G12"), Some(12));
        assert_eq!(group_from_sec_num("L3-MATH106"), None);
        assert_eq!(group_from_sec_num("L3-MATH106-G1-EXTRA"), None);
        assert_eq!(group_from_sec_num("L3-MATH106-G"), None);
    }

    #[test]
    fn resolver_never_crosses_groups() {
        let sections = vec![
            section("L3-MATH106-G1", None),
            section("L3-MATH106-G2", None),
            section("L3-PHYS103-G2", None),
            section("L3-CHEM101", None),
        ];

        let g1 = sections_for_group(&sections, 1);
        assert_eq!(g1.len(), 1);
        assert_eq!(g1[0].sec_num, "L3-MATH106-G1");

        let g2 = sections_for_group(&sections, 2);
        assert_eq!(g2.len(), 2);
        assert!(g2.iter().all(|s| !s.sec_num.ends_with("-G1")));
    }

    #[test]
    fn structured_group_field_wins_over_suffix() {
        // A migrated row where the structured field is authoritative.
        let sections = vec![section("L3-MATH106-G1", Some(2))];
        assert!(sections_for_group(&sections, 1).is_empty());
        assert_eq!(sections_for_group(&sections, 2).len(), 1);
    }

    #[test]
    fn unaffiliated_sections_are_invisible_to_every_group() {
        let sections = vec![section("L3-CHEM101", None)];
        for g in 1..=4 {
            assert!(sections_for_group(&sections, g).is_empty());
        }
    }
}
