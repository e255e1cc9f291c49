//! Turn violations into directives for the next draft attempt

use crate::domain::{EntityType, Violation};

/// One directive per distinct suggested fix, in violation order
///
/// Day-scoped fixes are prefixed with the day so the model knows where to
/// apply them, e.g. `Day 3 must not be at the origin Los Angeles`.
pub fn build_regeneration_constraints(violations: &[Violation]) -> Vec<String> {
    let mut constraints: Vec<String> = Vec::new();
    for violation in violations {
        let fix = violation.suggested_fix.trim();
        if fix.is_empty() {
            continue;
        }
        let directive = match (violation.entity_type, violation.entity_id.strip_prefix("day-")) {
            (EntityType::Day, Some(day)) => format!("Day {} {}", day, fix),
            _ => fix.to_string(),
        };
        if !constraints.contains(&directive) {
            constraints.push(directive);
        }
    }
    constraints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_prefix_and_dedup() {
        let violations = vec![
            Violation::error("INV-DIR-03", EntityType::Day, "day-3", "back at LA", "must not be at the origin LA"),
            Violation::error("INV-DIR-01", EntityType::Day, "day-3", "closer", "must keep moving away from LA"),
            Violation::error("INV-DIR-03", EntityType::Day, "day-3", "back at LA", "must not be at the origin LA"),
            Violation::warn("INV-PACE-04", EntityType::Trip, "trip", "uneven", "Spread activities evenly"),
            Violation::warn("INV-X", EntityType::Trip, "trip", "no fix", "  "),
        ];
        let constraints = build_regeneration_constraints(&violations);
        assert_eq!(
            constraints,
            vec![
                "Day 3 must not be at the origin LA".to_string(),
                "Day 3 must keep moving away from LA".to_string(),
                "Spread activities evenly".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty() {
        assert!(build_regeneration_constraints(&[]).is_empty());
    }
}
