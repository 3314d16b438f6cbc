use crate::services::error::DomainError;

const PERCENTAGE_EPSILON: f64 = 1e-6;

/// Validates a grade program's weight against its siblings and, for
/// accumulative programs, the weights of its sub-entries.
///
/// Sibling percentages within a module may sum to at most 100; the
/// sub-entries of an accumulative program must sum to exactly 100.
pub(crate) fn validate_percentages(
    sibling_sum: f64,
    percentage: f64,
    entry_percentages: &[f64],
) -> Result<(), DomainError> {
    if percentage <= 0.0 || percentage > 100.0 {
        return Err(DomainError::Validation(format!(
            "program percentage must be in (0, 100], got {percentage}"
        )));
    }

    if sibling_sum + percentage > 100.0 + PERCENTAGE_EPSILON {
        return Err(DomainError::Validation(format!(
            "module programs would exceed 100% (existing {sibling_sum}%, adding {percentage}%)"
        )));
    }

    if entry_percentages.is_empty() {
        return Ok(());
    }

    let mut entry_sum = 0.0;
    for &entry in entry_percentages {
        if entry <= 0.0 {
            return Err(DomainError::Validation(format!(
                "accumulative entry percentage must be positive, got {entry}"
            )));
        }
        entry_sum += entry;
    }

    if (entry_sum - 100.0).abs() > PERCENTAGE_EPSILON {
        return Err(DomainError::Validation(format!(
            "accumulative entries must sum to exactly 100%, got {entry_sum}%"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_single_program_within_module_budget() {
        assert!(validate_percentages(60.0, 40.0, &[]).is_ok());
    }

    #[test]
    fn rejects_sibling_overflow() {
        let err = validate_percentages(70.0, 40.0, &[]).expect_err("overflow");
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn accepts_accumulative_entries_summing_to_hundred() {
        assert!(validate_percentages(0.0, 30.0, &[40.0, 60.0]).is_ok());
    }

    #[test]
    fn rejects_accumulative_entries_below_hundred() {
        let err = validate_percentages(0.0, 30.0, &[40.0, 50.0]).expect_err("short entries");
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rejects_non_positive_percentage() {
        assert!(validate_percentages(0.0, 0.0, &[]).is_err());
        assert!(validate_percentages(0.0, -5.0, &[]).is_err());
        assert!(validate_percentages(0.0, 120.0, &[]).is_err());
    }

    #[test]
    fn rejects_non_positive_entry() {
        assert!(validate_percentages(0.0, 50.0, &[100.0, 0.0]).is_err());
    }
}
