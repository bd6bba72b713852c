//! Fan-out of coverage overtime slots for an employee on leave.

use chrono::{NaiveDate, NaiveTime};

/// One overtime request to be inserted for a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageSlot {
    pub candidate_id: u64,
    pub covering_for: u64,
    pub overtime_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// One slot per distinct candidate, in the order given. The employee on
/// leave never covers their own shift.
pub fn plan_coverage(
    covering_for: u64,
    leave_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    candidate_ids: &[u64],
) -> Vec<CoverageSlot> {
    let mut seen = Vec::with_capacity(candidate_ids.len());
    for id in candidate_ids {
        if *id != covering_for && !seen.contains(id) {
            seen.push(*id);
        }
    }

    seen.into_iter()
        .map(|candidate_id| CoverageSlot {
            candidate_id,
            covering_for,
            overtime_date: leave_date,
            start_time,
            end_time,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_slot_per_distinct_candidate() {
        let day = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        let start = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(15, 0, 0).unwrap();

        let slots = plan_coverage(4, day, start, end, &[9, 4, 7, 9]);

        let ids: Vec<u64> = slots.iter().map(|s| s.candidate_id).collect();
        assert_eq!(ids, vec![9, 7]);
        assert!(slots.iter().all(|s| s.covering_for == 4 && s.overtime_date == day));
    }

    #[test]
    fn no_candidates_means_no_slots() {
        let day = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        let t = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        assert!(plan_coverage(4, day, t, t, &[]).is_empty());
        assert!(plan_coverage(4, day, t, t, &[4]).is_empty());
    }
}
