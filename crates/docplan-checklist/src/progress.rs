//! Progress view
//!
//! Pure and re-derivable: computed from a checklist on every read, never
//! stored alongside it.

use crate::checklist::Checklist;
use chrono::NaiveDate;
use docplan_extract::{EntityId, ItemId};
use serde::{Deserialize, Serialize};

/// Item that can be completed right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAction {
    pub item_id: ItemId,
    pub step_number: u32,
    pub description: String,
}

/// Deadline of an incomplete item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingDeadline {
    pub item_id: ItemId,
    pub step_number: u32,
    pub deadline_id: EntityId,
    pub description: String,
    pub due: NaiveDate,
}

/// Derived completion summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressView {
    /// Completed share in whole percent, rounded half up; 0 when empty
    pub percent: u8,
    pub completed: usize,
    pub total: usize,
    /// Pending items whose dependencies are all completed, by step number
    pub next_actions: Vec<NextAction>,
    /// Deadlines of pending items, earliest first
    pub upcoming_deadlines: Vec<UpcomingDeadline>,
}

/// Derives [`ProgressView`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressCalculator;

impl ProgressCalculator {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn progress(&self, checklist: &Checklist) -> ProgressView {
        let total = checklist.items().len();
        let completed = checklist.completed_count();

        let mut next_actions: Vec<NextAction> = checklist
            .items()
            .iter()
            .filter(|i| !i.completed && checklist.can_complete(i))
            .map(|i| NextAction {
                item_id: i.item_id,
                step_number: i.step_number,
                description: i.description.clone(),
            })
            .collect();
        next_actions.sort_by_key(|a| a.step_number);

        let mut upcoming_deadlines: Vec<UpcomingDeadline> = checklist
            .items()
            .iter()
            .filter(|i| !i.completed)
            .filter_map(|i| {
                i.deadline.as_ref().map(|d| UpcomingDeadline {
                    item_id: i.item_id,
                    step_number: i.step_number,
                    deadline_id: d.entity_id.clone(),
                    description: d.description.clone(),
                    due: d.due,
                })
            })
            .collect();
        upcoming_deadlines.sort_by_key(|d| (d.due, d.step_number));

        ProgressView {
            percent: percent(completed, total),
            completed,
            total,
            next_actions,
            upcoming_deadlines,
        }
    }
}

/// `round(100 * completed / total)` with halves rounded up, in integers
fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u128;
    let total = total as u128;
    let rounded = (200 * completed + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{fork_workflow, seven_step_workflow};
    use docplan_extract::UserId;
    use docplan_test_utils::{date, reference};
    use pretty_assertions::assert_eq;

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(3, 7), 43);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(7, 7), 100);
        assert_eq!(percent(0, 0), 0);
    }

    #[test]
    fn three_of_seven_is_forty_three() {
        let workflow = seven_step_workflow();
        let mut checklist = Checklist::create(&workflow, UserId::new(), reference());
        for number in [1, 2, 3] {
            let item = checklist.item_for_step(number).unwrap().item_id;
            checklist.toggle(item, true, reference()).unwrap();
        }

        let view = ProgressCalculator::new().progress(&checklist);
        assert_eq!(view.percent, 43);
        assert_eq!((view.completed, view.total), (3, 7));
        assert_eq!(view.next_actions.iter().map(|a| a.step_number).collect::<Vec<_>>(), vec![4, 5, 6, 7]);

        // step 2's deadline is done; the rest come earliest first
        let dues: Vec<(u32, NaiveDate)> = view.upcoming_deadlines.iter().map(|d| (d.step_number, d.due)).collect();
        assert_eq!(dues, vec![(4, date(2025, 1, 20)), (6, date(2025, 2, 10))]);
    }

    #[test]
    fn next_actions_follow_dependencies() {
        let workflow = fork_workflow();
        let mut checklist = Checklist::create(&workflow, UserId::new(), reference());
        let calculator = ProgressCalculator::new();

        let before = calculator.progress(&checklist);
        assert_eq!(before.next_actions.iter().map(|a| a.step_number).collect::<Vec<_>>(), vec![1]);

        let first = checklist.item_for_step(1).unwrap().item_id;
        checklist.toggle(first, true, reference()).unwrap();
        let after = calculator.progress(&checklist);
        assert_eq!(after.next_actions.iter().map(|a| a.step_number).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(after.percent, 33);
    }
}
