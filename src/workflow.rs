//! Appointment status workflow.
//!
//! The lifecycle is pending → confirmed → completed, with cancellation
//! allowed from any non-terminal state. Every view that mutates status
//! goes through [`can_transition`]; the buttons offered in the admin UI
//! come from [`actions_for`], so the two can never disagree.

use crate::models::AppointmentStatus;

/// The only status changes the system accepts, in (from, to) pairs.
const TRANSITIONS: &[(AppointmentStatus, AppointmentStatus)] = &[
    (AppointmentStatus::Pending, AppointmentStatus::Confirmed),
    (AppointmentStatus::Confirmed, AppointmentStatus::Completed),
    (AppointmentStatus::Pending, AppointmentStatus::Cancelled),
    (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled),
];

/// Status transitions an administrator can trigger. Deleting a record is
/// not a transition and is handled separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Confirm,
    Complete,
    Cancel,
}

impl AdminAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "confirm" => Some(AdminAction::Confirm),
            "complete" => Some(AdminAction::Complete),
            "cancel" => Some(AdminAction::Cancel),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdminAction::Confirm => "confirm",
            AdminAction::Complete => "complete",
            AdminAction::Cancel => "cancel",
        }
    }

    pub fn target(self) -> AppointmentStatus {
        match self {
            AdminAction::Confirm => AppointmentStatus::Confirmed,
            AdminAction::Complete => AppointmentStatus::Completed,
            AdminAction::Cancel => AppointmentStatus::Cancelled,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AdminAction::Confirm => "Confirmar",
            AdminAction::Complete => "Marcar como Concluído",
            AdminAction::Cancel => "Cancelar",
        }
    }

    pub fn button_class(self) -> &'static str {
        match self {
            AdminAction::Confirm => "btn btn-confirm",
            AdminAction::Complete => "btn btn-complete",
            AdminAction::Cancel => "btn btn-cancel",
        }
    }
}

/// Single authorization and transition predicate. Only administrators
/// may change status; clients get a read-only tracking view.
pub fn can_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
    actor_is_admin: bool,
) -> bool {
    actor_is_admin && TRANSITIONS.contains(&(from, to))
}

/// Actions available to an administrator for an appointment in `status`.
pub fn actions_for(status: AppointmentStatus) -> Vec<AdminAction> {
    [AdminAction::Confirm, AdminAction::Complete, AdminAction::Cancel]
        .into_iter()
        .filter(|action| can_transition(status, action.target(), true))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus::*;

    #[test]
    fn confirm_only_from_pending() {
        assert!(can_transition(Pending, Confirmed, true));
        assert!(!can_transition(Confirmed, Confirmed, true));
        assert!(!can_transition(Completed, Confirmed, true));
        assert!(!can_transition(Cancelled, Confirmed, true));
    }

    #[test]
    fn complete_only_from_confirmed() {
        assert!(can_transition(Confirmed, Completed, true));
        assert!(!can_transition(Pending, Completed, true));
        assert!(!can_transition(Cancelled, Completed, true));
    }

    #[test]
    fn cancel_from_any_non_terminal_status() {
        assert!(can_transition(Pending, Cancelled, true));
        assert!(can_transition(Confirmed, Cancelled, true));
        assert!(!can_transition(Completed, Cancelled, true));
        assert!(!can_transition(Cancelled, Cancelled, true));
    }

    #[test]
    fn terminal_statuses_offer_no_way_back() {
        for to in crate::models::AppointmentStatus::ALL {
            assert!(!can_transition(Completed, to, true));
            assert!(!can_transition(Cancelled, to, true));
        }
    }

    #[test]
    fn non_admins_cannot_transition_at_all() {
        for from in crate::models::AppointmentStatus::ALL {
            for to in crate::models::AppointmentStatus::ALL {
                assert!(!can_transition(from, to, false));
            }
        }
    }

    #[test]
    fn offered_actions_follow_the_transition_table() {
        assert_eq!(
            actions_for(Pending),
            vec![AdminAction::Confirm, AdminAction::Cancel]
        );
        assert_eq!(
            actions_for(Confirmed),
            vec![AdminAction::Complete, AdminAction::Cancel]
        );
        assert!(actions_for(Completed).is_empty());
        assert!(actions_for(Cancelled).is_empty());
    }

    #[test]
    fn action_names_round_trip() {
        for action in [AdminAction::Confirm, AdminAction::Complete, AdminAction::Cancel] {
            assert_eq!(AdminAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(AdminAction::parse("delete"), None);
    }
}
