// src/services/status_engine.rs

// Máquina de estados do ciclo de vida da carga. Funções puras: quem grava é o
// LoadService, com compare-and-set sobre o status lido aqui.

use crate::{common::error::AppError, models::loads::LoadStatus, models::tenancy::AppRole};

/// Próximos status válidos a partir de `status`.
pub fn allowed_next(status: LoadStatus) -> &'static [LoadStatus] {
    use LoadStatus::*;
    match status {
        Pending => &[Assigned, Cancelled],
        Assigned => &[Picked, Pending, Cancelled],
        Picked => &[InTransit, Cancelled],
        InTransit => &[Delivered, Cancelled],
        Delivered | Cancelled => &[],
    }
}

pub fn is_terminal(status: LoadStatus) -> bool {
    allowed_next(status).is_empty()
}

pub fn validate(from: LoadStatus, to: LoadStatus) -> Result<(), AppError> {
    if allowed_next(from).contains(&to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from,
            to,
            allowed: allowed_next(from).to_vec(),
        })
    }
}

/// Papéis que podem mover cargas. Motoristas ainda passam pela checagem de
/// posse da carga no serviço.
pub fn actor_may_transition(role: Option<AppRole>, is_super_admin: bool) -> bool {
    if is_super_admin {
        return true;
    }
    matches!(
        role,
        Some(AppRole::Admin | AppRole::Dispatcher | AppRole::Sales | AppRole::Driver)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use LoadStatus::*;

    const ALL: [LoadStatus; 6] = [Pending, Assigned, Picked, InTransit, Delivered, Cancelled];

    #[test]
    fn happy_path_is_allowed() {
        for (from, to) in [(Pending, Assigned), (Assigned, Picked), (Picked, InTransit), (InTransit, Delivered)] {
            assert!(validate(from, to).is_ok(), "{:?} -> {:?}", from, to);
        }
    }

    #[test]
    fn skipping_a_stage_is_rejected_with_allowed_set() {
        match validate(Picked, Delivered) {
            Err(AppError::InvalidTransition { from, to, allowed }) => {
                assert_eq!(from, Picked);
                assert_eq!(to, Delivered);
                assert_eq!(allowed, vec![InTransit, Cancelled]);
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for to in ALL {
            assert!(validate(Delivered, to).is_err());
            assert!(validate(Cancelled, to).is_err());
        }
        assert!(is_terminal(Delivered) && is_terminal(Cancelled));
    }

    #[test]
    fn every_live_state_can_be_cancelled() {
        for from in [Pending, Assigned, Picked, InTransit] {
            assert!(validate(from, Cancelled).is_ok());
        }
    }

    #[test]
    fn only_assigned_may_return_to_pending() {
        for from in ALL {
            let ok = validate(from, Pending).is_ok();
            assert_eq!(ok, from == Assigned, "{:?} -> pending", from);
        }
    }

    #[test]
    fn self_transitions_are_invalid() {
        for s in ALL {
            assert!(validate(s, s).is_err());
        }
    }

    #[test]
    fn carriers_and_brokers_cannot_move_loads() {
        assert!(!actor_may_transition(Some(AppRole::Carrier), false));
        assert!(!actor_may_transition(Some(AppRole::Broker), false));
        assert!(!actor_may_transition(Some(AppRole::Treasury), false));
        assert!(actor_may_transition(Some(AppRole::Driver), false));
        assert!(actor_may_transition(None, true));
    }
}
