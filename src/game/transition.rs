//! Player status state machine
//!
//! Every status change goes through [`next`], so the legality of a move lives
//! in one table instead of being spread across command handlers.

use std::fmt;

use crate::game::player::Status;

/// Something that can move a player between statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Character created with a valid, unique name
    Create,
    /// Walked into the training room
    EnterTraining,
    /// Walked out of the training room; `can_train` is whether points remain
    LeaveTraining { can_train: bool },
    /// Issued a challenge to another gladiator
    IssueChallenge,
    /// Was challenged by another gladiator
    ReceiveChallenge,
    /// Accepted (or had accepted) a pending challenge
    Accept,
    /// The fight reached a terminal outcome
    FightOver,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Event::Create => "create",
            Event::EnterTraining => "enter training",
            Event::LeaveTraining { .. } => "leave training",
            Event::IssueChallenge => "issue challenge",
            Event::ReceiveChallenge => "receive challenge",
            Event::Accept => "accept",
            Event::FightOver => "fight over",
        };
        f.write_str(name)
    }
}

/// A transition that the table does not allow
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {event} while {from}")]
pub struct TransitionError {
    pub from: Status,
    pub event: Event,
}

/// Look up the status reached from `from` on `event`
pub fn next(from: Status, event: Event) -> Result<Status, TransitionError> {
    use Status::*;

    let to = match (from, event) {
        (Crowd, Event::Create) => Citizen,
        (Citizen, Event::EnterTraining) => Training,
        (Training, Event::LeaveTraining { can_train: true }) => Citizen,
        (Training, Event::LeaveTraining { can_train: false }) => Gladiator,
        (Gladiator | Challenger, Event::IssueChallenge) => Challenger,
        (Gladiator | Challenger, Event::ReceiveChallenge) => Gladiator,
        (Gladiator | Challenger, Event::Accept) => Fighting,
        (Fighting, Event::FightOver) => Gladiator,
        _ => return Err(TransitionError { from, event }),
    };
    Ok(to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_path() {
        assert_eq!(next(Status::Crowd, Event::Create), Ok(Status::Citizen));
        assert_eq!(next(Status::Citizen, Event::EnterTraining), Ok(Status::Training));
        assert_eq!(
            next(Status::Training, Event::LeaveTraining { can_train: true }),
            Ok(Status::Citizen)
        );
        assert_eq!(
            next(Status::Training, Event::LeaveTraining { can_train: false }),
            Ok(Status::Gladiator)
        );
    }

    #[test]
    fn test_duel_path() {
        assert_eq!(next(Status::Gladiator, Event::IssueChallenge), Ok(Status::Challenger));
        assert_eq!(next(Status::Challenger, Event::IssueChallenge), Ok(Status::Challenger));
        assert_eq!(next(Status::Challenger, Event::ReceiveChallenge), Ok(Status::Gladiator));
        assert_eq!(next(Status::Gladiator, Event::Accept), Ok(Status::Fighting));
        assert_eq!(next(Status::Challenger, Event::Accept), Ok(Status::Fighting));
        assert_eq!(next(Status::Fighting, Event::FightOver), Ok(Status::Gladiator));
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(next(Status::Citizen, Event::Create).is_err());
        assert!(next(Status::Gladiator, Event::EnterTraining).is_err());
        assert!(next(Status::Citizen, Event::IssueChallenge).is_err());
        assert!(next(Status::Training, Event::ReceiveChallenge).is_err());
        assert!(next(Status::Fighting, Event::IssueChallenge).is_err());
        assert!(next(Status::Gladiator, Event::FightOver).is_err());

        let err = next(Status::Crowd, Event::Accept).unwrap_err();
        assert_eq!(err.from, Status::Crowd);
        assert_eq!(err.event, Event::Accept);
    }
}
