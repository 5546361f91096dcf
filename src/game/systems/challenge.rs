//! Challenges between gladiators
//!
//! A challenge makes the issuer a CHALLENGER and resets the target to
//! GLADIATOR with a pending opponent reference. Accepting a pending challenge
//! puts both into the arena with fresh combat counters.

use tracing::info;

use crate::game::player::{PlayerId, Status};
use crate::game::registry::Registry;
use crate::game::transition::{Event, TransitionError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChallengeError {
    #[error(transparent)]
    NotADuelist(#[from] TransitionError),
    #[error("No such gladiator as '{0}'.")]
    NoSuchGladiator(String),
    #[error("They're no gladiator!")]
    TargetNotGladiator,
    #[error("You can't challenge yourself.")]
    SelfChallenge,
    #[error("Player {0} is not registered")]
    UnknownPlayer(PlayerId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcceptError {
    #[error(transparent)]
    NotADuelist(#[from] TransitionError),
    #[error("You've not been challenged.")]
    NotChallenged,
    #[error("Player {0} is not registered")]
    UnknownPlayer(PlayerId),
}

/// Issue a challenge from `challenger` to the player named `target_name`
pub fn challenge(
    registry: &mut Registry,
    challenger: PlayerId,
    target_name: &str,
) -> Result<PlayerId, ChallengeError> {
    let status = registry
        .get(challenger)
        .map(|p| p.status())
        .ok_or(ChallengeError::UnknownPlayer(challenger))?;
    if !status.is_duelist() {
        return Err(TransitionError { from: status, event: Event::IssueChallenge }.into());
    }

    let target = registry
        .lookup(target_name)
        .ok_or_else(|| ChallengeError::NoSuchGladiator(target_name.to_string()))?;
    if target == challenger {
        return Err(ChallengeError::SelfChallenge);
    }
    let target_status = registry
        .get(target)
        .map(|p| p.status())
        .ok_or(ChallengeError::UnknownPlayer(target))?;
    if !target_status.is_duelist() {
        return Err(ChallengeError::TargetNotGladiator);
    }

    if let Some(player) = registry.get_mut(challenger) {
        player.apply(Event::IssueChallenge)?;
        player.set_opponent(Some(target));
    }
    if let Some(player) = registry.get_mut(target) {
        player.apply(Event::ReceiveChallenge)?;
        player.set_opponent(Some(challenger));
    }
    info!("{} challenged {}", challenger, target);
    Ok(target)
}

/// The challenger `accepter` could accept right now, without changing state
///
/// The pending opponent must still be connected, still be a CHALLENGER and
/// still be challenging `accepter`.
pub fn pending_challenger(registry: &Registry, accepter: PlayerId) -> Result<PlayerId, AcceptError> {
    let (status, pending) = registry
        .get(accepter)
        .map(|p| (p.status(), p.opponent()))
        .ok_or(AcceptError::UnknownPlayer(accepter))?;
    if !status.is_duelist() {
        return Err(TransitionError { from: status, event: Event::Accept }.into());
    }

    pending
        .filter(|id| {
            registry.get(*id).is_some_and(|p| {
                p.status() == Status::Challenger && p.opponent() == Some(accepter)
            })
        })
        .ok_or(AcceptError::NotChallenged)
}

/// Accept the challenge pending against `accepter`; returns the challenger
pub fn accept(registry: &mut Registry, accepter: PlayerId) -> Result<PlayerId, AcceptError> {
    let challenger = pending_challenger(registry, accepter)?;

    for id in [accepter, challenger] {
        if let Some(player) = registry.get_mut(id) {
            player.apply(Event::Accept)?;
            player.ready_for_fight();
        }
    }
    info!("{} accepted a challenge from {}", accepter, challenger);
    Ok(challenger)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::game::outbox::Inbox;

    use crate::game::player::{PlayerId, Stats, Status};
    use crate::game::registry::test_support::join;
    use crate::game::registry::Registry;
    use crate::game::systems::character;

    /// Register and name a player, then make them a gladiator directly
    pub fn gladiator(
        registry: &mut Registry,
        port: u16,
        name: &str,
    ) -> (PlayerId, Inbox) {
        let (id, rx) = join(registry, port);
        character::create(registry, id, name).unwrap();
        let player = registry.get_mut(id).unwrap();
        player.stats = Stats::new(6, 6, 6, 6, 6);
        player.force_status(Status::Gladiator);
        (id, rx)
    }
}
