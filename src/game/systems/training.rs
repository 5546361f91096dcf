//! Training room: entering, leaving and raising stats

use crate::game::player::{GameRules, Player, Stat, Status, TrainError};
use crate::game::transition::{Event, TransitionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TrainingError {
    #[error("not in the training room (currently {0})")]
    NotTraining(Status),
    #[error(transparent)]
    Train(#[from] TrainError),
}

pub fn enter(player: &mut Player) -> Result<(), TransitionError> {
    player.apply(Event::EnterTraining).map(|_| ())
}

/// Leave the training room; a player with no points left graduates to gladiator
pub fn leave(player: &mut Player, rules: &GameRules) -> Result<Status, TransitionError> {
    let can_train = player.can_train(rules);
    player.apply(Event::LeaveTraining { can_train })
}

/// Raise one stat; returns the new value
pub fn train(player: &mut Player, stat: Stat, rules: &GameRules) -> Result<u16, TrainingError> {
    if player.status() != Status::Training {
        return Err(TrainingError::NotTraining(player.status()));
    }
    Ok(player.train(stat, rules)?)
}
