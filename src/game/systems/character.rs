//! Character creation: naming a crowd member

use tracing::info;

use crate::game::constants::rules::{NAME_MAX_LEN, NAME_MIN_LEN};
use crate::game::player::{PlayerId, Status};
use crate::game::registry::Registry;
use crate::game::transition::{Event, TransitionError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreateError {
    #[error("Names must be {}-{} letters long.", NAME_MIN_LEN, NAME_MAX_LEN)]
    BadLength,
    #[error("That name is in use.")]
    NameTaken,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Player {0} is not registered")]
    UnknownPlayer(PlayerId),
}

/// Capitalise the first letter, leaving the rest as typed
pub fn display_name(requested: &str) -> String {
    let mut chars = requested.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Name a crowd member and make them a citizen
///
/// Uniqueness is checked against every registered name, ignoring case. The
/// caller holds the registry lock, so two sessions racing for the same name
/// cannot both pass the check.
pub fn create(registry: &mut Registry, id: PlayerId, requested: &str) -> Result<String, CreateError> {
    let status = registry
        .get(id)
        .map(|p| p.status())
        .ok_or(CreateError::UnknownPlayer(id))?;
    if status != Status::Crowd {
        return Err(TransitionError { from: status, event: Event::Create }.into());
    }

    let len = requested.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Err(CreateError::BadLength);
    }
    if registry.lookup(requested).is_some() {
        return Err(CreateError::NameTaken);
    }

    let name = display_name(requested);
    let player = registry.get_mut(id).ok_or(CreateError::UnknownPlayer(id))?;
    player.apply(Event::Create)?;
    player.set_name(name.clone());
    info!("{} created character {}", id, name);
    Ok(name)
}
