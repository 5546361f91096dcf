pub mod constants;
pub mod dice;
pub mod outbox;
pub mod player;
pub mod registry;
pub mod systems;
pub mod transition;
