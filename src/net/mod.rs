pub mod game_session;
pub mod line;
pub mod session;
pub mod transport;
