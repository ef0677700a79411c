pub mod anti_cheat;
pub mod health;
pub mod matches;
pub mod submissions;
pub mod users;
pub mod ws;
