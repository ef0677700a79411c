pub mod anti_cheat;
pub mod duel;
pub mod submission;
pub mod user;
