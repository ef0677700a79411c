pub mod anti_cheat_log;
pub mod matches;
pub mod problem;
pub mod submission;
pub mod test_case;
pub mod test_case_result;
pub mod user;
pub mod user_profile;
