mod challenges;
mod common;
mod realtime;
mod scenarios;
