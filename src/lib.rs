//! jobtrack keeps a Trello job-application board in sync with Gmail
//! replies and re-checks whether tracked postings are still live.

pub mod app;
pub mod config;
pub mod error;
pub mod gmail;
pub mod llm;
pub mod notify;
pub mod pipeline;
pub mod trello;
