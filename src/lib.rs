// StudyHub: study-group collaboration with extractive summaries
//
// This is the library root. Each module corresponds to a major subsystem:
// summarization, document extraction, storage, and the web/chat server.

pub mod config;
pub mod db;
pub mod documents;
pub mod output;
pub mod pipeline;
pub mod status;
pub mod summary;

#[cfg(feature = "web")]
pub mod web;
