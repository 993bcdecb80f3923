// Library interface for newsbrief modules
// This allows tests and other binaries to import modules

pub mod compose;
pub mod deliver;
pub mod error;
pub mod fetch;
pub mod llm;
pub mod mail;
pub mod scheduler;
pub mod storage;
pub mod summarize;
pub mod workflow;
