// Multi-step workflows that tie extraction, summarization and storage together.

pub mod batch;
