pub mod formatter;
pub mod handlers;
pub mod history;
pub mod llm;
pub mod repository;
