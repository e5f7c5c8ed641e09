pub mod domain;
pub mod handlers;
pub mod repository;

pub use domain::{compute_pips, compute_stats, DiaryStats, Direction};
pub use repository::{DiaryRepository, SqliteDiaryRepository};
