pub mod cases;
pub mod config;
pub mod dispatch;
pub mod job;
