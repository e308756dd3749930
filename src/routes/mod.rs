pub mod cron;
pub mod message;
pub mod quota;
