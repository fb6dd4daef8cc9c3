pub mod aws;
pub mod config;
pub mod failure;
pub mod handler;
pub mod local;
pub mod router;
pub mod secrets;
