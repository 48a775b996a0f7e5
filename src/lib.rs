pub mod auth;
pub mod cli;
pub mod common;
pub mod downloader;
pub mod ui;
