pub mod config;
pub mod controller;
pub mod demo;
pub mod logging;
