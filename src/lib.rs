#![allow(clippy::new_without_default)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate lazy_static;

pub mod api_server;
pub mod config;
pub mod journey;
pub mod journey_service;
pub mod location;
pub mod logs;
pub mod session;
pub mod upload_service;
