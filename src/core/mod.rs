//! Core, platform independent routing code.

pub mod arp_cache;
pub mod check;
pub mod config;
pub mod dev;
pub mod repr;
pub mod route_table;
pub mod service;
pub mod time;
