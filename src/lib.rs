#![allow(clippy::new_without_default)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate lazy_static;

pub mod archive;
pub mod battery;
pub mod coordinates;
pub mod deployments;
pub mod dockserver;
pub mod extraction;
pub mod forecast;
pub mod logs;
pub mod sst;
pub mod transects;
pub mod utils;
pub mod waypoints;
