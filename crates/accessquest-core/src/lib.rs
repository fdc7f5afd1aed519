//! AccessQuest Core Library
//!
//! Filter language, quest catalog, quest store and download orchestration for
//! accessibility surveys of OpenStreetMap data.

pub mod cancel;
pub mod changes;
pub mod check_date;
pub mod config;
pub mod countries;
pub mod db;
pub mod download;
pub mod element;
pub mod error;
pub mod filter;
pub mod format;
pub mod geo;
pub mod logging;
pub mod map_data;
pub mod quest;
pub mod reconcile;
pub mod tiles;
