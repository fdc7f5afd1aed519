pub mod support;

mod config;
mod download;
mod filter;
mod quests;
