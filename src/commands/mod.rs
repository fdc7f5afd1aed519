//! CLI commands for accessquest

pub mod auto_download;
pub mod dispatch;
pub mod download;
pub mod filter;
pub mod quest_types;
pub mod quests;
