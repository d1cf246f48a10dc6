//! # NenQuest - a chat RPG bot core
//!
//! Players create characters, move them between a handful of areas, search for
//! loot and fight enemies in a small dice-roll combat loop. Characters, their
//! inventories and the enemy/loot catalogues live in an embedded sled database.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nenquest::config::Config;
//! use nenquest::game::{CommandProcessor, GameService, GameStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = GameStore::open(&config.game.data_dir)?;
//!     let service = Arc::new(GameService::new(store, config.game.clone()));
//!     let commands = CommandProcessor::new(service);
//!     println!("{}", commands.handle("user-1", "CREATE Gon enhancer"));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - storage, encounter engine, service facade and text commands
//! - [`config`] - TOML configuration and validation
//! - [`validation`] - name, dice and option-list input validation
//! - [`metrics`] - process-wide counters
//! - [`logutil`] - single-line log escaping

pub mod config;
pub mod game;
pub mod logutil;
pub mod metrics;
pub mod validation;
