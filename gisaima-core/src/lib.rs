//! The simulation engine: entity model, command handlers, and the
//! tick-driven world clock, all built against the `gisaima-store` `Store`
//! trait rather than any concrete backend.

pub mod catalog;
pub mod chat;
pub mod command;
pub mod entities;
pub mod monster_ai;
pub mod paths;
pub mod tick;

pub use catalog::{Catalog, StaticCatalog};
pub use command::{dispatch, CommandContext, CommandEffect, CommandRequest, CommandResult};
pub use monster_ai::{MonsterAi, MonsterDecision, ReflexMonsterAi};
pub use tick::{MonsterTuning, TickEngine, TickReport};
