pub mod color;
pub mod common;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod helpers;
pub mod map;
pub mod message;
pub mod palette;
pub mod persist;
pub mod sprite;
pub mod spriteset;
pub mod tile;
pub mod undo;
pub mod update;
