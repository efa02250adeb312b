pub mod blocks;
pub mod canvas;
pub mod config;
pub mod controls;
pub mod document;
pub mod drag;
pub mod factory;
pub mod geometry;
pub mod hover;
pub mod ids;
pub mod snippets;
pub mod tree;
