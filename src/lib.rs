//! Burst-and-coast locomotion, arena boundaries, predator movement and
//! predation for agent-based simulations of collective animal motion.
//!
//! Every routine advances a single agent or predator by one tick and is meant
//! to be called once per tick by an outer loop, such as [`engine::Engine`].

pub mod boundary;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod locomotion;
pub mod manager;
pub mod model;
pub mod predation;
pub mod predator;
pub mod predict;
