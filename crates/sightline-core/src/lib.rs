//! Core types and definitions for the SIGHTLINE visibility simulation.
//!
//! This crate defines the vocabulary shared across all other crates:
//! fixed-point units, players and alliances, components, object specs,
//! snapshots, events, configuration and deterministic integer math.
//! It has no dependency on the ECS or any runtime framework.

pub mod commands;
pub mod components;
pub mod config;
pub mod constants;
pub mod enums;
pub mod events;
pub mod math;
pub mod player;
pub mod state;
pub mod types;
