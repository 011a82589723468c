//! # Survival Game Server Library
//!
//! Authoritative server for a top-down multiplayer survival game. The server
//! owns the canonical world: avatars move, harvest resources, craft tools,
//! fight each other and roaming creatures, and keep their vitals up. Clients
//! only send intents and render what the server tells them.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Every intent is validated against server state before it has any effect.
//! Movement, attacks, crafting and item use are resolved here, on a fixed
//! simulation tick driven by a cooperative scheduler.
//!
//! ### Interest Management
//! Each avatar sees only the avatars and creatures within the interest radius.
//! Per-tick deltas, chat and removals are filtered through that nearby-set.
//!
//! ### Delta Synchronization
//! Entity state is compared against what was last sent and only the entities
//! whose payload changed are included in the next delta.
//!
//! ## Architecture Design
//!
//! ### Single Writer
//! All game state lives in [`game::GameState`], owned by the main server loop.
//! Network tasks hand decoded messages to that loop over channels and receive
//! encoded events back, so the simulation never needs a lock.
//!
//! ### UDP-Based Communication
//! Each datagram carries one message: a tag byte followed by a bincode body.
//!
//! ## Module Organization
//!
//! - `tick`: fixed-step timers and the scheduler that drives them
//! - `physics`: vector math and the circle-body world
//! - `ids`: per-class id pools with front-of-pool reuse
//! - `avatar`, `collectable`, `creature`, `registry`: the entities
//! - `items`, `inventory`, `crafting`: item rules and the slot inventory
//! - `combat`: hit regions and attack resolution
//! - `sync`: per-entity change tracking and nearby-set filtering
//! - `game`: the world state tying it together
//! - `client_manager`, `network`: connections and the UDP transport
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080", ServerConfig::default()).await?;
//!
//!     // Receives intents, advances the simulation and pushes events until
//!     // shut down.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod avatar;
pub mod client_manager;
pub mod collectable;
pub mod combat;
pub mod config;
pub mod crafting;
pub mod creature;
pub mod error;
pub mod game;
pub mod ids;
pub mod inventory;
pub mod items;
pub mod network;
pub mod physics;
pub mod registry;
pub mod sync;
pub mod tick;
