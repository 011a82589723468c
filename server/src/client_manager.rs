//! Client connection management for the game server
//!
//! This module handles the server-side bookkeeping of connected clients:
//! - Client connection lifecycle (connect, disconnect, timeout)
//! - Mapping between network addresses, connections and avatars
//! - Client capacity management
//!
//! A connection outlives its avatar: when an avatar dies the connection stays
//! registered without one until the client joins again.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Silence after which a client is considered gone.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected client
#[derive(Debug)]
pub struct Client {
    /// Unique connection identifier assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Avatar controlled by this connection, if it is alive
    pub avatar_id: Option<u16>,
}

impl Client {
    /// Creates a connection record with no avatar bound yet
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            avatar_id: None,
        }
    }

    /// Marks the client as recently active
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if no packets have been received from this client
    /// within `timeout`, indicating a likely disconnect.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Enforces the server capacity limit and resolves which avatar an incoming
/// packet belongs to and which address an outgoing event goes to.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    /// Creates an empty manager accepting at most `max_clients` connections
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns Some(client_id) if successful, None if the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    /// Removes a client from the server and hands it back so its avatar can
    /// be cleaned up. Returns None if it was already gone.
    pub fn remove_client(&mut self, client_id: &u32) -> Option<Client> {
        let client = self.clients.remove(client_id)?;
        info!("Client {} disconnected", client.id);
        Some(client)
    }

    /// Finds a client ID by its network address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Refreshes the activity timestamp of the client at `addr`
    ///
    /// Returns the client's ID, or None if the address is not connected.
    pub fn touch(&mut self, addr: SocketAddr) -> Option<u32> {
        let client = self.clients.values_mut().find(|client| client.addr == addr)?;
        client.touch();
        Some(client.id)
    }

    /// Binds or unbinds the avatar controlled by a connection
    ///
    /// Returns false if the client is unknown.
    pub fn set_avatar(&mut self, client_id: u32, avatar_id: Option<u16>) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.avatar_id = avatar_id;
                true
            }
            None => false,
        }
    }

    /// Avatar controlled by a connection, None while it has no live avatar
    pub fn avatar_of(&self, client_id: u32) -> Option<u16> {
        self.clients.get(&client_id)?.avatar_id
    }

    /// Unbinds `avatar_id` from whichever connection controls it
    ///
    /// Called when an avatar dies; the connection itself stays registered.
    pub fn clear_avatar(&mut self, avatar_id: u16) -> Option<u32> {
        let client = self
            .clients
            .values_mut()
            .find(|client| client.avatar_id == Some(avatar_id))?;
        client.avatar_id = None;
        Some(client.id)
    }

    /// Address of the connection controlling `avatar_id`
    ///
    /// Used to route events addressed to a single avatar.
    pub fn addr_of_avatar(&self, avatar_id: u16) -> Option<SocketAddr> {
        self.clients
            .values()
            .find(|client| client.avatar_id == Some(avatar_id))
            .map(|client| client.addr)
    }

    /// Checks for and removes timed-out clients
    ///
    /// Returns the removed clients so their avatars can be despawned.
    pub fn check_timeouts(&mut self) -> Vec<Client> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(CLIENT_TIMEOUT))
            .map(|(id, _)| *id)
            .collect();

        timed_out
            .iter()
            .filter_map(|client_id| self.remove_client(client_id))
            .collect()
    }

    /// Addresses of every connection with a live avatar, keyed by avatar id
    pub fn avatar_addrs(&self) -> Vec<(u16, SocketAddr)> {
        self.clients
            .values()
            .filter_map(|client| client.avatar_id.map(|avatar_id| (avatar_id, client.addr)))
            .collect()
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
