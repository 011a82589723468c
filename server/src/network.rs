//! Server network layer handling UDP communications and game loop coordination

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::game::{GameState, Outbound};
use log::{debug, error, info, warn};
use shared::{ClientMessage, ServerEvent, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// How often the game loop measures elapsed time and polls the scheduler.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        message: ClientMessage,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
        avatar_id: Option<u16>,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        event: ServerEvent,
        addr: SocketAddr,
    },
    /// Sent to every connection with a live avatar except `exclude`.
    BroadcastPacket {
        event: ServerEvent,
        exclude: Option<u16>,
    },
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game: GameState,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    /// Binds the UDP socket and builds the world from `config`
    ///
    /// No tasks run until [`Server::run`] is called.
    pub async fn new(addr: &str, config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_clients))),
            game: GameState::new(config),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Address the UDP socket is bound to, useful when binding to port 0
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match ClientMessage::decode(&buffer[0..len]) {
                        Ok(message) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { message, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Dropping packet from {}: {}", addr, e);
                        }
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { event, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &event, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { event, exclude } => {
                        let avatar_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.avatar_addrs()
                        };

                        for (avatar_id, addr) in avatar_addrs {
                            if Some(avatar_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &event, addr).await {
                                error!("Failed to send to avatar {}: {}", avatar_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client in timed_out {
                    let message = ServerMessage::ClientTimeout {
                        client_id: client.id,
                        avatar_id: client.avatar_id,
                    };
                    if let Err(e) = server_tx.send(message) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    /// Encodes and sends one event; failures are returned to the caller to log
    async fn send_packet_impl(
        socket: &UdpSocket,
        event: &ServerEvent,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = event.encode()?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Queues a packet for a single address
    fn send_packet(&self, event: ServerEvent, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { event, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Queues a packet for every connection with a live avatar
    fn broadcast_packet(&self, event: ServerEvent, exclude: Option<u16>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { event, exclude }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Spawns an avatar for a connection, or reports the server full.
    async fn attach_avatar(&mut self, client_id: u32, username: &str, addr: SocketAddr) {
        match self.game.spawn_avatar(username) {
            Some(avatar_id) => {
                let mut clients = self.clients.write().await;
                clients.set_avatar(client_id, Some(avatar_id));
            }
            None => {
                warn!("No avatar id available for client {}", client_id);
                self.clients.write().await.remove_client(&client_id);
                self.send_packet(
                    ServerEvent::Disconnected {
                        reason: "Server full".to_string(),
                    },
                    addr,
                );
            }
        }
    }

    /// Processes incoming packets and hands intents to the game state
    async fn handle_packet(&mut self, message: ClientMessage, addr: SocketAddr) {
        match message {
            ClientMessage::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    self.send_packet(
                        ServerEvent::Disconnected {
                            reason: "Protocol version mismatch".to_string(),
                        },
                        addr,
                    );
                    return;
                }

                // Remove existing connection if present
                let existing = {
                    let mut clients = self.clients.write().await;
                    let existing_id = clients.find_client_by_addr(addr);
                    existing_id.and_then(|id| clients.remove_client(&id))
                };
                if let Some(avatar_id) = existing.and_then(|client| client.avatar_id) {
                    self.game.remove_avatar(avatar_id);
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                match client_id {
                    Some(client_id) => self.attach_avatar(client_id, "", addr).await,
                    None => self.send_packet(
                        ServerEvent::Disconnected {
                            reason: "Server full".to_string(),
                        },
                        addr,
                    ),
                }
            }

            ClientMessage::Disconnect => {
                let removed = {
                    let mut clients = self.clients.write().await;
                    let client_id = clients.find_client_by_addr(addr);
                    client_id.and_then(|id| clients.remove_client(&id))
                };

                if let Some(avatar_id) = removed.and_then(|client| client.avatar_id) {
                    self.game.remove_avatar(avatar_id);
                }
            }

            message => {
                let (client_id, avatar_id) = {
                    let mut clients = self.clients.write().await;
                    match clients.touch(addr) {
                        Some(client_id) => (client_id, clients.avatar_of(client_id)),
                        None => {
                            warn!("Packet from unknown client at {}", addr);
                            return;
                        }
                    }
                };

                match (avatar_id, message) {
                    (Some(avatar_id), message) => self.game.handle_intent(avatar_id, message),
                    (None, ClientMessage::Join { username }) => {
                        self.attach_avatar(client_id, &username, addr).await;
                    }
                    (None, message) => {
                        debug!("Client {} has no avatar, ignoring {:?}", client_id, message);
                    }
                }
            }
        }

        self.flush().await;
    }

    /// Despawns the avatar of a connection that went silent.
    ///
    /// The avatar id was captured when the timeout was detected. If the avatar
    /// died since and its id now belongs to another live connection, nothing
    /// is removed.
    async fn handle_timeout(&mut self, client_id: u32, avatar_id: Option<u16>) {
        info!("Client {} timed out", client_id);

        if let Some(avatar_id) = avatar_id {
            let rebound = self.clients.read().await.addr_of_avatar(avatar_id).is_some();
            if rebound {
                debug!("Avatar {} already belongs to another connection", avatar_id);
            } else {
                self.game.remove_avatar(avatar_id);
            }
        }

        self.flush().await;
    }

    /// Routes queued game events to the network sender and unbinds avatars
    /// that died.
    async fn flush(&mut self) {
        let outbound = self.game.drain_outbound();
        if !outbound.is_empty() {
            let clients = self.clients.read().await;
            for out in outbound {
                match out {
                    Outbound::To(avatar_id, event) => match clients.addr_of_avatar(avatar_id) {
                        Some(addr) => self.send_packet(event, addr),
                        None => debug!("No connection for avatar {}", avatar_id),
                    },
                    Outbound::Broadcast { event, exclude } => self.broadcast_packet(event, exclude),
                }
            }
        }

        let fallen = self.game.take_fallen();
        if !fallen.is_empty() {
            let mut clients = self.clients.write().await;
            for avatar_id in fallen {
                clients.clear_avatar(avatar_id);
            }
        }
    }

    /// Main server loop coordinating all operations
    ///
    /// Spawns the receiver, sender and timeout tasks, then advances the game
    /// by real elapsed time every `POLL_INTERVAL`. Returns on shutdown.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut poll_interval = interval(POLL_INTERVAL);
        let mut last_poll = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { message, addr }) => {
                            self.handle_packet(message, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id, avatar_id }) => {
                            self.handle_timeout(client_id, avatar_id).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Advance the game clock
                _ = poll_interval.tick() => {
                    let now = Instant::now();
                    let elapsed = now.duration_since(last_poll);
                    last_poll = now;

                    self.game.advance(elapsed);
                    self.flush().await;
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldLayout;
    use crate::physics::Vector2;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio_test::assert_ok;

    fn test_config(max_clients: usize) -> ServerConfig {
        ServerConfig {
            max_clients,
            seed: Some(1),
            creatures_enabled: false,
            world: WorldLayout::single_spawn(1000.0, 1000.0, Vector2::new(500.0, 500.0)),
            ..ServerConfig::default()
        }
    }

    fn client_addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    fn queued(server: &mut Server) -> Vec<GameMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = server.game_rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[test]
    fn test_server_message_creation() {
        let addr = client_addr(8080);
        let msg = ServerMessage::PacketReceived {
            message: ClientMessage::Connect { client_version: 1 },
            addr,
        };

        match msg {
            ServerMessage::PacketReceived { message, addr: a } => {
                assert_eq!(a, addr);
                assert_eq!(message, ClientMessage::Connect { client_version: 1 });
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

        let msg = ServerMessage::ClientTimeout {
            client_id: 42,
            avatar_id: Some(3),
        };
        assert_ok!(tx.send(msg));

        match rx.try_recv() {
            Ok(ServerMessage::ClientTimeout { client_id, avatar_id }) => {
                assert_eq!(client_id, 42);
                assert_eq!(avatar_id, Some(3));
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_address_validation() {
        let valid_addrs = vec!["127.0.0.1:8080", "0.0.0.0:0", "[::1]:8080"];
        for addr_str in valid_addrs {
            assert!(addr_str.parse::<SocketAddr>().is_ok(), "Failed to parse address: {}", addr_str);
        }

        let invalid_addrs = vec!["invalid", "127.0.0.1:99999", "256.256.256.256:8080", ""];
        for addr_str in invalid_addrs {
            assert!(addr_str.parse::<SocketAddr>().is_err(), "Should fail to parse: {}", addr_str);
        }
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = Server::new("127.0.0.1:0", test_config(4)).await.unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_connect_spawns_avatar_and_sends_init() {
        let mut server = Server::new("127.0.0.1:0", test_config(4)).await.unwrap();
        let addr = client_addr(40001);

        server
            .handle_packet(ClientMessage::Connect { client_version: PROTOCOL_VERSION }, addr)
            .await;

        let client_id = server.clients.read().await.find_client_by_addr(addr).unwrap();
        let avatar_id = server.clients.read().await.avatar_of(client_id).unwrap();
        assert_eq!(server.game.avatar_count(), 1);

        let messages = queued(&mut server);
        assert!(messages.iter().any(|message| matches!(
            message,
            GameMessage::SendPacket { event: ServerEvent::Init(init), addr: a }
                if init.avatar_id == avatar_id && *a == addr
        )));
    }

    #[tokio::test]
    async fn test_version_mismatch_rejected() {
        let mut server = Server::new("127.0.0.1:0", test_config(4)).await.unwrap();
        server
            .handle_packet(ClientMessage::Connect { client_version: 999 }, client_addr(40002))
            .await;

        assert!(server.clients.read().await.is_empty());
        let messages = queued(&mut server);
        assert!(matches!(
            &messages[0],
            GameMessage::SendPacket { event: ServerEvent::Disconnected { reason }, .. }
                if reason == "Protocol version mismatch"
        ));
    }

    #[tokio::test]
    async fn test_server_full() {
        let mut server = Server::new("127.0.0.1:0", test_config(1)).await.unwrap();
        server
            .handle_packet(ClientMessage::Connect { client_version: PROTOCOL_VERSION }, client_addr(40003))
            .await;
        queued(&mut server);

        server
            .handle_packet(ClientMessage::Connect { client_version: PROTOCOL_VERSION }, client_addr(40004))
            .await;

        assert_eq!(server.clients.read().await.len(), 1);
        let messages = queued(&mut server);
        assert!(messages.iter().any(|message| matches!(
            message,
            GameMessage::SendPacket { event: ServerEvent::Disconnected { reason }, .. }
                if reason == "Server full"
        )));
    }

    #[tokio::test]
    async fn test_disconnect_removes_avatar() {
        let mut server = Server::new("127.0.0.1:0", test_config(4)).await.unwrap();
        let addr = client_addr(40005);
        server
            .handle_packet(ClientMessage::Connect { client_version: PROTOCOL_VERSION }, addr)
            .await;
        server.handle_packet(ClientMessage::Disconnect, addr).await;

        assert!(server.clients.read().await.is_empty());
        assert_eq!(server.game.avatar_count(), 0);
    }

    #[tokio::test]
    async fn test_packets_from_unknown_clients_ignored() {
        let mut server = Server::new("127.0.0.1:0", test_config(4)).await.unwrap();
        server
            .handle_packet(ClientMessage::Join { username: "ghost".into() }, client_addr(40006))
            .await;

        assert_eq!(server.game.avatar_count(), 0);
        assert!(queued(&mut server).is_empty());
    }

    #[tokio::test]
    async fn test_stale_timeout_keeps_reused_avatar() {
        let mut server = Server::new("127.0.0.1:0", test_config(4)).await.unwrap();
        let silent = client_addr(40008);
        let fresh = client_addr(40009);

        server
            .handle_packet(ClientMessage::Connect { client_version: PROTOCOL_VERSION }, silent)
            .await;
        let (silent_client, avatar_id) = {
            let mut clients = server.clients.write().await;
            let client_id = clients.find_client_by_addr(silent).unwrap();
            let client = clients.remove_client(&client_id).unwrap();
            (client.id, client.avatar_id)
        };

        // The avatar dies and its id goes to the next connection.
        assert!(server.game.remove_avatar(avatar_id.unwrap()));
        server
            .handle_packet(ClientMessage::Connect { client_version: PROTOCOL_VERSION }, fresh)
            .await;
        let fresh_client = server.clients.read().await.find_client_by_addr(fresh).unwrap();
        assert_eq!(server.clients.read().await.avatar_of(fresh_client), avatar_id);

        server.handle_timeout(silent_client, avatar_id).await;
        assert!(server.game.avatar(avatar_id.unwrap()).is_some());
        assert_eq!(server.game.avatar_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_removes_avatar() {
        let mut server = Server::new("127.0.0.1:0", test_config(4)).await.unwrap();
        let addr = client_addr(40010);
        server
            .handle_packet(ClientMessage::Connect { client_version: PROTOCOL_VERSION }, addr)
            .await;

        let removed = {
            let mut clients = server.clients.write().await;
            let client_id = clients.find_client_by_addr(addr).unwrap();
            clients.remove_client(&client_id).unwrap()
        };
        server.handle_timeout(removed.id, removed.avatar_id).await;
        assert_eq!(server.game.avatar_count(), 0);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_previous_avatar() {
        let mut server = Server::new("127.0.0.1:0", test_config(4)).await.unwrap();
        let addr = client_addr(40007);
        for _ in 0..3 {
            server
                .handle_packet(ClientMessage::Connect { client_version: PROTOCOL_VERSION }, addr)
                .await;
        }

        assert_eq!(server.clients.read().await.len(), 1);
        assert_eq!(server.game.avatar_count(), 1);
    }
}
