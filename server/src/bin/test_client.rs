use shared::{encode_direction, ClientMessage, Item, ServerEvent, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

async fn send(
    socket: &UdpSocket,
    server_addr: SocketAddr,
    message: ClientMessage,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Sending {:?}", message);
    socket.send_to(&message.encode()?, server_addr).await?;
    Ok(())
}

/// Prints every event that arrives within `window`.
async fn drain(socket: &UdpSocket, window: Duration) {
    let mut buf = [0u8; 4096];
    while let Ok(Ok((len, _))) = timeout(window, socket.recv_from(&mut buf)).await {
        match ServerEvent::decode(&buf[0..len]) {
            Ok(ServerEvent::StateDelta(delta)) => {
                for avatar in delta.avatars {
                    println!(
                        "  Avatar {}: pos=({}, {}) hp={} temp={} hunger={}",
                        avatar.id, avatar.x, avatar.y, avatar.health, avatar.temperature, avatar.hunger
                    );
                }
                for creature in delta.creatures {
                    println!(
                        "  Creature {}/{}: pos=({}, {}) hp={}",
                        creature.species, creature.id, creature.x, creature.y, creature.health
                    );
                }
            }
            Ok(event) => println!("Received {:?}", event),
            Err(e) => println!("Failed to decode event: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Create local socket
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    let server_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string())
        .parse::<SocketAddr>()?;

    send(&socket, server_addr, ClientMessage::Connect { client_version: PROTOCOL_VERSION }).await?;

    // Wait for the init snapshot
    let mut buf = [0u8; 4096];
    let (len, addr) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf)).await??;
    println!("Received {} bytes from {}", len, addr);

    let init = match ServerEvent::decode(&buf[0..len])? {
        ServerEvent::Init(init) => init,
        other => {
            println!("Expected Init but got: {:?}", other);
            return Ok(());
        }
    };
    println!(
        "Spawned as avatar {} at spawn {} ({} avatars, {} creatures visible)",
        init.avatar_id,
        init.spawn_index,
        init.avatars.len(),
        init.creatures.len()
    );

    send(&socket, server_addr, ClientMessage::Join { username: "bot".to_string() }).await?;
    send(&socket, server_addr, ClientMessage::Chat { text: "hello".to_string() }).await?;

    // Walk in a square, swinging at whatever is in front
    let directions = [(0, -1), (1, 0), (0, 1), (-1, 0)];
    for (i, (x, y)) in directions.iter().cycle().take(8).enumerate() {
        send(&socket, server_addr, ClientMessage::Move { direction: encode_direction(*x, *y) }).await?;
        send(&socket, server_addr, ClientMessage::Rotate { angle: i as f32 * std::f32::consts::FRAC_PI_2 }).await?;
        send(&socket, server_addr, ClientMessage::AttackStart).await?;
        drain(&socket, Duration::from_millis(500)).await;
        send(&socket, server_addr, ClientMessage::AttackStop).await?;
    }

    send(&socket, server_addr, ClientMessage::Move { direction: encode_direction(0, 0) }).await?;
    send(&socket, server_addr, ClientMessage::Craft { item: Item::WoodSword.as_u8() }).await?;
    send(&socket, server_addr, ClientMessage::UseItem { slot: 0 }).await?;
    drain(&socket, Duration::from_millis(500)).await;

    sleep(Duration::from_millis(100)).await;
    send(&socket, server_addr, ClientMessage::Disconnect).await?;

    println!("Test client finished");
    Ok(())
}
