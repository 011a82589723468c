//! Performance benchmarks for critical game systems

use server::config::{ServerConfig, WorldLayout};
use server::crafting;
use server::game::GameState;
use server::inventory::Inventory;
use server::physics::Vector2;
use shared::{
    encode_direction, AvatarPayload, ClientMessage, DeltaPayload, Item, ServerEvent, PROTOCOL_VERSION,
};
use std::time::{Duration, Instant};

fn crowded_game(avatars: u16) -> (GameState, Vec<u16>) {
    let config = ServerConfig {
        seed: Some(3),
        max_clients: avatars as usize,
        world: WorldLayout::default(),
        ..ServerConfig::default()
    };
    let mut game = GameState::new(config);
    let ids: Vec<u16> = (0..avatars)
        .filter_map(|i| game.spawn_avatar(&format!("bot{}", i)))
        .collect();
    (game, ids)
}

/// Benchmarks full simulation ticks with a busy server
#[test]
fn benchmark_simulation_ticks() {
    let (mut game, ids) = crowded_game(100);
    assert_eq!(ids.len(), 100);

    for (i, id) in ids.iter().enumerate() {
        let direction = match i % 4 {
            0 => encode_direction(1, 0),
            1 => encode_direction(-1, 0),
            2 => encode_direction(0, 1),
            _ => encode_direction(0, -1),
        };
        game.handle_intent(*id, ClientMessage::Move { direction });
    }

    let interval = game.config().tick_duration();
    let iterations = 150;
    let start = Instant::now();

    for _ in 0..iterations {
        game.advance(interval);
        let _ = game.drain_outbound();
    }

    let duration = start.elapsed();
    println!(
        "Simulation: {} ticks with {} avatars in {:?} ({:.2} ms/tick)",
        iterations,
        ids.len(),
        duration,
        duration.as_secs_f64() * 1000.0 / iterations as f64
    );

    // Ten seconds of game time should simulate well within ten seconds
    assert!(duration < Duration::from_secs(10));
}

/// Benchmarks attack resolution with everyone swinging
#[test]
fn benchmark_attack_storm() {
    let (mut game, ids) = crowded_game(50);

    let iterations = 20;
    let start = Instant::now();

    for _ in 0..iterations {
        for id in &ids {
            game.handle_intent(*id, ClientMessage::AttackStart);
            game.handle_intent(*id, ClientMessage::AttackStop);
        }
        game.advance(Duration::from_millis(500));
        let _ = game.drain_outbound();
        let _ = game.take_fallen();
    }

    let duration = start.elapsed();
    println!("Attack storm: {} rounds in {:?}", iterations, duration);

    assert!(duration < Duration::from_secs(5));
}

/// Benchmarks crafting against a full inventory
#[test]
fn benchmark_crafting() {
    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let mut inventory = Inventory::new();
        inventory.add(Item::Wood, 100);
        inventory.add(Item::Stone, 100);
        crafting::craft(&mut inventory, Item::StoneSword).unwrap();
        crafting::craft(&mut inventory, Item::StonePickaxe).unwrap();
        let _ = crafting::craft(&mut inventory, Item::StoneHelmet);
    }

    let duration = start.elapsed();
    println!(
        "Crafting: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks wire encoding of large deltas
#[test]
fn benchmark_event_encoding() {
    let avatars: Vec<AvatarPayload> = (0..100)
        .map(|i| AvatarPayload {
            id: i,
            x: i as i32 * 10,
            y: 500,
            angle: 157,
            helmet: 0,
            weapon: Item::WoodSword.as_u8(),
            health: 200,
            temperature: 100,
            hunger: 100,
        })
        .collect();
    let event = ServerEvent::StateDelta(DeltaPayload {
        avatars,
        creatures: Vec::new(),
    });

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let encoded = event.encode().unwrap();
        let _decoded = ServerEvent::decode(&encoded).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Event encoding: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 3000);
}

/// Stress tests intent decoding under high load
#[test]
fn stress_test_many_intents() {
    let messages = vec![
        ClientMessage::Connect { client_version: PROTOCOL_VERSION },
        ClientMessage::Move { direction: encode_direction(1, 1) },
        ClientMessage::Rotate { angle: 1.25 },
        ClientMessage::Chat { text: "hello there".to_string() },
        ClientMessage::Craft { item: Item::WoodSword.as_u8() },
    ];
    let frames: Vec<Vec<u8>> = messages.iter().map(|m| m.encode().unwrap()).collect();

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let frame = &frames[i % frames.len()];
        let _ = ClientMessage::decode(frame).unwrap();
    }

    let duration = start.elapsed();
    println!("Intent decoding: {} frames in {:?}", iterations, duration);

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks interest filtering with avatars spread over the map
#[test]
fn benchmark_spread_out_interest() {
    let (mut game, ids) = crowded_game(100);
    for (i, id) in ids.iter().enumerate() {
        let x = 100.0 + (i % 10) as f32 * 280.0;
        let y = 100.0 + (i / 10) as f32 * 280.0;
        game.set_avatar_position(*id, Vector2::new(x, y));
    }

    let interval = game.config().tick_duration();
    let start = Instant::now();
    for _ in 0..50 {
        game.advance(interval);
        let _ = game.drain_outbound();
    }
    let duration = start.elapsed();
    println!("Spread interest: 50 ticks in {:?}", duration);

    let avatar = game.avatar(ids[0]).unwrap();
    assert!(avatar.nearby_avatars.len() < ids.len() - 1);
    assert!(duration < Duration::from_secs(5));
}
