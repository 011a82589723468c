//! Wire protocol shared between the game server and its clients.
//!
//! Every message is a single tag byte followed by the bincode encoding of the
//! tag's payload. Payloads are plain structs whose fields encode in declaration
//! order without keys, so the field order of every struct in this crate *is*
//! the wire format and must not be reordered.

use bincode::{deserialize, serialize_into};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PROTOCOL_VERSION: u32 = 1;
pub const INVENTORY_SLOTS: usize = 8;
pub const MAX_USERNAME_LEN: usize = 16;
pub const MAX_CHAT_LEN: usize = 64;

/// Numeric message tags.
pub mod tags {
    /// Tags of messages sent by clients.
    pub mod client {
        pub const MOVE: u8 = 0x01;
        pub const ROTATE: u8 = 0x04;
        pub const ATTACK_START: u8 = 0x06;
        pub const ATTACK_STOP: u8 = 0x07;
        pub const CRAFT: u8 = 0x08;
        pub const USE_ITEM: u8 = 0x12;
        pub const JOIN: u8 = 0x16;
        pub const CHAT: u8 = 0x17;
        pub const CONNECT: u8 = 0x20;
        pub const DISCONNECT: u8 = 0x21;
    }

    /// Tags of events sent by the server.
    pub mod server {
        pub const STATE_DELTA: u8 = 0x00;
        pub const ATTACK: u8 = 0x02;
        pub const ATTACK_OTHER: u8 = 0x03;
        pub const INVENTORY_UPDATE: u8 = 0x05;
        pub const HELMET_UPDATE: u8 = 0x0b;
        pub const HELMET_UPDATE_OTHER: u8 = 0x0c;
        pub const WEAPON_UPDATE: u8 = 0x0d;
        pub const WEAPON_UPDATE_OTHER: u8 = 0x0e;
        pub const INIT: u8 = 0x10;
        pub const USE_ITEM_OTHER: u8 = 0x13;
        pub const PLAYER_JOIN: u8 = 0x14;
        pub const PLAYER_REMOVE: u8 = 0x15;
        pub const CHAT: u8 = 0x17;
        pub const CREATURE_SPAWN: u8 = 0x18;
        pub const CREATURE_REMOVE: u8 = 0x19;
        pub const DISCONNECTED: u8 = 0x21;
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("unknown message tag 0x{0:02x}")]
    UnknownTag(u8),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Every item type known to the game. Zero is reserved on the wire for "no item".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Item {
    Wood = 1,
    Stone = 2,
    Apple = 3,
    WoodHelmet = 4,
    WoodPickaxe = 5,
    WoodSword = 6,
    StoneHelmet = 7,
    StonePickaxe = 8,
    StoneSword = 9,
    RawMeat = 10,
    WolfFur = 11,
}

impl Item {
    pub const ALL: [Item; 11] = [
        Item::Wood,
        Item::Stone,
        Item::Apple,
        Item::WoodHelmet,
        Item::WoodPickaxe,
        Item::WoodSword,
        Item::StoneHelmet,
        Item::StonePickaxe,
        Item::StoneSword,
        Item::RawMeat,
        Item::WolfFur,
    ];

    pub fn from_u8(value: u8) -> Option<Item> {
        Item::ALL.iter().copied().find(|item| *item as u8 == value)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Encodes an optional item as its wire byte.
pub fn item_to_wire(item: Option<Item>) -> u8 {
    item.map_or(0, Item::as_u8)
}

/// AI creature species. Creature ids are scoped per species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Species {
    Wolf = 0,
}

impl Species {
    pub const ALL: [Species; 1] = [Species::Wolf];

    pub fn from_u8(value: u8) -> Option<Species> {
        Species::ALL.iter().copied().find(|s| *s as u8 == value)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Unpacks a move byte into a `(horizontal, vertical)` direction pair.
///
/// Bits 0-1 carry the horizontal axis and bits 2-3 the vertical axis; each
/// field is 0 (none), 1 (positive) or 2 (negative). The unused value 3 reads
/// as no movement.
pub fn decode_direction(byte: u8) -> (i8, i8) {
    fn axis(bits: u8) -> i8 {
        match bits {
            1 => 1,
            2 => -1,
            _ => 0,
        }
    }
    (axis(byte & 0b11), axis((byte >> 2) & 0b11))
}

/// Packs a direction pair into a move byte. Inverse of [`decode_direction`].
pub fn encode_direction(x: i8, y: i8) -> u8 {
    fn axis(value: i8) -> u8 {
        match value.signum() {
            1 => 1,
            -1 => 2,
            _ => 0,
        }
    }
    axis(x) | (axis(y) << 2)
}

/// Per-tick state of one avatar as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarPayload {
    pub id: u16,
    pub x: i32,
    pub y: i32,
    /// Facing angle in centiradians.
    pub angle: i16,
    pub helmet: u8,
    pub weapon: u8,
    pub health: u16,
    pub temperature: u16,
    pub hunger: u16,
}

/// Per-tick state of one creature as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreaturePayload {
    pub species: u8,
    pub id: u16,
    pub x: i32,
    pub y: i32,
    pub target_x: i32,
    pub target_y: i32,
    pub health: u16,
}

/// Full introduction of an avatar, sent on init and when a player joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarIntro {
    pub id: u16,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub angle: i16,
    pub helmet: u8,
    pub weapon: u8,
    pub health: u16,
    pub temperature: u16,
    pub hunger: u16,
}

impl AvatarIntro {
    pub fn new(name: &str, payload: &AvatarPayload) -> Self {
        Self {
            id: payload.id,
            name: name.to_string(),
            x: payload.x,
            y: payload.y,
            angle: payload.angle,
            helmet: payload.helmet,
            weapon: payload.weapon,
            health: payload.health,
            temperature: payload.temperature,
            hunger: payload.hunger,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPayload {
    pub spawn_index: u8,
    pub avatar_id: u16,
    pub avatars: Vec<AvatarIntro>,
    pub creatures: Vec<CreaturePayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaPayload {
    pub avatars: Vec<AvatarPayload>,
    pub creatures: Vec<CreaturePayload>,
}

impl DeltaPayload {
    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty() && self.creatures.is_empty()
    }
}

/// One changed inventory slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPayload {
    pub index: u8,
    pub item: u8,
    pub amount: u32,
}

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Connect { client_version: u32 },
    Disconnect,
    Join { username: String },
    Move { direction: u8 },
    Rotate { angle: f32 },
    AttackStart,
    AttackStop,
    Craft { item: u8 },
    UseItem { slot: u8 },
    Chat { text: String },
}

impl ClientMessage {
    pub fn tag(&self) -> u8 {
        use tags::client::*;
        match self {
            ClientMessage::Connect { .. } => CONNECT,
            ClientMessage::Disconnect => DISCONNECT,
            ClientMessage::Join { .. } => JOIN,
            ClientMessage::Move { .. } => MOVE,
            ClientMessage::Rotate { .. } => ROTATE,
            ClientMessage::AttackStart => ATTACK_START,
            ClientMessage::AttackStop => ATTACK_STOP,
            ClientMessage::Craft { .. } => CRAFT,
            ClientMessage::UseItem { .. } => USE_ITEM,
            ClientMessage::Chat { .. } => CHAT,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = vec![self.tag()];
        match self {
            ClientMessage::Connect { client_version } => serialize_into(&mut out, client_version)?,
            ClientMessage::Join { username } => serialize_into(&mut out, username)?,
            ClientMessage::Move { direction } => serialize_into(&mut out, direction)?,
            ClientMessage::Rotate { angle } => serialize_into(&mut out, angle)?,
            ClientMessage::Craft { item } => serialize_into(&mut out, item)?,
            ClientMessage::UseItem { slot } => serialize_into(&mut out, slot)?,
            ClientMessage::Chat { text } => serialize_into(&mut out, text)?,
            ClientMessage::Disconnect | ClientMessage::AttackStart | ClientMessage::AttackStop => {}
        }
        Ok(out)
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        use tags::client::*;
        let (&tag, body) = data.split_first().ok_or(ProtocolError::Empty)?;
        let message = match tag {
            CONNECT => ClientMessage::Connect {
                client_version: deserialize(body)?,
            },
            DISCONNECT => ClientMessage::Disconnect,
            JOIN => ClientMessage::Join {
                username: deserialize(body)?,
            },
            MOVE => ClientMessage::Move {
                direction: deserialize(body)?,
            },
            ROTATE => ClientMessage::Rotate {
                angle: deserialize(body)?,
            },
            ATTACK_START => ClientMessage::AttackStart,
            ATTACK_STOP => ClientMessage::AttackStop,
            CRAFT => ClientMessage::Craft {
                item: deserialize(body)?,
            },
            USE_ITEM => ClientMessage::UseItem {
                slot: deserialize(body)?,
            },
            CHAT => ClientMessage::Chat {
                text: deserialize(body)?,
            },
            other => return Err(ProtocolError::UnknownTag(other)),
        };
        Ok(message)
    }
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    StateDelta(DeltaPayload),
    Attack,
    AttackOther { avatar_id: u16 },
    InventoryUpdate(Vec<SlotPayload>),
    HelmetUpdate { item: u8 },
    HelmetUpdateOther { avatar_id: u16, item: u8 },
    WeaponUpdate { item: u8 },
    WeaponUpdateOther { avatar_id: u16, item: u8 },
    Init(InitPayload),
    UseItemOther { avatar_id: u16, item: u8 },
    PlayerJoin(AvatarIntro),
    PlayerRemove { avatar_id: u16 },
    Chat { avatar_id: u16, text: String },
    CreatureSpawn(CreaturePayload),
    CreatureRemove { species: u8, id: u16 },
    Disconnected { reason: String },
}

impl ServerEvent {
    pub fn tag(&self) -> u8 {
        use tags::server::*;
        match self {
            ServerEvent::StateDelta(_) => STATE_DELTA,
            ServerEvent::Attack => ATTACK,
            ServerEvent::AttackOther { .. } => ATTACK_OTHER,
            ServerEvent::InventoryUpdate(_) => INVENTORY_UPDATE,
            ServerEvent::HelmetUpdate { .. } => HELMET_UPDATE,
            ServerEvent::HelmetUpdateOther { .. } => HELMET_UPDATE_OTHER,
            ServerEvent::WeaponUpdate { .. } => WEAPON_UPDATE,
            ServerEvent::WeaponUpdateOther { .. } => WEAPON_UPDATE_OTHER,
            ServerEvent::Init(_) => INIT,
            ServerEvent::UseItemOther { .. } => USE_ITEM_OTHER,
            ServerEvent::PlayerJoin(_) => PLAYER_JOIN,
            ServerEvent::PlayerRemove { .. } => PLAYER_REMOVE,
            ServerEvent::Chat { .. } => CHAT,
            ServerEvent::CreatureSpawn(_) => CREATURE_SPAWN,
            ServerEvent::CreatureRemove { .. } => CREATURE_REMOVE,
            ServerEvent::Disconnected { .. } => DISCONNECTED,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = vec![self.tag()];
        match self {
            ServerEvent::StateDelta(delta) => serialize_into(&mut out, delta)?,
            ServerEvent::Attack => {}
            ServerEvent::AttackOther { avatar_id } => serialize_into(&mut out, avatar_id)?,
            ServerEvent::InventoryUpdate(slots) => serialize_into(&mut out, slots)?,
            ServerEvent::HelmetUpdate { item } | ServerEvent::WeaponUpdate { item } => {
                serialize_into(&mut out, item)?
            }
            ServerEvent::HelmetUpdateOther { avatar_id, item }
            | ServerEvent::WeaponUpdateOther { avatar_id, item }
            | ServerEvent::UseItemOther { avatar_id, item } => {
                serialize_into(&mut out, &(avatar_id, item))?
            }
            ServerEvent::Init(init) => serialize_into(&mut out, init)?,
            ServerEvent::PlayerJoin(intro) => serialize_into(&mut out, intro)?,
            ServerEvent::PlayerRemove { avatar_id } => serialize_into(&mut out, avatar_id)?,
            ServerEvent::Chat { avatar_id, text } => serialize_into(&mut out, &(avatar_id, text))?,
            ServerEvent::CreatureSpawn(creature) => serialize_into(&mut out, creature)?,
            ServerEvent::CreatureRemove { species, id } => {
                serialize_into(&mut out, &(species, id))?
            }
            ServerEvent::Disconnected { reason } => serialize_into(&mut out, reason)?,
        }
        Ok(out)
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        use tags::server::*;
        let (&tag, body) = data.split_first().ok_or(ProtocolError::Empty)?;
        let event = match tag {
            STATE_DELTA => ServerEvent::StateDelta(deserialize(body)?),
            ATTACK => ServerEvent::Attack,
            ATTACK_OTHER => ServerEvent::AttackOther {
                avatar_id: deserialize(body)?,
            },
            INVENTORY_UPDATE => ServerEvent::InventoryUpdate(deserialize(body)?),
            HELMET_UPDATE => ServerEvent::HelmetUpdate {
                item: deserialize(body)?,
            },
            WEAPON_UPDATE => ServerEvent::WeaponUpdate {
                item: deserialize(body)?,
            },
            HELMET_UPDATE_OTHER => {
                let (avatar_id, item) = deserialize(body)?;
                ServerEvent::HelmetUpdateOther { avatar_id, item }
            }
            WEAPON_UPDATE_OTHER => {
                let (avatar_id, item) = deserialize(body)?;
                ServerEvent::WeaponUpdateOther { avatar_id, item }
            }
            USE_ITEM_OTHER => {
                let (avatar_id, item) = deserialize(body)?;
                ServerEvent::UseItemOther { avatar_id, item }
            }
            INIT => ServerEvent::Init(deserialize(body)?),
            PLAYER_JOIN => ServerEvent::PlayerJoin(deserialize(body)?),
            PLAYER_REMOVE => ServerEvent::PlayerRemove {
                avatar_id: deserialize(body)?,
            },
            CHAT => {
                let (avatar_id, text) = deserialize(body)?;
                ServerEvent::Chat { avatar_id, text }
            }
            CREATURE_SPAWN => ServerEvent::CreatureSpawn(deserialize(body)?),
            CREATURE_REMOVE => {
                let (species, id) = deserialize(body)?;
                ServerEvent::CreatureRemove { species, id }
            }
            DISCONNECTED => ServerEvent::Disconnected {
                reason: deserialize(body)?,
            },
            other => return Err(ProtocolError::UnknownTag(other)),
        };
        Ok(event)
    }
}
