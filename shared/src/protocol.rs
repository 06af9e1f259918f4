//! Message catalog for the pong wire protocol.
//!
//! Every frame is a [`FrameHeader`] (1-byte type tag, 2-byte payload length)
//! followed by a fixed-width payload. Each message type has exactly one legal
//! payload width; variable-length payloads do not exist. Payload records are
//! encoded with bincode's default options: fixed-width little-endian integers
//! and floats, fields in declaration order, no padding, arrays without a
//! length prefix.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Encoded width of [`FrameHeader`].
pub const HEADER_LEN: usize = 3;
/// Width of the nul-padded name carried by [`ClientHello`].
pub const NAME_LEN: usize = 16;

/// Type tags. Values are part of the wire format and must never change.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    ServerHello = 1,
    ServerBroadcast = 2,
    ClientPing = 4,
    ServerPong = 5,
    ClientHello = 10,
    ClientInput = 20,
    ServerState = 21,
}

impl MessageType {
    /// Maps a raw tag to a known type. Unknown tags are not an error at this
    /// level; the codec drains their payload.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(MessageType::ServerHello),
            2 => Some(MessageType::ServerBroadcast),
            4 => Some(MessageType::ClientPing),
            5 => Some(MessageType::ServerPong),
            10 => Some(MessageType::ClientHello),
            20 => Some(MessageType::ClientInput),
            21 => Some(MessageType::ServerState),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// The only payload width accepted for this type.
    pub const fn payload_len(self) -> usize {
        match self {
            MessageType::ServerHello => 4,
            MessageType::ServerBroadcast => 4 + 8,
            MessageType::ClientPing => 8,
            MessageType::ServerPong => 8 + 8,
            MessageType::ClientHello => NAME_LEN,
            MessageType::ClientInput => 1 + 4,
            MessageType::ServerState => 4 + 4 * 4 + 4 * 2,
        }
    }
}

/// Header preceding every payload on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Raw type tag, kept raw so unknown types can still be drained.
    pub kind: u8,
    /// Payload length in bytes, header excluded.
    pub size: u16,
}

impl FrameHeader {
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_tag(self.kind)
    }
}

bitflags! {
    /// Buttons currently held by a player.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Buttons: u8 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
    }
}

impl Buttons {
    /// Paddle direction on the y axis: UP is -1, DOWN is +1, both or neither is 0.
    pub fn direction(self) -> f32 {
        match (self.contains(Buttons::UP), self.contains(Buttons::DOWN)) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

/// Server -> client greeting, sent once right after accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerHello {
    pub server_start_ms: u32,
}

/// Client -> server greeting carrying a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientHello {
    pub name: [u8; NAME_LEN],
}

impl ClientHello {
    /// Builds a hello from `name`, truncated to fit with a trailing nul.
    pub fn new(name: &str) -> Self {
        let mut buf = [0u8; NAME_LEN];
        let bytes = name.as_bytes();
        let len = bytes.len().min(NAME_LEN - 1);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self { name: buf }
    }

    /// The name up to the first nul, decoded lossily.
    pub fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPing {
    pub client_send_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPong {
    pub client_send_ms: u64,
    pub server_recv_ms: u64,
}

/// Buttons held by the client. `seq` is a client-side counter for debugging
/// only; the server never orders by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInput {
    pub buttons: u8,
    pub seq: u32,
}

impl ClientInput {
    pub fn new(buttons: Buttons, seq: u32) -> Self {
        Self {
            buttons: buttons.bits(),
            seq,
        }
    }

    /// Held buttons; undefined bits are ignored.
    pub fn buttons(&self) -> Buttons {
        Buttons::from_bits_truncate(self.buttons)
    }
}

/// Authoritative snapshot of the match.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ServerState {
    pub tick: u32,
    pub ball_x: f32,
    pub ball_y: f32,
    pub ball_vx: f32,
    pub ball_vy: f32,
    /// Paddle centers, `[0]` = left, `[1]` = right.
    pub paddle_y: [f32; 2],
}

/// Lightweight heartbeat used instead of [`ServerState`] in heartbeat mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerBroadcast {
    pub tick: u32,
    pub server_unix_ms: u64,
}

/// A decoded frame of a known type.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    ServerHello(ServerHello),
    ServerBroadcast(ServerBroadcast),
    ClientPing(ClientPing),
    ServerPong(ServerPong),
    ClientHello(ClientHello),
    ClientInput(ClientInput),
    ServerState(ServerState),
}

impl Message {
    pub fn kind(&self) -> MessageType {
        match self {
            Message::ServerHello(_) => MessageType::ServerHello,
            Message::ServerBroadcast(_) => MessageType::ServerBroadcast,
            Message::ClientPing(_) => MessageType::ClientPing,
            Message::ServerPong(_) => MessageType::ServerPong,
            Message::ClientHello(_) => MessageType::ClientHello,
            Message::ClientInput(_) => MessageType::ClientInput,
            Message::ServerState(_) => MessageType::ServerState,
        }
    }

    pub fn encode_payload(&self) -> bincode::Result<Vec<u8>> {
        match self {
            Message::ServerHello(p) => bincode::serialize(p),
            Message::ServerBroadcast(p) => bincode::serialize(p),
            Message::ClientPing(p) => bincode::serialize(p),
            Message::ServerPong(p) => bincode::serialize(p),
            Message::ClientHello(p) => bincode::serialize(p),
            Message::ClientInput(p) => bincode::serialize(p),
            Message::ServerState(p) => bincode::serialize(p),
        }
    }

    /// Interprets `payload` as `kind`. Callers must already have checked the
    /// payload width against [`MessageType::payload_len`].
    pub fn decode(kind: MessageType, payload: &[u8]) -> bincode::Result<Self> {
        Ok(match kind {
            MessageType::ServerHello => Message::ServerHello(bincode::deserialize(payload)?),
            MessageType::ServerBroadcast => {
                Message::ServerBroadcast(bincode::deserialize(payload)?)
            }
            MessageType::ClientPing => Message::ClientPing(bincode::deserialize(payload)?),
            MessageType::ServerPong => Message::ServerPong(bincode::deserialize(payload)?),
            MessageType::ClientHello => Message::ClientHello(bincode::deserialize(payload)?),
            MessageType::ClientInput => Message::ClientInput(bincode::deserialize(payload)?),
            MessageType::ServerState => Message::ServerState(bincode::deserialize(payload)?),
        })
    }
}
