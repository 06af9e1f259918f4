//! Types and constants shared by the pong server and its clients.
//!
//! The [`protocol`] module describes every message that can cross the wire and
//! the [`codec`] module moves those messages over a byte stream. The constants
//! below describe the world both sides agree on; the server simulates with
//! them and clients use them to draw.

pub mod codec;
pub mod protocol;

pub use codec::{CodecError, Incoming};
pub use protocol::{
    Buttons, ClientHello, ClientInput, ClientPing, FrameHeader, Message, MessageType,
    ServerBroadcast, ServerHello, ServerPong, ServerState,
};

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 450.0;

pub const PADDLE_WIDTH: f32 = 10.0;
pub const PADDLE_HEIGHT: f32 = 80.0;
pub const PADDLE_HALF_HEIGHT: f32 = PADDLE_HEIGHT / 2.0;
/// Gap between a paddle's outer edge and its wall.
pub const PADDLE_MARGIN: f32 = 10.0;
pub const PADDLE_SPEED: f32 = 260.0;

pub const BALL_RADIUS: f32 = 6.0;
pub const BALL_LAUNCH_SPEED: f32 = 300.0;
/// Share of the launch speed given to the vertical component on every launch.
pub const BALL_LAUNCH_VERTICAL_FRACTION: f32 = 0.35;
/// Vertical velocity added when the ball hits the very tip of a paddle.
pub const SPIN_COEFFICIENT: f32 = 180.0;
/// How far past the left or right wall the ball may travel before it counts as a miss.
pub const SCORE_MARGIN: f32 = 20.0;

/// Fixed simulation step in milliseconds (62.5 Hz).
pub const TICK_MS: u64 = 16;
/// Fixed simulation step in seconds.
pub const TICK_DT: f32 = TICK_MS as f32 / 1000.0;
/// Ticks between two state broadcasts (about 20 Hz at the tick rate above).
pub const BROADCAST_EVERY: u32 = 3;

pub const MAX_PLAYERS: usize = 2;
pub const DEFAULT_PORT: u16 = 7777;

/// Left edge of the paddle owned by `player` (0 = left, 1 = right).
pub fn paddle_x(player: usize) -> f32 {
    if player == 0 {
        PADDLE_MARGIN
    } else {
        WORLD_WIDTH - PADDLE_MARGIN - PADDLE_WIDTH
    }
}
