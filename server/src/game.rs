//! Authoritative match simulation.
//!
//! The simulation owns the ball, both paddles and the per-player input
//! latches. It only changes when [`Simulation::step`] runs, which always
//! advances exactly one fixed tick of [`TICK_DT`] seconds no matter how many
//! inputs arrived since the previous step.

use log::info;
use shared::{
    paddle_x, Buttons, ServerState, BALL_LAUNCH_SPEED, BALL_LAUNCH_VERTICAL_FRACTION,
    BALL_RADIUS, MAX_PLAYERS, PADDLE_HALF_HEIGHT, PADDLE_SPEED, PADDLE_WIDTH, SCORE_MARGIN,
    SPIN_COEFFICIENT, TICK_DT, WORLD_HEIGHT, WORLD_WIDTH,
};

/// Slot index of a player: 0 plays the left paddle, 1 the right one.
pub type PlayerIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Ball {
    /// A ball at the world center moving at the launch speed. `direction`
    /// is +1.0 to travel right and -1.0 to travel left.
    pub fn launched(direction: f32) -> Self {
        let vy = BALL_LAUNCH_SPEED * BALL_LAUNCH_VERTICAL_FRACTION;
        let vx = (BALL_LAUNCH_SPEED * BALL_LAUNCH_SPEED - vy * vy).sqrt();
        Self {
            x: WORLD_WIDTH / 2.0,
            y: WORLD_HEIGHT / 2.0,
            vx: vx * direction.signum(),
            vy,
        }
    }

    pub fn speed(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}

/// What happened during one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// The side whose wall the ball escaped past, if any. The ball has
    /// already been relaunched when this is set.
    pub missed: Option<Side>,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub tick: u32,
    pub ball: Ball,
    /// Paddle centers on the y axis.
    pub paddle_y: [f32; MAX_PLAYERS],
    inputs: [Buttons; MAX_PLAYERS],
    connected: [bool; MAX_PLAYERS],
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            tick: 0,
            ball: Ball::launched(1.0),
            paddle_y: [WORLD_HEIGHT / 2.0; MAX_PLAYERS],
            inputs: [Buttons::empty(); MAX_PLAYERS],
            connected: [false; MAX_PLAYERS],
        }
    }

    pub fn connect_player(&mut self, player: PlayerIndex) {
        if let Some(slot) = self.connected.get_mut(player) {
            *slot = true;
            self.inputs[player] = Buttons::empty();
            info!("Player {} takes the {:?} paddle", player, side_of(player));
        }
    }

    /// Stops moving the player's paddle. The paddle stays where it is and
    /// still deflects the ball.
    pub fn disconnect_player(&mut self, player: PlayerIndex) {
        if let Some(slot) = self.connected.get_mut(player) {
            *slot = false;
            self.inputs[player] = Buttons::empty();
            info!(
                "Player {} left, paddle frozen at y={:.1}",
                player, self.paddle_y[player]
            );
        }
    }

    pub fn is_connected(&self, player: PlayerIndex) -> bool {
        self.connected.get(player).copied().unwrap_or(false)
    }

    /// Overwrites the player's held buttons. Only the value present when the
    /// next step runs matters.
    pub fn latch_input(&mut self, player: PlayerIndex, buttons: Buttons) {
        if self.is_connected(player) {
            self.inputs[player] = buttons;
        }
    }

    pub fn input(&self, player: PlayerIndex) -> Buttons {
        self.inputs.get(player).copied().unwrap_or_default()
    }

    /// Advances the match by one tick.
    pub fn step(&mut self) -> StepOutcome {
        self.move_paddles();

        self.ball.x += self.ball.vx * TICK_DT;
        self.ball.y += self.ball.vy * TICK_DT;

        self.bounce_off_walls();

        // Left is checked first; if the ball overlaps both paddles in the
        // same tick the right paddle's response wins.
        for player in 0..MAX_PLAYERS {
            self.deflect_off_paddle(player);
        }

        let missed = self.check_miss();
        self.tick = self.tick.wrapping_add(1);

        StepOutcome { missed }
    }

    pub fn snapshot(&self) -> ServerState {
        ServerState {
            tick: self.tick,
            ball_x: self.ball.x,
            ball_y: self.ball.y,
            ball_vx: self.ball.vx,
            ball_vy: self.ball.vy,
            paddle_y: self.paddle_y,
        }
    }

    fn move_paddles(&mut self) {
        for player in 0..MAX_PLAYERS {
            if !self.connected[player] {
                continue;
            }
            let direction = self.inputs[player].direction();
            let y = self.paddle_y[player] + direction * PADDLE_SPEED * TICK_DT;
            self.paddle_y[player] = y.clamp(PADDLE_HALF_HEIGHT, WORLD_HEIGHT - PADDLE_HALF_HEIGHT);
        }
    }

    fn bounce_off_walls(&mut self) {
        if self.ball.y - BALL_RADIUS <= 0.0 {
            self.ball.y = BALL_RADIUS;
            self.ball.vy = self.ball.vy.abs();
        } else if self.ball.y + BALL_RADIUS >= WORLD_HEIGHT {
            self.ball.y = WORLD_HEIGHT - BALL_RADIUS;
            self.ball.vy = -self.ball.vy.abs();
        }
    }

    /// Axis-aligned test against the paddle box grown by the ball radius.
    fn deflect_off_paddle(&mut self, player: PlayerIndex) -> bool {
        let center = self.paddle_y[player];
        let left = paddle_x(player) - BALL_RADIUS;
        let right = paddle_x(player) + PADDLE_WIDTH + BALL_RADIUS;
        let top = center - PADDLE_HALF_HEIGHT - BALL_RADIUS;
        let bottom = center + PADDLE_HALF_HEIGHT + BALL_RADIUS;

        let ball = &mut self.ball;
        if ball.x < left || ball.x > right || ball.y < top || ball.y > bottom {
            return false;
        }

        match side_of(player) {
            Side::Left => {
                ball.x = right;
                ball.vx = ball.vx.abs();
            }
            Side::Right => {
                ball.x = left;
                ball.vx = -ball.vx.abs();
            }
        }
        ball.vy += (ball.y - center) / PADDLE_HALF_HEIGHT * SPIN_COEFFICIENT;
        true
    }

    fn check_miss(&mut self) -> Option<Side> {
        let missed = if self.ball.x < -SCORE_MARGIN {
            Side::Left
        } else if self.ball.x > WORLD_WIDTH + SCORE_MARGIN {
            Side::Right
        } else {
            return None;
        };

        // Relaunch away from the wall the ball escaped through.
        self.ball = match missed {
            Side::Left => Ball::launched(1.0),
            Side::Right => Ball::launched(-1.0),
        };
        Some(missed)
    }
}

pub fn side_of(player: PlayerIndex) -> Side {
    if player == 0 {
        Side::Left
    } else {
        Side::Right
    }
}
