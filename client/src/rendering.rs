//! Text rendering of the match on a background thread.

use crate::game::{GameView, Snapshot};
use shared::{paddle_x, ServerState, PADDLE_HALF_HEIGHT, WORLD_HEIGHT, WORLD_WIDTH};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const FIELD_COLS: usize = 40;
pub const FIELD_ROWS: usize = 12;

/// Periodically prints the latest snapshot to stdout.
///
/// Runs on its own OS thread so it never competes with the network task. The
/// snapshot lock is held only while copying the view.
pub struct ConsoleRenderer {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ConsoleRenderer {
    pub fn start(snapshot: Snapshot, period: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::spawn(move || {
            while flag.load(Ordering::Relaxed) {
                let view = snapshot.read();
                println!("{}", status_line(&view));
                if let Some(state) = view.state {
                    println!("{}", draw_field(&state));
                }
                thread::sleep(period);
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stops the thread and waits for its last frame.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ConsoleRenderer {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn status_line(view: &GameView) -> String {
    let tick = view
        .tick()
        .map_or_else(|| "-".to_string(), |tick| tick.to_string());
    let rtt = view
        .rtt_ms
        .map_or_else(|| "-".to_string(), |rtt| format!("{}ms", rtt));

    match view.state {
        Some(state) => format!(
            "tick {} | ball ({:.1}, {:.1}) | paddles {:.1} / {:.1} | rtt {}",
            tick, state.ball_x, state.ball_y, state.paddle_y[0], state.paddle_y[1], rtt
        ),
        None => format!("tick {} | rtt {}", tick, rtt),
    }
}

/// Coarse ASCII picture of the field: `|` for paddles, `o` for the ball.
pub fn draw_field(state: &ServerState) -> String {
    let mut grid = [[' '; FIELD_COLS]; FIELD_ROWS];

    for (player, &center) in state.paddle_y.iter().enumerate() {
        let col = to_col(paddle_x(player));
        let top = to_row(center - PADDLE_HALF_HEIGHT);
        let bottom = to_row(center + PADDLE_HALF_HEIGHT);
        for row in grid.iter_mut().take(bottom + 1).skip(top) {
            row[col] = '|';
        }
    }

    if (0.0..WORLD_WIDTH).contains(&state.ball_x) && (0.0..WORLD_HEIGHT).contains(&state.ball_y) {
        grid[to_row(state.ball_y)][to_col(state.ball_x)] = 'o';
    }

    let border = format!("+{}+", "-".repeat(FIELD_COLS));
    let mut out = border.clone();
    for row in grid.iter() {
        out.push_str("\n|");
        out.extend(row.iter());
        out.push('|');
    }
    out.push('\n');
    out.push_str(&border);
    out
}

fn to_col(x: f32) -> usize {
    ((x / WORLD_WIDTH * FIELD_COLS as f32) as usize).min(FIELD_COLS - 1)
}

fn to_row(y: f32) -> usize {
    ((y.max(0.0) / WORLD_HEIGHT * FIELD_ROWS as f32) as usize).min(FIELD_ROWS - 1)
}
