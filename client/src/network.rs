use crate::game::Snapshot;
use crate::input::InputSource;
use log::{debug, info, warn};
use shared::codec::{recv_message, recv_message_within, send_message};
use shared::{ClientHello, ClientPing, CodecError, Incoming, Message, ServerHello};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};

pub const INPUT_INTERVAL: Duration = Duration::from_millis(16);
pub const PING_INTERVAL: Duration = Duration::from_secs(3);
const HELLO_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Client {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    hello: ServerHello,
    snapshot: Snapshot,
    input: InputSource,
}

impl Client {
    /// Connects, waits for the server's greeting and introduces itself.
    pub async fn connect(
        server_addr: &str,
        name: &str,
        input: InputSource,
        snapshot: Snapshot,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Connecting to server...");
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        let (mut reader, mut writer) = stream.into_split();

        let hello = match recv_message_within(&mut reader, HELLO_TIMEOUT).await? {
            Incoming::Known(Message::ServerHello(hello)) => hello,
            Incoming::Known(other) => {
                return Err(format!("expected ServerHello, got {:?}", other.kind()).into())
            }
            Incoming::Unknown { kind, size } => {
                let got = format!("type {} ({} bytes)", kind, size);
                return Err(format!("expected ServerHello, got {}", got).into());
            }
        };
        info!("Connected! Server up for {} ms", hello.server_start_ms);
        info!("Input: {:?}", input.mode());
        snapshot.set_hello(hello);

        send_message(&mut writer, &Message::ClientHello(ClientHello::new(name))).await?;

        Ok(Client {
            reader,
            writer,
            hello,
            snapshot,
            input,
        })
    }

    pub fn server_hello(&self) -> ServerHello {
        self.hello
    }

    /// Sends input every 16 ms and a ping every 3 s until the server goes away
    /// or `duration` runs out.
    pub async fn run(self, duration: Option<Duration>) -> Result<(), Box<dyn std::error::Error>> {
        let Client {
            reader,
            mut writer,
            snapshot,
            mut input,
            ..
        } = self;

        let mut receiver = spawn_receiver(reader, snapshot);
        let deadline = duration.map(|d| Instant::now() + d);

        let mut input_interval = interval(INPUT_INTERVAL);
        input_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ping_interval = interval(PING_INTERVAL);
        ping_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result: Result<(), Box<dyn std::error::Error>> = loop {
            tokio::select! {
                finished = &mut receiver => {
                    break match finished {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(e.into()),
                        Err(e) => Err(e.into()),
                    };
                }

                _ = input_interval.tick() => {
                    let message = Message::ClientInput(input.next_input());
                    if let Err(e) = send_message(&mut writer, &message).await {
                        break Err(e.into());
                    }
                }

                _ = ping_interval.tick() => {
                    let ping = ClientPing { client_send_ms: get_timestamp() };
                    if let Err(e) = send_message(&mut writer, &Message::ClientPing(ping)).await {
                        break Err(e.into());
                    }
                }

                _ = wait_until(deadline) => {
                    info!("Run time elapsed, disconnecting");
                    break Ok(());
                }
            }
        };

        receiver.abort();
        result
    }
}

/// Reads server messages into `snapshot` until the stream ends.
///
/// A clean close on a frame boundary counts as success.
fn spawn_receiver(
    mut reader: OwnedReadHalf,
    snapshot: Snapshot,
) -> JoinHandle<Result<(), CodecError>> {
    tokio::spawn(async move {
        loop {
            match recv_message(&mut reader).await {
                Ok(incoming) => handle_incoming(&snapshot, incoming),
                Err(CodecError::Closed) => {
                    info!("Server closed the connection");
                    return Ok(());
                }
                Err(e) => {
                    warn!("Connection lost: {}", e);
                    return Err(e);
                }
            }
        }
    })
}

pub fn handle_incoming(snapshot: &Snapshot, incoming: Incoming) {
    match incoming {
        Incoming::Known(Message::ServerState(state)) => snapshot.apply_state(state),
        Incoming::Known(Message::ServerBroadcast(heartbeat)) => snapshot.apply_heartbeat(heartbeat),
        Incoming::Known(Message::ServerPong(pong)) => {
            let rtt = get_timestamp().saturating_sub(pong.client_send_ms);
            debug!("Ping: {} ms", rtt);
            snapshot.record_rtt(rtt);
        }
        Incoming::Known(other) => warn!("Unexpected message {:?}", other.kind()),
        Incoming::Unknown { kind, size } => {
            debug!("Skipped unknown message type {} ({} bytes)", kind, size)
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
