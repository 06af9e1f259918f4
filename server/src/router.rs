//! Reads one frame from a readable peer and applies it.
//!
//! | message       | effect                                        |
//! |---------------|-----------------------------------------------|
//! | `ClientPing`  | reply `ServerPong` at once                    |
//! | `ClientInput` | overwrite the player's input latch            |
//! | `ClientHello` | record the display name                       |
//! | anything else | payload already drained by the codec; ignored |
//!
//! Any error returned here means the peer must be evicted.

use crate::game::{PlayerIndex, Simulation};
use crate::utils::ServerClock;
use log::{debug, info};
use shared::codec::{recv_message_within, send_message_within};
use shared::{Buttons, CodecError, Incoming, Message, ServerPong};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// What a routed frame turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Pong,
    Input(Buttons),
    Hello(String),
    Ignored,
}

pub async fn route_frame<R, W>(
    reader: &mut R,
    writer: &mut W,
    player: PlayerIndex,
    simulation: &mut Simulation,
    clock: &ServerClock,
    limit: Duration,
) -> Result<Routed, CodecError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match recv_message_within(reader, limit).await? {
        Incoming::Known(Message::ClientPing(ping)) => {
            let pong = ServerPong {
                client_send_ms: ping.client_send_ms,
                server_recv_ms: clock.unix_ms(),
            };
            send_message_within(writer, &Message::ServerPong(pong), limit).await?;
            debug!("Player {}: pong for ping sent at {}", player, ping.client_send_ms);
            Ok(Routed::Pong)
        }
        Incoming::Known(Message::ClientInput(input)) => {
            let buttons = input.buttons();
            simulation.latch_input(player, buttons);
            debug!("Player {}: input #{} {:?}", player, input.seq, buttons);
            Ok(Routed::Input(buttons))
        }
        Incoming::Known(Message::ClientHello(hello)) => {
            let name = hello.name();
            info!("Player {} is called '{}'", player, name);
            Ok(Routed::Hello(name))
        }
        Incoming::Known(other) => {
            debug!("Player {}: ignoring {:?}", player, other.kind());
            Ok(Routed::Ignored)
        }
        Incoming::Unknown { kind, size } => {
            debug!(
                "Player {}: skipped unknown message type {} ({} bytes)",
                player, kind, size
            );
            Ok(Routed::Ignored)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::codec::{recv_message, send_message};
    use shared::{ClientHello, ClientInput, ClientPing, ServerState};

    const LIMIT: Duration = Duration::from_millis(100);

    async fn frames(messages: &[Message]) -> Vec<u8> {
        let mut out = Vec::<u8>::new();
        for message in messages {
            send_message(&mut out, message).await.unwrap();
        }
        out
    }

    fn two_player_match() -> Simulation {
        let mut sim = Simulation::new();
        sim.connect_player(0);
        sim.connect_player(1);
        sim
    }

    #[tokio::test]
    async fn test_ping_gets_pong() {
        let bytes = frames(&[Message::ClientPing(ClientPing {
            client_send_ms: 1234,
        })])
        .await;
        let mut reader = bytes.as_slice();
        let mut replies = Vec::<u8>::new();
        let mut sim = two_player_match();
        let before = sim.snapshot();

        let routed = route_frame(&mut reader, &mut replies, 0, &mut sim, &ServerClock::new(), LIMIT)
            .await
            .unwrap();

        assert_eq!(routed, Routed::Pong);
        assert_eq!(sim.snapshot(), before);

        let mut replies = replies.as_slice();
        match recv_message(&mut replies).await.unwrap() {
            Incoming::Known(Message::ServerPong(pong)) => {
                assert_eq!(pong.client_send_ms, 1234);
                assert!(pong.server_recv_ms > 0);
            }
            other => panic!("expected pong, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fragmented_ping_is_reassembled() {
        let bytes = frames(&[Message::ClientPing(ClientPing { client_send_ms: 5 })]).await;
        let mut reader = tokio_test::io::Builder::new()
            .read(&bytes[..1])
            .read(&bytes[1..4])
            .read(&bytes[4..])
            .build();
        let mut replies = Vec::<u8>::new();
        let mut sim = two_player_match();

        let routed = route_frame(&mut reader, &mut replies, 0, &mut sim, &ServerClock::new(), LIMIT)
            .await
            .unwrap();

        assert_eq!(routed, Routed::Pong);
        assert_eq!(replies.len(), 3 + shared::MessageType::ServerPong.payload_len());
    }

    #[tokio::test]
    async fn test_input_latches_for_its_player() {
        let bytes = frames(&[Message::ClientInput(ClientInput::new(Buttons::DOWN, 9))]).await;
        let mut reader = bytes.as_slice();
        let mut sim = two_player_match();

        let routed = route_frame(
            &mut reader,
            &mut Vec::<u8>::new(),
            1,
            &mut sim,
            &ServerClock::new(),
            LIMIT,
        )
        .await
        .unwrap();

        assert_eq!(routed, Routed::Input(Buttons::DOWN));
        assert_eq!(sim.input(1), Buttons::DOWN);
        assert_eq!(sim.input(0), Buttons::empty());
    }

    #[tokio::test]
    async fn test_later_input_overwrites_earlier() {
        let bytes = frames(&[
            Message::ClientInput(ClientInput::new(Buttons::UP, 1)),
            Message::ClientInput(ClientInput::new(Buttons::empty(), 2)),
            Message::ClientInput(ClientInput::new(Buttons::DOWN, 3)),
        ])
        .await;
        let mut reader = bytes.as_slice();
        let mut sim = two_player_match();
        let clock = ServerClock::new();

        for _ in 0..3 {
            route_frame(&mut reader, &mut Vec::<u8>::new(), 0, &mut sim, &clock, LIMIT)
                .await
                .unwrap();
        }

        assert_eq!(sim.input(0), Buttons::DOWN);
    }

    #[tokio::test]
    async fn test_hello_reports_name() {
        let bytes = frames(&[Message::ClientHello(ClientHello::new("dave"))]).await;
        let mut reader = bytes.as_slice();
        let mut sim = two_player_match();

        let routed = route_frame(
            &mut reader,
            &mut Vec::<u8>::new(),
            0,
            &mut sim,
            &ServerClock::new(),
            LIMIT,
        )
        .await
        .unwrap();

        assert_eq!(routed, Routed::Hello("dave".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_and_server_messages_are_ignored() {
        let mut bytes = vec![99u8, 2, 0, 0xAA, 0xBB];
        bytes.extend(
            frames(&[
                Message::ServerState(ServerState::default()),
                Message::ClientInput(ClientInput::new(Buttons::UP, 1)),
            ])
            .await,
        );
        let mut reader = bytes.as_slice();
        let mut sim = two_player_match();
        let clock = ServerClock::new();
        let mut replies = Vec::<u8>::new();

        for expected in [Routed::Ignored, Routed::Ignored, Routed::Input(Buttons::UP)] {
            let routed = route_frame(&mut reader, &mut replies, 0, &mut sim, &clock, LIMIT)
                .await
                .unwrap();
            assert_eq!(routed, expected);
        }
        assert!(replies.is_empty());
    }

    #[tokio::test]
    async fn test_closed_stream_is_an_error() {
        let mut reader: &[u8] = &[];
        let mut sim = two_player_match();

        let err = route_frame(
            &mut reader,
            &mut Vec::<u8>::new(),
            0,
            &mut sim,
            &ServerClock::new(),
            LIMIT,
        )
        .await
        .unwrap_err();

        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn test_wrong_size_is_an_error_and_nothing_is_latched() {
        let bytes = [shared::MessageType::ClientInput.tag(), 1, 0, 0b01];
        let mut reader = &bytes[..];
        let mut sim = two_player_match();

        let err = route_frame(
            &mut reader,
            &mut Vec::<u8>::new(),
            0,
            &mut sim,
            &ServerClock::new(),
            LIMIT,
        )
        .await
        .unwrap_err();

        assert!(err.is_framing());
        assert_eq!(sim.input(0), Buttons::empty());
    }
}
