#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use redlite::commands::{self, CommandError, CommandOutcome};
use redlite::resp::{CommandFrame, encode_command, parse_frames};
use redlite::server::Server;
use redlite::state::State;
use redlite::store::Store;

/// A command engine wired to fresh shared state, without sockets.
pub struct TestEnv {
    pub server: Arc<RwLock<Server>>,
    pub store: Arc<Mutex<Store>>,
    pub state: Arc<Mutex<State>>,
}

impl TestEnv {
    pub fn master() -> Self {
        Self::from_args(&[])
    }

    pub fn replica() -> Self {
        Self::from_args(&["--replicaof", "127.0.0.1 6399"])
    }

    pub fn from_args(rest: &[&str]) -> Self {
        let args: Vec<String> = std::iter::once("redlite")
            .chain(rest.iter().copied())
            .map(String::from)
            .collect();

        Self {
            server: Arc::new(RwLock::new(Server::new(args).unwrap())),
            store: Arc::new(Mutex::new(Store::new())),
            state: Arc::new(Mutex::new(State::new())),
        }
    }

    pub fn clone_handles(&self) -> Self {
        Self {
            server: Arc::clone(&self.server),
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
        }
    }

    pub async fn exec(
        &self,
        peer_addr: &str,
        command: &[&str],
    ) -> Result<CommandOutcome, CommandError> {
        commands::execute_client_command(
            frame(command),
            peer_addr,
            Arc::clone(&self.server),
            Arc::clone(&self.store),
            Arc::clone(&self.state),
        )
        .await
    }

    pub async fn exec_ok(&self, peer_addr: &str, command: &[&str], expected: &str) {
        match self.exec(peer_addr, command).await {
            Ok(CommandOutcome::Reply(reply)) => {
                assert_eq!(reply, expected, "running {:?}", command)
            }
            other => panic!("expected a reply for {:?}, got {:?}", command, other),
        }
    }

    pub async fn exec_err(&self, peer_addr: &str, command: &[&str], expected: CommandError) {
        assert_eq!(
            self.exec(peer_addr, command).await,
            Err(expected),
            "running {:?}",
            command
        );
    }
}

/// Builds a parsed frame the way the dispatcher would receive it.
pub fn frame(parts: &[&str]) -> CommandFrame {
    let encoded = encode_command(parts);
    let (mut frames, consumed) = parse_frames(encoded.as_bytes()).unwrap();

    assert_eq!(consumed, encoded.len());
    frames.remove(0)
}

pub fn bulk(value: &str) -> String {
    format!("${}\r\n{}\r\n", value.len(), value)
}
