//! Cross-connection runtime state.
//!
//! Holds the per-connection transaction queues plus the two process-wide
//! pending-operation slots: at most one outstanding `WAIT` and at most one
//! outstanding blocking `XREAD` can exist at a time. Each slot carries a
//! resolve-once sender; arming a new one replaces the old, whose dropped
//! sender lets the stale waiter fall through to its timeout path.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::resp::CommandFrame;
use crate::store::StreamId;

#[derive(Error, Debug, PartialEq)]
pub enum StateError {
    #[error("MULTI calls can not be nested")]
    TransactionAlreadyStarted,
    #[error("no transaction started")]
    NoTransactionStarted,
}

/// The single pending `WAIT`: its replica goal and the running count of
/// `REPLCONF ACK`s observed since it was armed.
#[derive(Debug)]
pub struct WaitState {
    pub goal: usize,
    pub acks: usize,
    sender: Option<oneshot::Sender<usize>>,
}

/// The single pending blocking `XREAD`: the `(key, after-id)` pairs it
/// watches and the sender that wakes it.
#[derive(Debug)]
pub struct BlockState {
    pub watched: Vec<(String, StreamId)>,
    sender: Option<oneshot::Sender<()>>,
}

#[derive(Debug, Default)]
pub struct State {
    wait: Option<WaitState>,
    block: Option<BlockState>,
    transactions: HashMap<String, Vec<CommandFrame>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_transaction(&mut self, peer_addr: String) -> Result<(), StateError> {
        if self.transactions.contains_key(&peer_addr) {
            return Err(StateError::TransactionAlreadyStarted);
        }

        self.transactions.insert(peer_addr, Vec::new());
        Ok(())
    }

    pub fn in_transaction(&self, peer_addr: &str) -> bool {
        self.transactions.contains_key(peer_addr)
    }

    pub fn queue_command(
        &mut self,
        peer_addr: &str,
        frame: CommandFrame,
    ) -> Result<(), StateError> {
        let queue = self
            .transactions
            .get_mut(peer_addr)
            .ok_or(StateError::NoTransactionStarted)?;

        queue.push(frame);
        Ok(())
    }

    /// Removes and returns the connection's queued commands, ending its
    /// transaction.
    pub fn take_transaction(&mut self, peer_addr: &str) -> Result<Vec<CommandFrame>, StateError> {
        self.transactions
            .remove(peer_addr)
            .ok_or(StateError::NoTransactionStarted)
    }

    /// Drops any transaction the peer left open. Called on disconnect.
    pub fn drop_transaction(&mut self, peer_addr: &str) {
        self.transactions.remove(peer_addr);
    }

    /// Arms the WAIT slot with an ack goal, returning the receiver that
    /// resolves with the ack count once the goal is reached.
    pub fn arm_wait(&mut self, goal: usize) -> oneshot::Receiver<usize> {
        let (sender, receiver) = oneshot::channel();
        self.wait = Some(WaitState {
            goal,
            acks: 0,
            sender: Some(sender),
        });
        receiver
    }

    /// Counts one replica ACK against the pending WAIT, resolving it when
    /// the goal is reached. Returns false when no WAIT is pending, in which
    /// case the ACK is not consumed.
    pub fn record_ack(&mut self) -> bool {
        let Some(wait) = &mut self.wait else {
            return false;
        };

        wait.acks += 1;
        if wait.acks >= wait.goal {
            if let Some(sender) = wait.sender.take() {
                let _ = sender.send(wait.acks);
            }
        }

        true
    }

    /// Clears the WAIT slot, returning the ack count it accumulated.
    pub fn take_wait_count(&mut self) -> usize {
        self.wait.take().map(|wait| wait.acks).unwrap_or(0)
    }

    /// Arms the blocking-XREAD slot, returning the receiver that resolves
    /// when a watched stream grows past its recorded id.
    pub fn arm_block(&mut self, watched: Vec<(String, StreamId)>) -> oneshot::Receiver<()> {
        let (sender, receiver) = oneshot::channel();
        self.block = Some(BlockState {
            watched,
            sender: Some(sender),
        });
        receiver
    }

    /// Wakes the pending blocking XREAD if `key` is one of its watched
    /// streams and `id` is newer than the watermark it started from.
    pub fn notify_stream_append(&mut self, key: &str, id: StreamId) {
        let Some(block) = &mut self.block else {
            return;
        };

        let woken = block
            .watched
            .iter()
            .any(|(watched_key, after)| watched_key == key && id > *after);

        if woken {
            if let Some(sender) = block.sender.take() {
                let _ = sender.send(());
            }
        }
    }

    /// Clears the blocking-XREAD slot. The resolver calls this on both the
    /// wake and the timeout path.
    pub fn clear_block(&mut self) {
        self.block = None;
    }
}
