// Command transport to a single brick
//
// One connection owns one physical channel. All mutable link state (the
// channel, the message counter and parked replies) lives behind a single
// mutex, so several logical callers can safely share the brick. Replies
// are matched to waiters by message counter: whoever is reading when a
// foreign reply arrives parks it for the caller it belongs to.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use super::ops;
use super::transport::Channel;
use super::{Ev3Error, Result};

/// Reply handling for sent commands.
///
/// `Standard` requests a reply whenever the command uses global memory
/// and waits for it. `Async` requests replies the same way but never
/// waits; the caller collects them later with [`Brick::wait_for_reply`].
/// `Sync` always requests a reply and waits, so control only returns
/// once the brick has finished the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    #[default]
    Standard,
    Async,
    Sync,
}

/// Outcome of a sent command.
#[derive(Debug)]
pub enum Outcome {
    /// No reply was waited for; the counter claims it later if one comes.
    Pending(u16),
    /// Validated reply payload.
    Reply(Vec<u8>),
}

struct Link {
    channel: Channel,
    msg_count: u16,
    parked: HashMap<u16, Vec<u8>>,
}

impl Link {
    fn next_counter(&mut self) -> u16 {
        self.msg_count = advance(self.msg_count);
        self.msg_count
    }
}

/// Counters are never 0: the value after 65535 is 1.
fn advance(counter: u16) -> u16 {
    if counter < u16::MAX { counter + 1 } else { 1 }
}

/// Connection to one motor-controller brick.
pub struct Brick {
    link: Mutex<Link>,
    sync_mode: SyncMode,
    reply_timeout: Option<Duration>,
}

impl Brick {
    pub fn new(channel: Channel) -> Self {
        Self {
            link: Mutex::new(Link {
                channel,
                msg_count: 0,
                parked: HashMap::new(),
            }),
            sync_mode: SyncMode::Standard,
            reply_timeout: None,
        }
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    pub fn set_sync_mode(&mut self, mode: SyncMode) {
        self.sync_mode = mode;
    }

    /// Bound the wait for replies. `None` (the default) waits forever.
    pub fn set_reply_timeout(&mut self, timeout: Option<Duration>) {
        self.reply_timeout = timeout;
    }

    fn lock(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send a direct command.
    ///
    /// `ops` holds the operations only; length, counter, type and the
    /// local/global memory header are added here. Whether the command
    /// requests a reply follows from `global_mem` and the sync mode.
    pub fn send_direct(&self, ops: &[u8], local_mem: u16, global_mem: u16) -> Result<Outcome> {
        let with_reply = global_mem > 0 || self.sync_mode == SyncMode::Sync;
        let cmd_type = if with_reply {
            ops::DIRECT_COMMAND_REPLY
        } else {
            ops::DIRECT_COMMAND_NO_REPLY
        };

        let mut link = self.lock();
        let counter = link.next_counter();
        let mut frame = Vec::with_capacity(ops.len() + 7);
        frame.extend_from_slice(&(ops.len() as u16 + 5).to_le_bytes());
        frame.extend_from_slice(&counter.to_le_bytes());
        frame.push(cmd_type);
        frame.extend_from_slice(&(local_mem * 1024 + global_mem).to_le_bytes());
        frame.extend_from_slice(ops);

        debug!(
            counter,
            kind = link.channel.kind(),
            len = frame.len(),
            "send direct command"
        );
        link.channel.send(&frame)?;

        if !with_reply || self.sync_mode == SyncMode::Async {
            return Ok(Outcome::Pending(counter));
        }
        self.wait_direct_locked(&mut link, counter).map(Outcome::Reply)
    }

    /// Send a system command. `ops` holds the command byte and arguments.
    pub fn send_system(&self, ops: &[u8], reply: bool) -> Result<Outcome> {
        let cmd_type = if reply {
            ops::SYSTEM_COMMAND_REPLY
        } else {
            ops::SYSTEM_COMMAND_NO_REPLY
        };

        let mut link = self.lock();
        let counter = link.next_counter();
        let mut frame = Vec::with_capacity(ops.len() + 5);
        frame.extend_from_slice(&(ops.len() as u16 + 3).to_le_bytes());
        frame.extend_from_slice(&counter.to_le_bytes());
        frame.push(cmd_type);
        frame.extend_from_slice(ops);

        debug!(
            counter,
            kind = link.channel.kind(),
            len = frame.len(),
            "send system command"
        );
        link.channel.send(&frame)?;

        if !reply {
            return Ok(Outcome::Pending(counter));
        }
        self.wait_system_locked(&mut link, counter).map(Outcome::Reply)
    }

    /// Wait for the reply to a direct command sent earlier.
    pub fn wait_for_reply(&self, counter: u16) -> Result<Vec<u8>> {
        let mut link = self.lock();
        self.wait_direct_locked(&mut link, counter)
    }

    /// Wait for the reply to a system command sent earlier.
    pub fn wait_for_system_reply(&self, counter: u16) -> Result<Vec<u8>> {
        let mut link = self.lock();
        self.wait_system_locked(&mut link, counter)
    }

    fn wait_direct_locked(&self, link: &mut Link, counter: u16) -> Result<Vec<u8>> {
        let frame = self.wait_frame(link, counter)?;
        validate_direct(&frame)
    }

    fn wait_system_locked(&self, link: &mut Link, counter: u16) -> Result<Vec<u8>> {
        let frame = self.wait_frame(link, counter)?;
        validate_system(&frame)
    }

    /// Read frames until the one tagged `counter` shows up, parking every
    /// foreign frame for its own waiter. The lock is held across the
    /// whole read-and-dispatch step, so exactly one caller consumes the
    /// shared read stream at a time.
    fn wait_frame(&self, link: &mut Link, counter: u16) -> Result<Vec<u8>> {
        if let Some(frame) = link.parked.remove(&counter) {
            return Ok(frame);
        }
        let deadline = self.reply_timeout.map(|t| Instant::now() + t);
        loop {
            let frame = read_frame(&mut link.channel, deadline)?;
            let reply_counter = u16::from_le_bytes([frame[2], frame[3]]);
            if reply_counter == counter {
                return Ok(frame);
            }
            debug!(counter = reply_counter, "parking reply for another waiter");
            match link.parked.entry(reply_counter) {
                Entry::Occupied(_) => {
                    return Err(Ev3Error::Protocol(format!(
                        "duplicate reply counter {reply_counter}"
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(frame);
                }
            }
        }
    }

    #[cfg(test)]
    fn parked_count(&self) -> usize {
        self.lock().parked.len()
    }
}

fn read_frame(channel: &mut Channel, deadline: Option<Instant>) -> Result<Vec<u8>> {
    let mut header = [0u8; 2];
    channel.receive_exact(&mut header, deadline)?;
    let len = u16::from_le_bytes(header) as usize;
    if len < 3 {
        return Err(Ev3Error::Protocol(format!("undersized frame ({len} bytes)")));
    }
    let mut frame = vec![0u8; len + 2];
    frame[..2].copy_from_slice(&header);
    channel.receive_exact(&mut frame[2..], deadline)?;
    debug!(len = frame.len(), "received frame");
    Ok(frame)
}

/// Check a direct reply's status tag and strip down to the global
/// memory payload.
fn validate_direct(frame: &[u8]) -> Result<Vec<u8>> {
    if frame.len() < 5 {
        return Err(Ev3Error::Protocol("truncated direct reply".into()));
    }
    let counter = u16::from_le_bytes([frame[2], frame[3]]);
    if frame[4] != ops::DIRECT_REPLY {
        return Err(Ev3Error::DirectCommand { counter });
    }
    Ok(frame[5..].to_vec())
}

/// Check a system reply's status tag; the payload follows the echoed
/// command byte and the status code.
fn validate_system(frame: &[u8]) -> Result<Vec<u8>> {
    if frame.len() < 7 {
        return Err(Ev3Error::Protocol("truncated system reply".into()));
    }
    if frame[4] != ops::SYSTEM_REPLY {
        return Err(Ev3Error::SystemCommand { status: frame[6] });
    }
    Ok(frame[7..].to_vec())
}
