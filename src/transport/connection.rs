//! A single framed duplex stream to one peer, with inbound frames matched
//! to pending receives by PC tag (SPEC_FULL.md §4.5).
//!
//! Grounded on the teacher's `net::channel::Channel` (a boxed trait over a
//! TLS stream with blocking length-prefixed `send`/`recv`), restructured
//! around `tokio::task::spawn_local` reader/writer tasks so a `recv` for a
//! tag that hasn't arrived yet suspends instead of blocking the event loop,
//! and an arrival with no waiting `recv` queues instead of being dropped.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, Notify};

use crate::error::RuntimeError;
use crate::frame::{self, DataFrame};
use crate::pc::Tag;
use crate::player::PlayerId;

/// Outbound queue depth before `send` starts applying backpressure
/// (SPEC_FULL.md §4.5 "bounded outbound queue per peer").
const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// Shared per-player abort state: a malformed frame from any peer is fatal
/// (SPEC_FULL.md §4.5 "unpacking errors are fatal: they abort the runtime
/// and close all connections"). One `AbortSignal` is shared by every
/// `Connection` in a player's [`super::Network`], so a bad frame from one
/// peer fails every pending and future `send`/`recv` on all of them.
pub(crate) struct AbortSignal {
    notify: Notify,
    peer: Cell<Option<PlayerId>>,
}

impl AbortSignal {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            notify: Notify::new(),
            peer: Cell::new(None),
        })
    }

    fn trigger(&self, peer: PlayerId) {
        if self.peer.get().is_none() {
            self.peer.set(Some(peer));
        }
        self.notify.notify_waiters();
    }

    pub(crate) fn aborted_peer(&self) -> Option<PlayerId> {
        self.peer.get()
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

#[derive(Default)]
struct Dispatch {
    /// Frames that arrived before anyone asked for them, queued by tag.
    early_arrivals: HashMap<Tag, VecDeque<Vec<u8>>>,
    /// Waiters for a tag that hasn't arrived yet.
    pending_awaits: HashMap<Tag, VecDeque<oneshot::Sender<Vec<u8>>>>,
}

/// A framed connection to one peer. `R`/`W` are the split halves of
/// whatever transport carries the bytes (`tokio::net::TcpStream` or an
/// in-memory `tokio::io::duplex` pair); both are driven entirely from the
/// single task that owns this connection's `LocalSet`, so the dispatch
/// table is plain `Rc<RefCell<_>>`, not `Arc<Mutex<_>>` (SPEC_FULL.md §5).
pub struct Connection {
    peer: PlayerId,
    dispatch: Rc<RefCell<Dispatch>>,
    outbound: Rc<RefCell<Option<mpsc::Sender<Vec<u8>>>>>,
    abort: Rc<AbortSignal>,
}

impl Connection {
    /// Spawns the reader and writer tasks for an already-handshaken stream
    /// and returns the handle used to send/recv framed payloads. `abort` is
    /// shared with every other connection in the same player's `Network` so
    /// one malformed frame takes the whole player down, not just this link.
    pub(crate) fn spawn<R, W>(peer: PlayerId, mut reader: R, mut writer: W, abort: Rc<AbortSignal>) -> Rc<Self>
    where
        R: AsyncRead + Unpin + 'static,
        W: AsyncWrite + Unpin + 'static,
    {
        let dispatch = Rc::new(RefCell::new(Dispatch::default()));
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_QUEUE_DEPTH);
        let outbound = Rc::new(RefCell::new(Some(outbound_tx)));

        tokio::task::spawn_local(async move {
            while let Some(body) = outbound_rx.recv().await {
                if frame::write_framed(&mut writer, &body).await.is_err() {
                    break;
                }
            }
        });

        let reader_dispatch = dispatch.clone();
        let reader_abort = abort.clone();
        let reader_outbound = outbound.clone();
        tokio::task::spawn_local(async move {
            loop {
                let body = match frame::read_framed(&mut reader).await {
                    Ok(body) => body,
                    Err(_) => break,
                };
                let frame = match frame::decode_data_frame(&body, peer) {
                    Ok(frame) => frame,
                    Err(reason) => {
                        log::error!("aborting: malformed frame from peer {peer}: {reason}");
                        reader_abort.trigger(peer);
                        reader_outbound.borrow_mut().take();
                        break;
                    }
                };
                deliver(&reader_dispatch, frame);
            }
        });

        Rc::new(Self {
            peer,
            dispatch,
            outbound,
            abort,
        })
    }

    pub fn peer(&self) -> PlayerId {
        self.peer
    }

    /// Encodes and enqueues a payload under `tag`. Suspends only if the
    /// outbound queue is full (backpressure) or the connection aborts,
    /// never on the peer's ack.
    pub async fn send(&self, tag: &Tag, payload: Vec<u8>) -> Result<(), RuntimeError> {
        if let Some(bad_peer) = self.abort.aborted_peer() {
            return Err(RuntimeError::ConnectionLost(bad_peer));
        }
        let sender = match self.outbound.borrow().clone() {
            Some(sender) => sender,
            None => return Err(RuntimeError::ConnectionLost(self.peer)),
        };
        let frame = DataFrame {
            tag: tag.clone(),
            payload,
        };
        let bytes = frame::encode_data_frame(&frame)?;
        tokio::select! {
            result = sender.send(bytes) => result.map_err(|_| RuntimeError::ConnectionLost(self.peer)),
            _ = self.abort.wait() => Err(RuntimeError::ConnectionLost(self.abort.aborted_peer().unwrap_or(self.peer))),
        }
    }

    /// Waits for the payload tagged `tag`, pulling it from the early-arrival
    /// queue if it has already shown up, else registering a waiter that the
    /// reader task resolves when the frame lands. For any given tag, at
    /// most one of the two queues ever holds an entry at a time
    /// (SPEC_FULL.md §4.5 "at most one of the two queues is non-empty").
    pub async fn recv(&self, tag: &Tag) -> Result<Vec<u8>, RuntimeError> {
        if let Some(bad_peer) = self.abort.aborted_peer() {
            return Err(RuntimeError::ConnectionLost(bad_peer));
        }
        let rx = {
            let mut dispatch = self.dispatch.borrow_mut();
            if let Some(queue) = dispatch.early_arrivals.get_mut(tag) {
                if let Some(payload) = queue.pop_front() {
                    if queue.is_empty() {
                        dispatch.early_arrivals.remove(tag);
                    }
                    return Ok(payload);
                }
            }
            let (tx, rx) = oneshot::channel();
            dispatch
                .pending_awaits
                .entry(tag.clone())
                .or_default()
                .push_back(tx);
            rx
        };
        tokio::select! {
            result = rx => result.map_err(|_| RuntimeError::ConnectionLost(self.peer)),
            _ = self.abort.wait() => Err(RuntimeError::ConnectionLost(self.abort.aborted_peer().unwrap_or(self.peer))),
        }
    }

    /// Drops the outbound sender, which stops the writer task and closes
    /// this side of the stream; the reader task exits on its own once the
    /// peer's corresponding half closes (or this one is dropped).
    pub async fn close(&self) {
        self.outbound.borrow_mut().take();
    }
}

fn deliver(dispatch: &Rc<RefCell<Dispatch>>, frame: DataFrame) {
    let mut dispatch = dispatch.borrow_mut();
    if let Some(waiters) = dispatch.pending_awaits.get_mut(&frame.tag) {
        if let Some(waiter) = waiters.pop_front() {
            if waiters.is_empty() {
                dispatch.pending_awaits.remove(&frame.tag);
            }
            let _ = waiter.send(frame.payload);
            return;
        }
    }
    dispatch
        .early_arrivals
        .entry(frame.tag)
        .or_default()
        .push_back(frame.payload);
}
