use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::{Conflict, FrameError};
use crate::frame::FrameCodec;
use crate::message::{Method, Request, Response, Status};
use crate::registry::{ConnectionId, Delivery, Inbox, Outbox, Registry, Roster};

pub const CORRUPTED_REQUEST: &str = "Corrupted request!";

/// Why a connection's read loop stopped.
#[derive(Debug)]
pub enum Disconnect {
    /// The peer closed its side of the stream.
    Closed,
    Transport(io::Error),
    Malformed(FrameError),
}

/// Translates one connection's requests into registry transitions and responses.
///
/// Replies go through the connection's own [`Outbox`]. Broadcasts are queued on
/// the outboxes of a [`Roster`] while the registry lock is held, and nothing
/// here writes to a socket.
#[derive(Clone)]
pub struct Dispatcher {
    id: ConnectionId,
    registry: Registry,
    outbox: Outbox,
}

impl Dispatcher {
    pub fn new(id: ConnectionId, registry: Registry, outbox: Outbox) -> Self {
        Self {
            id,
            registry,
            outbox,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Serves requests read from `reader` until it closes or sends a malformed
    /// chunk, then runs the disconnect cleanup.
    pub async fn run<R>(&self, mut reader: R, codec: FrameCodec, bufsize: usize) -> Disconnect
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; bufsize.max(codec.length_size())];

        let reason = loop {
            let read = match reader.read(&mut buf).await {
                Ok(0) => break Disconnect::Closed,
                Ok(read) => read,
                Err(err) => break Disconnect::Transport(err),
            };

            // Each read is decoded on its own; frames never span two reads.
            let payloads = match codec.split_all(&buf[..read]) {
                Ok(payloads) => payloads,
                Err(err) => break Disconnect::Malformed(err),
            };
            for payload in payloads {
                self.handle_payload(&payload).await;
            }
        };

        match &reason {
            Disconnect::Closed => debug!(conn = self.id, "peer closed connection"),
            Disconnect::Transport(err) => debug!(conn = self.id, error = ?err, "read failed"),
            Disconnect::Malformed(err) => warn!(conn = self.id, error = %err, "malformed frame"),
        }
        self.disconnect().await;
        reason
    }

    pub async fn handle_payload(&self, payload: &str) {
        self.handle_request(&Request::parse(payload)).await;
    }

    pub async fn handle_request(&self, request: &Request) {
        let method = match request.validate() {
            Ok(method) => method,
            Err(err) => {
                warn!(conn = self.id, error = %err, "invalid request");
                self.reply(Response::new(Status::BadRequest, CORRUPTED_REQUEST))
                    .await;
                return;
            }
        };
        debug!(conn = self.id, request = %request, "dispatching");

        let (ok, failed) = method.statuses();
        match method {
            Method::SignIn => {
                let outcome = self.registry.sign_in(self.id, request.body()).await;
                self.reply(respond(outcome, ok, failed)).await;
            }
            Method::SignOut => {
                let outcome = self.registry.sign_out(self.id).await;
                self.reply(respond(outcome, ok, failed)).await;
            }
            Method::Join => {
                let outcome = self
                    .registry
                    .join(self.id, request.body(), broadcast_members)
                    .await
                    .map(|(description, _)| description);
                self.reply(respond(outcome, ok, failed)).await;
            }
            Method::Leave => match self.registry.leave(self.id, broadcast_members).await {
                Ok((description, _)) => {
                    self.reply(Response::new(Status::Members, "")).await;
                    self.reply(Response::new(ok, description)).await;
                }
                Err(conflict) => self.reply(Response::new(failed, conflict.to_string())).await,
            },
            Method::Send => {
                let sent = self
                    .registry
                    .send(self.id, |username, roster| {
                        let line = format!("{username}: {}", request.body());
                        broadcast(roster, |_| Response::new(ok, line.clone()));
                    })
                    .await;
                if let Err(conflict) = sent {
                    self.reply(Response::new(failed, conflict.to_string())).await;
                }
            }
        }
    }

    /// Implicit leave and sign-out for a connection that went away, then
    /// releases its registry slot. Safe to call more than once.
    pub async fn disconnect(&self) {
        let release = self.registry.release(self.id, broadcast_members).await;

        match release.left {
            Ok(remaining) => {
                info!(conn = self.id, remaining = remaining.len(), "left group on disconnect");
            }
            Err(conflict) => debug!(conn = self.id, %conflict, "no group to leave"),
        }
        match release.signed_out {
            Ok(()) => info!(conn = self.id, "signed out on disconnect"),
            Err(conflict) => debug!(conn = self.id, %conflict, "no user to sign out"),
        }
        if !release.removed {
            debug!(conn = self.id, "connection already released");
        }
    }

    /// Queues a direct reply, waiting for room in this connection's outbox.
    async fn reply(&self, response: Response) {
        if self.outbox.send(response).await.is_err() {
            debug!(conn = self.id, "writer gone, dropping reply");
        }
    }
}

fn respond(outcome: Result<String, Conflict>, ok: Status, failed: Status) -> Response {
    match outcome {
        Ok(description) => Response::new(ok, description),
        Err(conflict) => Response::new(failed, conflict.to_string()),
    }
}

/// Sends each member the names of the other members of its group.
fn broadcast_members(roster: &Roster) {
    broadcast(roster, |member| {
        Response::new(Status::Members, roster.names_excluding(Some(member)))
    });
}

fn broadcast<F>(roster: &Roster, mut response_for: F)
where
    F: FnMut(ConnectionId) -> Response,
{
    for member in roster.members() {
        match member.deliver(response_for(member.id)) {
            Delivery::Queued => {}
            Delivery::Lagging => warn!(
                conn = member.id,
                user = %member.username,
                "outbox full, dropping broadcast for lagging connection"
            ),
            Delivery::Closed => debug!(conn = member.id, "dropping broadcast to closed connection"),
        }
    }
}

/// Writes queued responses to the peer until every outbox handle is dropped.
pub async fn drain_outbox<W>(
    mut writer: W,
    mut inbox: Inbox,
    codec: FrameCodec,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = inbox.recv().await {
        writer.write_all(&response.encode(&codec)).await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}
