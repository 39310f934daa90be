use std::{future::Future, net::SocketAddr};

use anyhow::{Context, Result};
use tokio::{
    net::{TcpListener, TcpStream},
    select,
};
use tracing::{debug, info, warn};

use crate::{
    config::ServerConfig,
    dispatcher::{Dispatcher, Disconnect, drain_outbox},
    frame::FrameCodec,
    pool::WorkerPool,
    registry::{Registry, outbox_channel},
};

pub struct Server {
    listener: TcpListener,
    registry: Registry,
    pool: WorkerPool,
    codec: FrameCodec,
    bufsize: usize,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.listen_addr())
            .await
            .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
        Ok(Self::new(listener, &config))
    }

    pub fn new(listener: TcpListener, config: &ServerConfig) -> Self {
        Self {
            listener,
            registry: Registry::new(),
            pool: WorkerPool::new(config.max_thread),
            codec: config.codec(),
            bufsize: config.bufsize,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the shared state, mainly for inspection.
    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!(idle_workers = self.pool.idle(), "server shutting down");
                    break;
                }
                accept_result = self.listener.accept() => {
                    self.handle_accept_result(accept_result).await;
                }
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }

    async fn handle_accept_result(&self, result: std::io::Result<(TcpStream, SocketAddr)>) {
        match result {
            Ok((stream, peer)) => self.accept_connection(stream, peer).await,
            Err(err) => warn!(error = ?err, "failed to accept connection"),
        }
    }

    /// Registers the connection right away; its dispatcher then queues for a worker.
    async fn accept_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let (outbox, inbox) = outbox_channel();
        let id = self.registry.register(outbox.clone()).await;
        info!(conn = id, %peer, "client connected");

        let dispatcher = Dispatcher::new(id, self.registry.clone(), outbox);
        let codec = self.codec;
        let bufsize = self.bufsize;

        self.pool.submit(async move {
            let (reader, writer) = stream.into_split();
            let writer_task = tokio::spawn(drain_outbox(writer, inbox, codec));

            match dispatcher.run(reader, codec, bufsize).await {
                Disconnect::Closed => info!(conn = id, %peer, "client disconnected"),
                Disconnect::Transport(err) => {
                    warn!(conn = id, %peer, error = ?err, "client connection closed with error")
                }
                Disconnect::Malformed(err) => {
                    warn!(conn = id, %peer, error = %err, "client dropped after malformed frame")
                }
            }

            // Dropping the last outbox handle lets the writer flush and exit.
            drop(dispatcher);
            match writer_task.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => debug!(conn = id, error = ?err, "writer stopped early"),
                Err(err) => warn!(conn = id, error = ?err, "writer task failed"),
            }
        });
    }
}
