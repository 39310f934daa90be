use clap::{Args, Parser, Subcommand};

use crate::config::{
    DEFAULT_BUFSIZE, DEFAULT_HOST, DEFAULT_MAX_THREAD, DEFAULT_PORT, ServerConfig,
};
use crate::frame::DEFAULT_LENGTH_SIZE;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the THTTP chat server.
    Server(ServerArgs),
    /// Connect to a server and chat from the terminal.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Host or address to listen on.
    #[arg(long, env = "THTTP_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on. Use 0 for an ephemeral port.
    #[arg(long, env = "THTTP_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Worker pool size; each connected client occupies one worker.
    #[arg(long, env = "THTTP_MAX_THREAD", default_value_t = DEFAULT_MAX_THREAD)]
    pub max_thread: usize,

    /// Bytes requested per socket read.
    #[arg(long, env = "THTTP_BUFSIZE", default_value_t = DEFAULT_BUFSIZE)]
    pub bufsize: usize,

    /// Digit width of the frame length prefix.
    #[arg(long, env = "THTTP_LENGTH_SIZE", default_value_t = DEFAULT_LENGTH_SIZE)]
    pub length_size: usize,
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_thread: args.max_thread,
            bufsize: args.bufsize,
            length_size: args.length_size,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Address of the server to connect to.
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub server: String,

    #[arg(long, env = "THTTP_BUFSIZE", default_value_t = DEFAULT_BUFSIZE)]
    pub bufsize: usize,

    #[arg(long, env = "THTTP_LENGTH_SIZE", default_value_t = DEFAULT_LENGTH_SIZE)]
    pub length_size: usize,
}
