use anyhow::{Context, Result};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    select,
};
use tracing::{debug, warn};

use crate::{
    cli::ClientArgs,
    config::validate_framing,
    error::FrameError,
    frame::FrameCodec,
    message::{Method, Request, Response, Status},
};

/// What a line typed by the user turns into.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Request(Request),
    Quit,
    Ignore,
}

/// `/signin <name>`, `/signout`, `/join <group>`, `/leave`, `/quit`; anything
/// else is chat text.
pub fn parse_input(line: &str) -> Input {
    let text = line.trim();
    if text.is_empty() {
        return Input::Ignore;
    }

    let Some(command) = text.strip_prefix('/') else {
        return Input::Request(Request::new(Method::Send, text));
    };
    let (verb, argument) = command
        .split_once(char::is_whitespace)
        .map(|(verb, argument)| (verb, argument.trim()))
        .unwrap_or((command, ""));

    match verb.to_ascii_lowercase().as_str() {
        "quit" => Input::Quit,
        "signin" => Input::Request(Request::new(Method::SignIn, argument)),
        "signout" => Input::Request(Request::new(Method::SignOut, "")),
        "join" => Input::Request(Request::new(Method::Join, argument)),
        "leave" => Input::Request(Request::new(Method::Leave, "")),
        _ => Input::Request(Request::new(Method::Send, text)),
    }
}

/// Line shown for a validated response.
pub fn render_response(status: Status, response: &Response) -> String {
    match status {
        Status::Chat => response.body().to_string(),
        Status::Members => {
            let members = response.body().trim_matches(',');
            if members.is_empty() {
                "*** members: <none>".to_string()
            } else {
                format!("*** members: {members}")
            }
        }
        _ => response.to_string(),
    }
}

/// Reassembles response frames that arrive cut across socket reads.
#[derive(Debug)]
pub struct ResponseReader {
    codec: FrameCodec,
    pending: Vec<u8>,
}

impl ResponseReader {
    pub fn new(codec: FrameCodec) -> Self {
        Self {
            codec,
            pending: Vec::new(),
        }
    }

    /// Feeds one read and returns the rendered lines of every response it
    /// completed. A malformed frame discards whatever is still buffered.
    pub fn feed(&mut self, chunk: &[u8]) -> (Vec<String>, Option<FrameError>) {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        loop {
            let payloads = match self.codec.drain_complete(&mut self.pending) {
                Ok(payloads) if payloads.is_empty() => return (lines, None),
                Ok(payloads) => payloads,
                Err(err) => {
                    self.pending.clear();
                    return (lines, Some(err));
                }
            };
            for payload in payloads {
                let response = Response::parse(&payload);
                match response.validate() {
                    Ok(status) => lines.push(render_response(status, &response)),
                    Err(err) => debug!(error = %err, "ignoring invalid response"),
                }
            }
        }
    }

    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

pub async fn run(args: ClientArgs) -> Result<()> {
    validate_framing(args.length_size, args.bufsize)?;
    let codec = FrameCodec::new(args.length_size);

    let (mut reader, mut writer) = establish_connection(&args).await?;
    write_stdout(&format!("*** connected to {}", args.server)).await?;

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut input = String::new();
    let mut buf = vec![0u8; args.bufsize];
    let mut responses = ResponseReader::new(codec);

    run_client_loop(
        &mut reader,
        &mut writer,
        &mut stdin,
        &mut input,
        &mut buf,
        &mut responses,
        codec,
    )
    .await?;
    shutdown_connection(&mut writer).await;

    Ok(())
}

async fn establish_connection(args: &ClientArgs) -> Result<(OwnedReadHalf, OwnedWriteHalf)> {
    let stream = TcpStream::connect(&args.server)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;

    debug!("connected to {}", args.server);
    Ok(stream.into_split())
}

async fn run_client_loop(
    reader: &mut OwnedReadHalf,
    writer: &mut OwnedWriteHalf,
    stdin: &mut BufReader<tokio::io::Stdin>,
    input: &mut String,
    buf: &mut [u8],
    responses: &mut ResponseReader,
    codec: FrameCodec,
) -> Result<()> {
    loop {
        input.clear();
        select! {
            read = reader.read(buf) => {
                if !handle_server_chunk(read, buf, responses).await? {
                    break;
                }
            }
            bytes_read = stdin.read_line(input) => {
                if !handle_stdin_input(bytes_read, input, writer, codec).await? {
                    break;
                }
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                if let Err(error) = ctrl_c {
                    warn!(?error, "ctrl-c handler failed");
                }
                break;
            }
        }
    }
    Ok(())
}

async fn handle_server_chunk(
    read: io::Result<usize>,
    buf: &[u8],
    responses: &mut ResponseReader,
) -> Result<bool> {
    let read = read?;
    if read == 0 {
        if responses.buffered() > 0 {
            debug!(bytes = responses.buffered(), "discarding unfinished frame");
        }
        write_stdout("*** server closed the connection").await?;
        return Ok(false);
    }

    let (lines, failure) = responses.feed(&buf[..read]);
    for line in lines {
        write_stdout(&line).await?;
    }
    if let Some(err) = failure {
        write_stderr(&format!("!!! dropped malformed data: {err}")).await?;
    }
    Ok(true)
}

async fn handle_stdin_input(
    bytes_read: io::Result<usize>,
    input: &str,
    writer: &mut OwnedWriteHalf,
    codec: FrameCodec,
) -> Result<bool> {
    if bytes_read? == 0 {
        return Ok(false);
    }

    match parse_input(input) {
        Input::Ignore => Ok(true),
        Input::Quit => {
            write_stdout("*** leaving chat").await?;
            Ok(false)
        }
        Input::Request(request) => {
            writer.write_all(&request.encode(&codec)).await?;
            writer.flush().await?;
            Ok(true)
        }
    }
}

async fn shutdown_connection(writer: &mut OwnedWriteHalf) {
    if let Err(error) = writer.shutdown().await {
        warn!(?error, "failed to shutdown client writer cleanly");
    }
}

async fn write_stdout(line: &str) -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

async fn write_stderr(line: &str) -> io::Result<()> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(line.as_bytes()).await?;
    stderr.write_all(b"\n").await?;
    stderr.flush().await
}
