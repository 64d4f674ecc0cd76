//! Demo binary driving `wsdriver` with fragmented frames.
//!
//! Splits the message given on the command line into frames, feeds them to
//! an event driver and prints the events the application observes.

mod cli;

use std::{io, sync::Arc};

use bytes::Bytes;
use clap::Parser;
use cli::{Cli, Kind, Mode, Role};
use tokio::sync::mpsc;
use tracing::info;
use wsdriver::{
    close::CloseCode,
    connection::Connection,
    driver::EventDriver,
    error::DispatchError,
    events::{EventTable, SessionContext},
    frame::{Frame, OpCode},
    policy::WebSocketPolicy,
    pool::DefaultBufferPool,
    stream::{MessageStream, TextStream},
};

/// Connection that reports outbound frames on stdout.
struct StdoutConnection;

impl Connection for StdoutConnection {
    fn close(&self, code: CloseCode, reason: &str) -> io::Result<()> {
        println!("close sent: {code} {reason}");
        Ok(())
    }

    fn send(&self, frame: Frame) -> io::Result<()> {
        println!("frame sent: {frame}");
        Ok(())
    }

    fn is_open(&self) -> bool { true }
}

enum Incoming {
    Text(TextStream),
    Binary(MessageStream),
}

struct Demo {
    streams: mpsc::UnboundedSender<Incoming>,
}

impl Demo {
    fn forward(&self, incoming: Incoming) {
        if self.streams.send(incoming).is_err() {
            info!("stream reader gone; dropping stream");
        }
    }
}

fn demo_table(mode: Mode) -> EventTable<Demo> {
    let builder = EventTable::builder()
        .on_connect(|_: &mut Demo, ctx: &SessionContext| {
            println!("connected ({:?})", ctx.policy().behavior());
            Ok(())
        })
        .on_error(|_: &mut Demo, _: &SessionContext, error: &DispatchError| {
            println!("error: {error}");
            Ok(())
        });
    match mode {
        Mode::Buffered => builder
            .on_text(|_: &mut Demo, _: &SessionContext, text: &str| {
                println!("text message: {text}");
                Ok(())
            })
            .on_binary(|_: &mut Demo, _: &SessionContext, data: &[u8]| {
                println!("binary message: {} bytes", data.len());
                Ok(())
            })
            .build(),
        Mode::Streaming => builder
            .on_text_stream(|demo: &mut Demo, _: &SessionContext, stream: TextStream| {
                println!("text stream opened");
                demo.forward(Incoming::Text(stream));
                Ok(())
            })
            .on_binary_stream(|demo: &mut Demo, _: &SessionContext, stream: MessageStream| {
                println!("binary stream opened");
                demo.forward(Incoming::Binary(stream));
                Ok(())
            })
            .build(),
    }
}

/// Split `message` into frames of at most `size` payload bytes.
fn fragment(kind: Kind, message: &[u8], size: usize) -> Vec<Frame> {
    let first = match kind {
        Kind::Text => OpCode::Text,
        Kind::Binary => OpCode::Binary,
    };
    if message.is_empty() {
        return vec![Frame::new(first, true, Bytes::new())];
    }
    let count = message.len().div_ceil(size);
    message
        .chunks(size)
        .enumerate()
        .map(|(index, chunk)| {
            let opcode = if index == 0 { first } else { OpCode::Continuation };
            Frame::new(opcode, index + 1 == count, Bytes::copy_from_slice(chunk))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Enable structured logging for the demo.
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let policy = match cli.role {
        Role::Server => WebSocketPolicy::server(),
        Role::Client => WebSocketPolicy::client(),
    }
    .with_buffer_size(cli.buffer_size);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut driver = EventDriver::new(
        Demo { streams: tx },
        Arc::new(demo_table(cli.mode)),
        policy,
        Arc::new(DefaultBufferPool::default()),
    );
    driver.set_connection(Arc::new(StdoutConnection));
    driver.on_connect();

    let frames = fragment(cli.kind, cli.message.as_bytes(), cli.fragment_size.get());
    info!(frames = frames.len(), "dispatching frames");
    for frame in frames {
        driver.on_frame(frame);
    }
    drop(driver);

    while let Some(incoming) = rx.recv().await {
        match incoming {
            Incoming::Text(stream) => println!("text stream: {}", stream.read_to_string().await?),
            Incoming::Binary(stream) => {
                println!("binary stream: {} bytes", stream.read_to_end().await?.len());
            }
        }
    }
    Ok(())
}
