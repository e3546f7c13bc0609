use std::net::SocketAddr;

use crate::sink::LogSink;

/// Lifecycle events of a server instance. One message template each; no
/// computation beyond formatting.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    Error(String),
    ClientError {
        addr: Option<SocketAddr>,
        error: String,
    },
    Listening {
        port: u16,
    },
    Banned {
        banner: String,
        username: String,
        reason: Option<String>,
    },
    Seed(i64),
}

/// Lifecycle events of a connected player.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Connected {
        username: String,
        addr: Option<SocketAddr>,
    },
    Spawned,
    Disconnected {
        username: String,
    },
    Chat {
        username: String,
        message: String,
    },
    Kicked {
        kicker: String,
        username: String,
        reason: Option<String>,
    },
}

pub fn log_server_event(sink: &LogSink, event: &ServerEvent) {
    match event {
        ServerEvent::Error(error) => sink.err(&format!("Server: {error}")),
        ServerEvent::ClientError { addr, error } => {
            sink.err(&format!("Client {} : {error}", fmt_addr(*addr)));
        }
        ServerEvent::Listening { port } => {
            let settings = sink.settings();
            sink.info(&format!(
                "Server listening on port {port}, version {} (path: {})",
                settings.version,
                settings.world_folder.display(),
            ));
        }
        ServerEvent::Banned { banner, username, reason } => {
            sink.info(&format!("{banner} banned {username}{}", fmt_reason(reason)));
        }
        ServerEvent::Seed(seed) => sink.info(&format!("World seed: {seed}")),
    }
}

pub fn log_client_event(sink: &LogSink, event: &ClientEvent) {
    match event {
        ClientEvent::Connected { username, addr } => {
            sink.info(&format!("{username} ({}) connected", fmt_addr(*addr)));
        }
        ClientEvent::Spawned => sink.info("Position written, spawning player..."),
        ClientEvent::Disconnected { username } => {
            sink.info(&format!("{username} disconnected"));
        }
        ClientEvent::Chat { username, message } => {
            sink.info(&format!("<{username}> {message}"));
        }
        ClientEvent::Kicked { kicker, username, reason } => {
            sink.info(&format!("{kicker} kicked {username}{}", fmt_reason(reason)));
        }
    }
}

fn fmt_addr(addr: Option<SocketAddr>) -> String {
    match addr {
        Some(addr) => addr.to_string(),
        None => "unknown".to_owned(),
    }
}

fn fmt_reason(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(" ({reason})"),
        None => String::new(),
    }
}
