//! Server configuration and the accept loop.
//!
//! Configuration is parsed from the command line by hand; the server then
//! either serves as a master or, when `--replicaof` is present, performs
//! the replication handshake and streams from its master while still
//! serving read traffic on its own port.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rand::Rng;
use regex::Regex;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};

use crate::connection::{handle_client_connection, handle_master_link};
use crate::handshake::MasterLink;
use crate::replication::Replica;
use crate::state::State;
use crate::store::Store;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum CliError {
    #[error("unknown command line flag {0}")]
    UnknownFlag(String),
    #[error("missing value for flag {0}")]
    MissingFlagValue(String),
    #[error("invalid port number")]
    InvalidPort,
    #[error("invalid master address")]
    InvalidMasterAddress,
    #[error("invalid master port")]
    InvalidMasterPort,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Role {
    Master,
    Replica { host: String, port: u32 },
}

impl Role {
    /// The role name as reported by INFO, using the protocol's historical
    /// terminology for replicas.
    pub fn as_str(&self) -> &str {
        match self {
            Role::Master => "master",
            Role::Replica { .. } => "slave",
        }
    }
}

#[derive(Debug)]
pub struct Server {
    pub port: u32,
    pub role: Role,
    /// Fixed for the lifetime of the process; clients see it via INFO and
    /// the FULLRESYNC header.
    pub repl_id: String,
    /// On a master: bytes of write frames propagated so far. On a replica:
    /// bytes of frames applied from the master since the snapshot.
    pub repl_offset: u64,
    pub dir: String,
    pub dbfilename: String,
    /// Attached replica connections, present only on a master.
    pub replicas: Option<HashMap<String, Replica>>,
}

impl Server {
    /// Builds the configuration from command line arguments.
    ///
    /// Supported flags: `--port <n>`, `--replicaof "<host> <port>"`,
    /// `--dir <path>` and `--dbfilename <name>`.
    pub fn new<I: IntoIterator<Item = String>>(command_line_args: I) -> Result<Self, CliError> {
        let mut arguments = command_line_args.into_iter().skip(1);

        let mut port = None;
        let mut role = None;
        let mut dir = None;
        let mut dbfilename = None;

        while let Some(flag) = arguments.next() {
            let mut next_value = |flag: &str| {
                arguments
                    .next()
                    .ok_or_else(|| CliError::MissingFlagValue(flag.to_string()))
            };

            match flag.as_str() {
                "--port" => {
                    let value = next_value("--port")?;
                    port = Some(validate_port(&value, CliError::InvalidPort)?);
                }
                "--replicaof" => {
                    let value = next_value("--replicaof")?;
                    let (host, master_port) = validate_master_address(&value)?;
                    role = Some(Role::Replica {
                        host,
                        port: master_port,
                    });
                }
                "--dir" => {
                    dir = Some(next_value("--dir")?);
                }
                "--dbfilename" => {
                    dbfilename = Some(next_value("--dbfilename")?);
                }
                unknown => return Err(CliError::UnknownFlag(unknown.to_string())),
            }
        }

        let role = role.unwrap_or(Role::Master);
        let replicas = match role {
            Role::Master => Some(HashMap::new()),
            Role::Replica { .. } => None,
        };

        Ok(Server {
            port: port.unwrap_or(6379),
            role,
            repl_id: generate_replication_id(),
            repl_offset: 0,
            dir: dir.unwrap_or_else(|| ".".to_string()),
            dbfilename: dbfilename.unwrap_or_default(),
            replicas,
        })
    }

    /// The snapshot file to load at startup, when one is configured.
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        if self.dbfilename.is_empty() {
            return None;
        }

        Some(PathBuf::from(&self.dir).join(&self.dbfilename))
    }

    /// Runs the server until the process exits.
    ///
    /// A replica first completes the handshake with its master and spawns
    /// the streaming task; both roles then serve client connections.
    pub async fn run(self, store: Store) {
        let port = self.port;
        let role = self.role.clone();

        let store = Arc::new(Mutex::new(store));
        let state = Arc::new(Mutex::new(State::new()));
        let server = Arc::new(RwLock::new(self));

        if let Role::Replica {
            host,
            port: master_port,
        } = &role
        {
            let master_addr = format!("{}:{}", host, master_port);

            let link = match MasterLink::connect(&master_addr).await {
                Ok(link) => link,
                Err(error) => {
                    tracing::error!(master = %master_addr, %error, "could not reach master");
                    return;
                }
            };

            let (stream, leftover) = match link.perform(port).await {
                Ok(connected) => connected,
                Err(error) => {
                    tracing::error!(master = %master_addr, %error, "replication handshake failed");
                    return;
                }
            };

            tracing::info!(master = %master_addr, "replication handshake complete");

            let server_clone = Arc::clone(&server);
            let store_clone = Arc::clone(&store);
            let state_clone = Arc::clone(&state);

            tokio::spawn(async move {
                handle_master_link(stream, leftover, server_clone, store_clone, state_clone).await;
            });
        }

        let listener = match TcpListener::bind(format!("127.0.0.1:{}", port)).await {
            Ok(listener) => listener,
            Err(error) => {
                tracing::error!(port, %error, "failed to bind listener");
                return;
            }
        };

        tracing::info!(port, role = role.as_str(), "accepting connections");

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let server_clone = Arc::clone(&server);
                    let store_clone = Arc::clone(&store);
                    let state_clone = Arc::clone(&state);

                    tokio::spawn(async move {
                        handle_client_connection(
                            stream,
                            peer_addr.to_string(),
                            server_clone,
                            store_clone,
                            state_clone,
                        )
                        .await;
                    });
                }
                Err(error) => {
                    tracing::error!(%error, "accept failed");
                }
            }
        }
    }
}

const HEX_ALPHABET: &[u8] = b"0123456789abcdef";

fn generate_replication_id() -> String {
    let mut rng = rand::rng();

    (0..40)
        .map(|_| HEX_ALPHABET[rng.random_range(0..HEX_ALPHABET.len())] as char)
        .collect()
}

fn validate_port(raw: &str, error: CliError) -> Result<u32, CliError> {
    let port = raw.parse::<u32>().map_err(|_| error.clone())?;

    if !(1..=65535).contains(&port) {
        return Err(error);
    }

    Ok(port)
}

/// Validates a `"<host> <port>"` master address; the host may be an IPv4
/// address or a hostname.
fn validate_master_address(raw: &str) -> Result<(String, u32), CliError> {
    let parts: Vec<&str> = raw.split_whitespace().collect();

    if parts.len() != 2 {
        return Err(CliError::InvalidMasterAddress);
    }

    let ipv4 = Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").unwrap();
    let hostname = Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9\-\.]*$").unwrap();

    let host = parts[0];
    let host_is_valid = if ipv4.is_match(host) {
        host.split('.')
            .all(|octet| octet.parse::<u16>().is_ok_and(|value| value <= 255))
    } else {
        hostname.is_match(host)
    };

    if !host_is_valid {
        return Err(CliError::InvalidMasterAddress);
    }

    let port = validate_port(parts[1], CliError::InvalidMasterPort)?;

    Ok((host.to_string(), port))
}
