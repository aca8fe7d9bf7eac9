//! Redis transport
//!
//! Holds a single blocking connection to a Redis server. AUTH and SELECT are
//! issued once every time the connection is (re)established.

use super::{Transport, TransportError, TransportResult};
use ::redis::{
    Client, Connection, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError,
};
use tracing::{debug, info};

/// Connection parameters for [`RedisTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisTransportConfig {
    pub host: String,
    pub port: u16,
    /// Secret sent with AUTH right after connecting
    pub auth: Option<String>,
    /// Database selected after connecting, only when > 0
    pub database: i64,
}

impl Default for RedisTransportConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            auth: None,
            database: 0,
        }
    }
}

/// Blocking Redis connection used by the delivery sink
pub struct RedisTransport {
    config: RedisTransportConfig,
    client: Client,
    connection: Option<Connection>,
    stopped: bool,
}

impl RedisTransport {
    /// Connects to the configured server
    pub fn connect(config: RedisTransportConfig) -> TransportResult<Self> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo::default(),
        };
        let client = Client::open(info).map_err(|e| {
            TransportError::backend(format!(
                "invalid redis address {}:{}",
                config.host, config.port
            ))
            .with_source(e)
        })?;

        let mut transport = Self {
            config,
            client,
            connection: None,
            stopped: false,
        };
        transport.establish()?;
        Ok(transport)
    }

    /// True while a connection is held
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn establish(&mut self) -> TransportResult<()> {
        let mut connection = self.client.get_connection().map_err(classify)?;

        if let Some(secret) = self.config.auth.as_deref() {
            ::redis::cmd("AUTH")
                .arg(secret)
                .query::<()>(&mut connection)
                .map_err(classify)?;
        }
        if self.config.database > 0 {
            ::redis::cmd("SELECT")
                .arg(self.config.database)
                .query::<()>(&mut connection)
                .map_err(classify)?;
        }

        info!(
            "Connected to redis at {}:{} (db {})",
            self.config.host, self.config.port, self.config.database
        );
        self.connection = Some(connection);
        Ok(())
    }

    fn connection(&mut self) -> TransportResult<&mut Connection> {
        if self.stopped {
            return Err(TransportError::connection("transport has been stopped"));
        }
        self.connection
            .as_mut()
            .ok_or_else(|| TransportError::connection("not connected"))
    }
}

impl Transport for RedisTransport {
    fn enqueue(&mut self, key: &str, payload: &str) -> TransportResult<()> {
        let connection = self.connection()?;
        ::redis::cmd("LPUSH")
            .arg(key)
            .arg(payload)
            .query::<i64>(connection)
            .map(|_| ())
            .map_err(classify)
    }

    fn publish(&mut self, channel: &str, payload: &str) -> TransportResult<()> {
        let connection = self.connection()?;
        ::redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query::<i64>(connection)
            .map(|_| ())
            .map_err(classify)
    }

    fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            debug!("Dropped redis connection");
        }
    }

    fn reconnect(&mut self) -> TransportResult<()> {
        if self.stopped {
            return Err(TransportError::connection("transport has been stopped"));
        }
        self.disconnect();
        self.establish()
    }

    fn close(&mut self) {
        self.stopped = true;
        self.disconnect();
    }
}

/// Maps a redis client error onto the transport error kinds
pub(crate) fn classify(err: RedisError) -> TransportError {
    let connectivity = err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout();

    let message = err.to_string();
    if connectivity {
        TransportError::connection(message).with_source(err)
    } else {
        TransportError::backend(message).with_source(err)
    }
}
