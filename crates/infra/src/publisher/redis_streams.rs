//! Redis Streams message sink (durable, at-most-once per publish call).
//!
//! - **Destination**: a stream key (e.g. `inventory.updated`)
//! - **Declare**: `XGROUP CREATE <dest> <group> 0 MKSTREAM`, idempotent; makes the
//!   stream and a consumer group exist before the first message lands
//! - **Publish**: one `XADD` per message; delivery properties travel as fields
//!   next to the JSON payload
//! - **Connections**: one private connection per channel, dropped on close

use std::sync::Arc;
use std::time::Duration;

use redis::{Client, Connection, RedisResult};
use tracing::instrument;

use stockline_events::{OutboundMessage, SinkChannel, SinkConnector, SinkError};

/// Consumer group created alongside every declared stream.
const DEFAULT_CONSUMER_GROUP: &str = "inventory.consumers";

/// Upper bound for a single connection attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RedisStreamsConnector {
    client: Arc<Client>,
    consumer_group: String,
}

impl RedisStreamsConnector {
    /// Create a connector (no IO; the URL is only parsed).
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, SinkError> {
        let client = Client::open(redis_url.as_ref()).map_err(|e| SinkError::Connection(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
            consumer_group: DEFAULT_CONSUMER_GROUP.to_string(),
        })
    }
}

impl SinkConnector for RedisStreamsConnector {
    fn connect(&self) -> Result<Box<dyn SinkChannel>, SinkError> {
        let conn = self
            .client
            .get_connection_with_timeout(CONNECT_TIMEOUT)
            .map_err(|e| SinkError::Connection(e.to_string()))?;

        Ok(Box::new(RedisStreamsChannel {
            conn: Some(conn),
            consumer_group: self.consumer_group.clone(),
        }))
    }

    fn address(&self) -> String {
        // Host/port only; never the credentials part of the URL.
        format!("redis://{}", self.client.get_connection_info().addr)
    }
}

struct RedisStreamsChannel {
    conn: Option<Connection>,
    consumer_group: String,
}

impl RedisStreamsChannel {
    fn conn(&mut self) -> Result<&mut Connection, SinkError> {
        self.conn
            .as_mut()
            .ok_or_else(|| SinkError::Connection("channel already closed".to_string()))
    }
}

impl SinkChannel for RedisStreamsChannel {
    #[instrument(skip(self), err)]
    fn declare_destination(&mut self, destination: &str) -> Result<(), SinkError> {
        let group = self.consumer_group.clone();
        let conn = self.conn()?;

        let result: RedisResult<String> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(destination)
            .arg(&group)
            .arg("0")
            .arg("MKSTREAM")
            .query(conn);

        match result {
            Ok(_) => Ok(()),
            // Group (and therefore stream) already exists.
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(SinkError::Declare(format!("XGROUP CREATE failed: {e}"))),
        }
    }

    #[instrument(
        skip(self, message),
        fields(message_id = %message.message_id, correlation_id = %message.correlation_id),
        err
    )]
    fn publish(&mut self, destination: &str, message: &OutboundMessage) -> Result<(), SinkError> {
        let conn = self.conn()?;
        let delivery_mode = if message.persistent { "persistent" } else { "transient" };

        let _: String = redis::cmd("XADD")
            .arg(destination)
            .arg("*")
            .arg("message_id")
            .arg(message.message_id.to_string())
            .arg("correlation_id")
            .arg(&message.correlation_id)
            .arg("event_type")
            .arg(&message.event_type)
            .arg("content_type")
            .arg(message.content_type)
            .arg("delivery_mode")
            .arg(delivery_mode)
            .arg("occurred_at")
            .arg(message.occurred_at.to_rfc3339())
            .arg("payload")
            .arg(message.body.as_slice())
            .query(conn)
            .map_err(|e| SinkError::Publish(format!("XADD failed: {e}")))?;

        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        // Dropping the connection closes the socket.
        self.conn.take();
        Ok(())
    }
}
