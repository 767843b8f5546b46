//! Redis-backed store and bus implementations.
//!
//! Redis holds the live dashboard state and carries the mutation event
//! stream: records are hashes at `{prefix}:{category}:{identifier}`, the
//! per-category identifier index is a set, and events ride plain pub/sub
//! channels named after their category.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `{prefix}:{category}:{id}` | Hash | One record's fields |
//! | `{prefix}:{category}:~index` | Set | Identifiers present in a category |
//! | `{prefix}:{category}` | Hash | The identifier-less singleton record |
//! | `{category}` | Channel | Mutation events for a category |

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;
use fred::types::Message;
use tracing::{debug, info, warn};

use tapefeed_types::{FieldMap, FieldValue};

use crate::backend::StoreBackend;
use crate::bus::{BusMessage, EventBus, Subscription};
use crate::error::StoreError;

/// Options for the resilient connection sequence.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Maximum number of connection attempts before giving up.
    pub max_attempts: u32,
    /// Base delay unit; attempt `n` sleeps `n * base_delay` before retrying.
    pub base_delay: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Establish a Redis connection with bounded retry and linear backoff.
///
/// Each attempt builds a fresh client, initializes it, and issues a `PING`
/// liveness probe; a session that opens but cannot answer the probe counts
/// as a failed attempt. Attempts are logged with their ordinal. Exhausting
/// all attempts yields [`StoreError::ConnectionExhausted`], which is fatal
/// for the owning process.
///
/// # Errors
///
/// Returns [`StoreError::Config`] if the URL cannot be parsed, or
/// [`StoreError::ConnectionExhausted`] if every attempt fails.
pub async fn connect_with_retry(url: &str, opts: &ConnectOptions) -> Result<Client, StoreError> {
    let config =
        Config::from_url(url).map_err(|e| StoreError::Config(format!("invalid Redis URL: {e}")))?;

    let mut attempt: u32 = 1;
    loop {
        match probe(&config).await {
            Ok(client) => {
                info!(url, attempt, "connected to Redis");
                return Ok(client);
            }
            Err(e) => {
                warn!(url, attempt, max_attempts = opts.max_attempts, error = %e,
                    "Redis connection attempt failed");
            }
        }

        if attempt >= opts.max_attempts {
            return Err(StoreError::ConnectionExhausted {
                target: url.to_owned(),
                attempts: opts.max_attempts,
            });
        }

        tokio::time::sleep(opts.base_delay * attempt).await;
        attempt = attempt.saturating_add(1);
    }
}

/// One connection attempt: build, initialize, probe.
async fn probe(config: &Config) -> Result<Client, fred::error::Error> {
    let client = Builder::from_config(config.clone()).build()?;
    client.init().await?;
    client.ping::<()>(None).await?;
    Ok(client)
}

/// Convert a typed field mapping into the string pairs Redis hashes hold.
fn to_hash_fields(fields: &FieldMap) -> HashMap<String, String> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), value.to_field_string()))
        .collect()
}

/// Convert a Redis hash back into a field mapping. Every value comes back
/// textual; numeric access goes through [`FieldValue::as_f64`].
fn from_hash_fields(fields: HashMap<String, String>) -> FieldMap {
    fields
        .into_iter()
        .map(|(name, value)| (name, FieldValue::Text(value)))
        .collect()
}

/// Redis-backed [`StoreBackend`] over a single command connection.
#[derive(Clone, Debug)]
pub struct RedisBackend {
    client: Client,
}

impl RedisBackend {
    /// Connect to Redis at `url` using the resilient connection sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for an unparsable URL and
    /// [`StoreError::ConnectionExhausted`] when every attempt fails.
    pub async fn connect(url: &str, opts: &ConnectOptions) -> Result<Self, StoreError> {
        let client = connect_with_retry(url, opts).await?;
        Ok(Self { client })
    }

    /// Access the underlying command client (shared with [`RedisBus`]).
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl StoreBackend for RedisBackend {
    async fn ping(&self) -> Result<(), StoreError> {
        self.client.ping::<()>(None).await?;
        Ok(())
    }

    async fn hash_replace(&self, key: &str, fields: &FieldMap) -> Result<(), StoreError> {
        // HSET with zero field-value pairs is a protocol error, and Redis
        // has no empty-hash state anyway: replacing with no fields is a
        // plain delete.
        if fields.is_empty() {
            let _: u64 = self.client.del(key).await?;
            return Ok(());
        }
        // DEL + HSET inside MULTI/EXEC so the overwrite is atomic and a
        // concurrent reader never observes a half-written record.
        let trx = self.client.multi();
        let _: () = trx.del(key).await?;
        let _: () = trx.hset(key, to_hash_fields(fields)).await?;
        let _: Vec<Value> = trx.exec(true).await?;
        Ok(())
    }

    async fn hash_merge(&self, key: &str, fields: &FieldMap) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let _: () = self.client.hset(key, to_hash_fields(fields)).await?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Option<FieldMap>, StoreError> {
        let fields: HashMap<String, String> = self.client.hgetall(key).await?;
        if fields.is_empty() {
            // HGETALL returns an empty map for a missing key.
            return Ok(None);
        }
        Ok(Some(from_hash_fields(fields)))
    }

    async fn hash_increment(
        &self,
        key: &str,
        field: &str,
        amount: f64,
    ) -> Result<f64, StoreError> {
        let value: f64 = self.client.hincrbyfloat(key, field, amount).await?;
        Ok(value)
    }

    async fn delete_key(&self, key: &str) -> Result<bool, StoreError> {
        let removed: u64 = self.client.del(key).await?;
        Ok(removed > 0)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let _: u64 = self.client.sadd(key, member).await?;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let _: u64 = self.client.srem(key, member).await?;
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let members: Vec<String> = self.client.smembers(key).await?;
        Ok(members)
    }
}

/// Redis pub/sub [`EventBus`].
///
/// Publishing rides the shared command client; each subscription opens its
/// own connection (Redis puts subscriber connections into a restricted
/// mode), established through the same resilient sequence.
#[derive(Clone)]
pub struct RedisBus {
    publisher: Client,
    url: String,
    opts: ConnectOptions,
}

impl RedisBus {
    /// Build a bus that publishes on `publisher` and opens subscriber
    /// connections against `url`.
    pub fn new(publisher: Client, url: impl Into<String>, opts: ConnectOptions) -> Self {
        Self {
            publisher,
            url: url.into(),
            opts,
        }
    }
}

#[async_trait]
impl EventBus for RedisBus {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), StoreError> {
        let _: u64 = self.publisher.publish(topic, payload.to_vec()).await?;
        debug!(topic, "published message");
        Ok(())
    }

    async fn subscribe(&self, topics: &[&str]) -> Result<Box<dyn Subscription>, StoreError> {
        let client = connect_with_retry(&self.url, &self.opts).await?;
        let rx = client.message_rx();
        let owned: Vec<String> = topics.iter().map(|t| (*t).to_owned()).collect();
        client.subscribe(owned.clone()).await?;
        info!(?owned, "subscribed to Redis channels");
        Ok(Box::new(RedisSubscription {
            client,
            rx,
            topics: owned,
        }))
    }
}

/// Subscription handle over a dedicated Redis subscriber connection.
struct RedisSubscription {
    client: Client,
    rx: tokio::sync::broadcast::Receiver<Message>,
    topics: Vec<String>,
}

#[async_trait]
impl Subscription for RedisSubscription {
    fn poll(&mut self) -> Option<BusMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    let topic = message.channel.to_string();
                    if !self.topics.iter().any(|t| *t == topic) {
                        continue;
                    }
                    let Some(payload) = message.value.as_bytes().map(<[u8]>::to_vec) else {
                        warn!(topic, "dropping pub/sub message with non-byte payload");
                        continue;
                    };
                    return Some(BusMessage { topic, payload });
                }
                Err(tokio::sync::broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "pub/sub receiver lagged, skipping ahead");
                }
                Err(
                    tokio::sync::broadcast::error::TryRecvError::Empty
                    | tokio::sync::broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }

    async fn unsubscribe(&mut self) -> Result<(), StoreError> {
        self.client.unsubscribe(self.topics.clone()).await?;
        self.client.quit().await?;
        Ok(())
    }
}
