//! RediSearch-backed store.
//!
//! Records are hashes `{text, vector}` under `<prefix><text>`; each model
//! kind has an HNSW index over its prefix. Every command is bounded by the
//! configured timeout.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use parking_lot::Mutex;
use redis::{Client, FromRedisValue, RedisError, Value};
use senvec_core::{Error, ModelKind, Result};
use tracing::info;

use crate::embedding::vector_to_bytes;
use crate::types::{SearchHit, SearchResults};
use crate::VectorStore;

pub struct RedisStore {
    /// `None` once the store has been shut down.
    conn: Mutex<Option<ConnectionManager>>,
    timeout: Duration,
}

impl RedisStore {
    /// Open a managed connection and verify it with PING.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        info!("Connecting to Redis vector store");

        let client = Client::open(url)
            .map_err(|e| Error::Config(format!("invalid redis url: {}", e)))?;

        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| Error::Timeout(timeout.as_millis() as u64))?
            .map_err(|e| Error::Store(format!("failed to connect to redis: {}", e)))?;

        let store = Self {
            conn: Mutex::new(Some(conn)),
            timeout,
        };
        store.ping().await?;
        info!("Redis connection established");
        Ok(store)
    }

    fn connection(&self) -> Result<ConnectionManager> {
        checkout(&self.conn.lock())
    }

    async fn run<T: FromRedisValue + Send>(&self, cmd: redis::Cmd) -> Result<T> {
        let mut conn = self.connection()?;
        match tokio::time::timeout(self.timeout, cmd.query_async(&mut conn)).await {
            Ok(reply) => reply.map_err(store_err),
            Err(_) => Err(Error::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}

/// Clone the live handle out of `slot`, failing after shutdown.
fn checkout<C: Clone>(slot: &Option<C>) -> Result<C> {
    slot.clone()
        .ok_or_else(|| Error::Store("redis connection has been shut down".to_string()))
}

fn store_err(e: RedisError) -> Error {
    Error::Store(e.to_string())
}

/// Whether a server error means the named index was never created.
/// RediSearch has reported this as both "Unknown Index name" and
/// "<idx>: no such index" across versions.
pub fn is_missing_index(err: &RedisError) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("no such index") || (msg.contains("unknown") && msg.contains("index name"))
}

/// FT.SEARCH for the `k` nearest neighbors of `query` in `kind`'s index.
pub fn knn_command(kind: ModelKind, query: &[f32], k: usize) -> redis::Cmd {
    let mut cmd = redis::cmd("FT.SEARCH");
    cmd.arg(kind.index_name())
        .arg(format!("*=>[KNN {} @vector $vec AS score]", k))
        .arg("PARAMS")
        .arg(2)
        .arg("vec")
        .arg(vector_to_bytes(query))
        .arg("SORTBY")
        .arg("score")
        .arg("RETURN")
        .arg(2)
        .arg("text")
        .arg("score")
        .arg("DIALECT")
        .arg(2);
    cmd
}

/// FT.CREATE for `kind`'s HNSW index over its key prefix.
pub fn create_index_command(kind: ModelKind) -> redis::Cmd {
    let mut cmd = redis::cmd("FT.CREATE");
    cmd.arg(kind.index_name())
        .arg("ON")
        .arg("HASH")
        .arg("PREFIX")
        .arg(1)
        .arg(kind.key_prefix())
        .arg("SCHEMA")
        .arg("text")
        .arg("TEXT")
        .arg("vector")
        .arg("VECTOR")
        .arg("HNSW")
        .arg(6)
        .arg("TYPE")
        .arg("FLOAT32")
        .arg("DIM")
        .arg(kind.dimension())
        .arg("DISTANCE_METRIC")
        .arg("COSINE");
    cmd
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

/// Decode an FT.SEARCH reply: `[total, key, [field, value, ...], key, ...]`.
pub fn parse_search_reply(value: Value) -> Result<SearchResults> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(Error::Codec(format!(
                "FT.SEARCH reply is not an array: {:?}",
                other
            )))
        }
    };

    let mut iter = items.into_iter();
    let total = match iter.next() {
        Some(Value::Int(n)) => n.max(0) as u64,
        Some(other) => {
            return Err(Error::Codec(format!(
                "FT.SEARCH total is not an integer: {:?}",
                other
            )))
        }
        None => return Ok(SearchResults::default()),
    };

    let mut documents = Vec::new();
    while let Some(key) = iter.next() {
        let id = value_to_string(&key)
            .ok_or_else(|| Error::Codec(format!("FT.SEARCH document id: {:?}", key)))?;

        let mut hit = SearchHit {
            id,
            text: String::new(),
            score: 0.0,
        };

        let fields = match iter.next() {
            Some(Value::Array(fields)) => fields,
            other => {
                return Err(Error::Codec(format!(
                    "FT.SEARCH fields for '{}' are not an array: {:?}",
                    hit.id, other
                )))
            }
        };
        for pair in fields.chunks(2) {
            let [name, val] = pair else { continue };
            match value_to_string(name).as_deref() {
                Some("text") => hit.text = value_to_string(val).unwrap_or_default(),
                Some("score") => {
                    hit.score = value_to_string(val)
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| Error::Codec(format!("FT.SEARCH score: {:?}", val)))?
                }
                _ => {}
            }
        }
        documents.push(hit);
    }

    Ok(SearchResults { total, documents })
}

#[async_trait]
impl VectorStore for RedisStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn put_embedding(&self, kind: ModelKind, text: &str, vector: &[f32]) -> Result<()> {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(kind.storage_key(text))
            .arg("text")
            .arg(text)
            .arg("vector")
            .arg(vector_to_bytes(vector));
        let _: i64 = self.run(cmd).await?;
        Ok(())
    }

    async fn knn(&self, kind: ModelKind, query: &[f32], k: usize) -> Result<SearchResults> {
        let mut conn = self.connection()?;
        let cmd = knn_command(kind, query, k);
        let reply: Value = match tokio::time::timeout(self.timeout, cmd.query_async(&mut conn)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) if is_missing_index(&e) => {
                return Err(Error::IndexNotFound(kind.index_name().to_string()))
            }
            Ok(Err(e)) => return Err(store_err(e)),
            Err(_) => return Err(Error::Timeout(self.timeout.as_millis() as u64)),
        };
        parse_search_reply(reply)
    }

    async fn ping(&self) -> Result<()> {
        let pong: String = self.run(redis::cmd("PING")).await?;
        if pong != "PONG" {
            return Err(Error::Store(format!("unexpected PING reply: {}", pong)));
        }
        Ok(())
    }

    async fn set_scratch(&self, key: &str, value: &str) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        let _: () = self.run(cmd).await?;
        Ok(())
    }

    async fn snapshot(&self) -> Result<Option<BTreeMap<String, Vec<f32>>>> {
        Ok(None)
    }

    async fn index_exists(&self, kind: ModelKind) -> Result<bool> {
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("FT.INFO");
        cmd.arg(kind.index_name());
        let reply: std::result::Result<Value, RedisError> =
            match tokio::time::timeout(self.timeout, cmd.query_async(&mut conn)).await {
                Ok(reply) => reply,
                Err(_) => return Err(Error::Timeout(self.timeout.as_millis() as u64)),
            };
        match reply {
            Ok(_) => Ok(true),
            Err(e) if is_missing_index(&e) => Ok(false),
            Err(e) => Err(store_err(e)),
        }
    }

    async fn ensure_index(&self, kind: ModelKind) -> Result<bool> {
        if self.index_exists(kind).await? {
            return Ok(false);
        }
        let _: () = self.run(create_index_command(kind)).await?;
        info!(index = kind.index_name(), dim = kind.dimension(), "Created search index");
        Ok(true)
    }

    async fn shutdown(&self) {
        // The socket closes once in-flight commands drop their clones.
        if self.conn.lock().take().is_some() {
            info!("Closed Redis vector store");
        }
    }
}
