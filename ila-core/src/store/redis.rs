//! Reference store driver: a minimal RESP-like, line-oriented text
//! protocol over TCP (SET/GET/DEL/SCAN/PSUBSCRIBE), keys and values
//! hex-encoded to stay binary-safe within line framing.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

use super::codec::WireCodec;
use super::{Store, StoreOptions, Watch};
use crate::error::{IlaError, IlaResult};

/// Connect timeout for the reference driver's point-operation connection.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(1500);

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn from_hex(s: &str) -> IlaResult<Vec<u8>> {
    if s.len() % 2 != 0 {
        return Err(IlaError::StoreProtocol("odd-length hex reply".into()));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| IlaError::StoreProtocol("non-hex byte in reply".into()))
        })
        .collect()
}

struct Conn {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl Conn {
    async fn connect(host: &str, port: u16) -> IlaResult<Self> {
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)))
            .await
            .map_err(|_| IlaError::StoreTransport("connect timed out".into()))??;
        let (r, w) = stream.into_split();
        Ok(Conn { reader: BufReader::new(r), writer: w })
    }

    async fn send_line(&mut self, line: &str) -> IlaResult<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> IlaResult<String> {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf).await?;
        if n == 0 {
            return Err(IlaError::StoreTransport("connection closed".into()));
        }
        Ok(buf.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// A reference-driver store for a `(Key, Value)` pair, each backed by the
/// [`WireCodec`] binary encoding.
pub struct RedisStore<K, V> {
    host: String,
    port: u16,
    conn: Option<Arc<Mutex<Conn>>>,
    _marker: PhantomData<(K, V)>,
}

impl<K, V> RedisStore<K, V> {
    pub fn new() -> Self {
        RedisStore {
            host: "::1".to_string(),
            port: 0,
            conn: None,
            _marker: PhantomData,
        }
    }
}

impl<K, V> Default for RedisStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Store for RedisStore<K, V>
where
    K: WireCodec + Send + Sync + Clone + 'static,
    V: WireCodec + Send + Sync + Clone + 'static,
{
    type Key = K;
    type Value = V;

    async fn configure(&mut self, options: StoreOptions) -> IlaResult<()> {
        self.host = options.host;
        self.port = options.port;
        Ok(())
    }

    async fn start(&mut self) -> IlaResult<()> {
        let conn = Conn::connect(&self.host, self.port).await?;
        self.conn = Some(Arc::new(Mutex::new(conn)));
        Ok(())
    }

    async fn stop(&mut self) -> IlaResult<()> {
        self.conn = None;
        Ok(())
    }

    async fn read(&self, key: &Self::Key) -> IlaResult<Option<Self::Value>> {
        let conn = self.conn.as_ref().ok_or_else(|| IlaError::StoreTransport("not started".into()))?;
        let mut guard = conn.lock().await;
        guard.send_line(&format!("GET {}", to_hex(&key.encode()))).await?;
        let header = guard.read_line().await?;
        if header == "$-1" {
            return Ok(None);
        }
        let n: usize = header
            .strip_prefix('$')
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| IlaError::StoreProtocol(format!("malformed GET reply header {header:?}")))?;
        let body = guard.read_line().await?;
        if body.len() != n {
            return Err(IlaError::StoreProtocol("GET reply length mismatch".into()));
        }
        let bytes = from_hex(&body)?;
        Ok(Some(V::decode(&bytes)?))
    }

    async fn write(&self, key: &Self::Key, value: &Self::Value) -> IlaResult<()> {
        let conn = self.conn.as_ref().ok_or_else(|| IlaError::StoreTransport("not started".into()))?;
        let mut guard = conn.lock().await;
        guard
            .send_line(&format!("SET {} {}", to_hex(&key.encode()), to_hex(&value.encode())))
            .await?;
        let reply = guard.read_line().await?;
        if reply != "+OK" {
            return Err(IlaError::StoreProtocol(format!("unexpected SET reply {reply:?}")));
        }
        Ok(())
    }

    async fn delete(&self, key: &Self::Key) -> IlaResult<bool> {
        let conn = self.conn.as_ref().ok_or_else(|| IlaError::StoreTransport("not started".into()))?;
        let mut guard = conn.lock().await;
        guard.send_line(&format!("DEL {}", to_hex(&key.encode()))).await?;
        let reply = guard.read_line().await?;
        match reply.strip_prefix(':').and_then(|s| s.parse::<i64>().ok()) {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(IlaError::StoreProtocol(format!("unexpected DEL reply {reply:?}"))),
        }
    }

    async fn scan(&self) -> IlaResult<Vec<Self::Key>> {
        let conn = self.conn.as_ref().ok_or_else(|| IlaError::StoreTransport("not started".into()))?;
        let mut guard = conn.lock().await;
        let mut cursor = "0".to_string();
        let mut keys = Vec::new();
        loop {
            guard.send_line(&format!("SCAN {cursor}")).await?;
            let _array_header = guard.read_line().await?; // *2
            let _cursor_bulk_header = guard.read_line().await?; // $n
            cursor = guard.read_line().await?;
            let count_header = guard.read_line().await?; // *m
            let m: usize = count_header
                .strip_prefix('*')
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| IlaError::StoreProtocol("malformed SCAN count".into()))?;
            for _ in 0..m {
                let _bulk_header = guard.read_line().await?;
                let bulk = guard.read_line().await?;
                keys.push(K::decode(&from_hex(&bulk)?)?);
            }
            if cursor == "0" {
                break;
            }
        }
        Ok(keys)
    }

    async fn watch_all(&self) -> IlaResult<Watch<Self::Key>> {
        let mut conn = Conn::connect(&self.host, self.port).await?;
        conn.send_line("PSUBSCRIBE __key*__:*").await?;
        let _ack = conn.read_line().await?;

        let (tx, rx) = mpsc::channel(256);
        let task = tokio::spawn(async move {
            loop {
                let array_header = match conn.read_line().await {
                    Ok(l) => l,
                    Err(_) => break,
                };
                if !array_header.starts_with('*') {
                    continue;
                }
                let n: usize = array_header[1..].parse().unwrap_or(0);
                let mut fields = Vec::with_capacity(n);
                for _ in 0..n {
                    let _hdr = match conn.read_line().await {
                        Ok(l) => l,
                        Err(_) => return,
                    };
                    match conn.read_line().await {
                        Ok(l) => fields.push(l),
                        Err(_) => return,
                    }
                }
                if fields.len() < 4 || fields[0] != "pmessage" {
                    continue;
                }
                let key_hex = &fields[3];
                let Ok(bytes) = from_hex(key_hex) else { continue };
                let Ok(key) = K::decode(&bytes) else { continue };
                if tx.send(key).await.is_err() {
                    break;
                }
            }
        });

        Ok(Watch::new(rx, task.abort_handle()))
    }

    async fn watch_one(&self, key: Self::Key) -> IlaResult<Watch<()>> {
        let mut conn = Conn::connect(&self.host, self.port).await?;
        conn.send_line(&format!("SUBSCRIBE {}", to_hex(&key.encode()))).await?;
        let _ack = conn.read_line().await?;

        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(async move {
            loop {
                match conn.read_line().await {
                    Ok(_) => {
                        if tx.send(()).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Watch::new(rx, task.abort_handle()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trips() {
        let bytes = vec![0x00, 0xff, 0x10, 0xab];
        assert_eq!(from_hex(&to_hex(&bytes)).unwrap(), bytes);
    }
}
