use super::types::{ChannelMessage, WireCandle, ping_message, subscribe_message, unsubscribe_message};
use crate::domain::market::{Candle, CandleInterval};
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Hyperliquid closes idle connections after 60s without a message.
const PING_INTERVAL: Duration = Duration::from_secs(50);
const CHANNEL_CAPACITY: usize = 256;

type SubscriptionKey = (String, CandleInterval);
type Subscribers = Arc<RwLock<HashMap<SubscriptionKey, mpsc::Sender<Candle>>>>;

struct Connection {
    outgoing: mpsc::Sender<Message>,
    reader: JoinHandle<()>,
}

impl Connection {
    fn is_alive(&self) -> bool {
        !self.reader.is_finished() && !self.outgoing.is_closed()
    }
}

/// One shared websocket carrying every candle subscription.
///
/// The connection is opened lazily by the first `subscribe`. When it drops,
/// every subscriber channel is closed so consumers can re-seed and subscribe
/// again, which opens a fresh connection.
pub struct HyperliquidWebSocketManager {
    ws_url: String,
    subscribers: Subscribers,
    connection: Mutex<Option<Connection>>,
}

impl HyperliquidWebSocketManager {
    pub fn new(ws_url: String) -> Self {
        Self {
            ws_url,
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            connection: Mutex::new(None),
        }
    }

    pub async fn subscribe(
        &self,
        coin: &str,
        interval: CandleInterval,
    ) -> Result<mpsc::Receiver<Candle>> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.subscribers
            .write()
            .await
            .insert((coin.to_string(), interval), tx);

        let outgoing = self.ensure_connected().await?;
        outgoing
            .send(Message::Text(subscribe_message(coin, interval).to_string().into()))
            .await
            .context("Hyperliquid WebSocket writer is gone")?;

        info!("HyperliquidWebSocketManager: subscribed {} {}", coin, interval);
        Ok(rx)
    }

    pub async fn unsubscribe(&self, coin: &str, interval: CandleInterval) -> Result<()> {
        self.subscribers
            .write()
            .await
            .remove(&(coin.to_string(), interval));

        let outgoing = match self.connection.lock().await.as_ref() {
            Some(connection) if connection.is_alive() => connection.outgoing.clone(),
            _ => return Ok(()),
        };
        outgoing
            .send(Message::Text(unsubscribe_message(coin, interval).to_string().into()))
            .await
            .context("Hyperliquid WebSocket writer is gone")?;

        info!("HyperliquidWebSocketManager: unsubscribed {} {}", coin, interval);
        Ok(())
    }

    async fn ensure_connected(&self) -> Result<mpsc::Sender<Message>> {
        let mut guard = self.connection.lock().await;
        if let Some(connection) = guard.as_ref().filter(|c| c.is_alive()) {
            return Ok(connection.outgoing.clone());
        }

        info!("HyperliquidWebSocketManager: connecting to {}", self.ws_url);
        let (ws_stream, _) = connect_async(self.ws_url.as_str())
            .await
            .context("Failed to connect to Hyperliquid WebSocket")?;
        let (mut write, mut read) = ws_stream.split();

        let (ws_tx, mut ws_rx) = mpsc::channel::<Message>(100);

        let writer = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                if write.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let tx_ping = ws_tx.clone();
        let pinger = tokio::spawn(async move {
            let mut ping_interval = tokio::time::interval(PING_INTERVAL);
            ping_interval.tick().await;
            loop {
                ping_interval.tick().await;
                let ping = Message::Text(ping_message().to_string().into());
                if tx_ping.send(ping).await.is_err() {
                    break;
                }
            }
        });

        let subscribers = self.subscribers.clone();
        let tx_pong = ws_tx.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if let Err(e) = Self::handle_message(&text, &subscribers).await {
                            warn!("Failed to handle Hyperliquid message: {}", e);
                        }
                    }
                    Ok(Message::Ping(payload)) => {
                        let _ = tx_pong.send(Message::Pong(payload)).await;
                    }
                    Ok(Message::Close(frame)) => {
                        match frame {
                            Some(cf) => info!(
                                "Hyperliquid WebSocket closed by server: Code {} Reason '{}'",
                                cf.code, cf.reason
                            ),
                            None => info!("Hyperliquid WebSocket closed by server (No info)"),
                        }
                        break;
                    }
                    Err(e) => {
                        error!("Hyperliquid WebSocket read error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            pinger.abort();
            writer.abort();
            let dropped = {
                let mut subscribers = subscribers.write().await;
                let count = subscribers.len();
                subscribers.clear();
                count
            };
            warn!(
                "HyperliquidWebSocketManager: connection lost, closed {} subscriptions",
                dropped
            );
        });

        *guard = Some(Connection {
            outgoing: ws_tx.clone(),
            reader,
        });
        Ok(ws_tx)
    }

    async fn handle_message(text: &str, subscribers: &Subscribers) -> Result<()> {
        let msg: ChannelMessage = serde_json::from_str(text)?;
        match msg.channel.as_str() {
            "candle" => {}
            "pong" | "subscriptionResponse" => {
                debug!("HyperliquidWebSocketManager: {}", msg.channel);
                return Ok(());
            }
            "error" => {
                warn!("Hyperliquid WebSocket error push: {}", msg.data);
                return Ok(());
            }
            other => {
                debug!("HyperliquidWebSocketManager: ignoring channel {}", other);
                return Ok(());
            }
        }

        let wire: WireCandle = serde_json::from_value(msg.data)?;
        let (Some(coin), Some(interval)) = (wire.coin.clone(), wire.interval.as_deref()) else {
            anyhow::bail!("candle push without coin or interval");
        };
        let key = (coin, interval.parse::<CandleInterval>()?);

        let sender = subscribers.read().await.get(&key).cloned();
        let Some(sender) = sender else {
            debug!("HyperliquidWebSocketManager: no subscriber for {:?}", key);
            return Ok(());
        };

        if sender.send(Candle::from(wire)).await.is_err() {
            subscribers.write().await.remove(&key);
        }
        Ok(())
    }
}
