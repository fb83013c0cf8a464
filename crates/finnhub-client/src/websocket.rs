use futures_util::{SinkExt, StreamExt};
use signal_core::PriceTick;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};

const FINNHUB_WS_URL: &str = "wss://ws.finnhub.io";

#[derive(Debug)]
enum WsCommand {
    Subscribe(String),
    Unsubscribe(String),
}

/// Streaming trade feed. Ticks fan out over a broadcast channel; symbol
/// subscription changes are accepted while connected and replayed on
/// reconnect.
pub struct FinnhubWebSocket {
    token: String,
    tx: broadcast::Sender<PriceTick>,
    subscriptions: Arc<Mutex<HashSet<String>>>,
    command_tx: mpsc::Sender<WsCommand>,
    command_rx: Mutex<mpsc::Receiver<WsCommand>>,
    shutdown: Arc<tokio::sync::Notify>,
}

impl FinnhubWebSocket {
    pub fn new(token: String) -> (Self, broadcast::Receiver<PriceTick>) {
        let (tx, rx) = broadcast::channel(1024);
        let (command_tx, command_rx) = mpsc::channel(256);
        let ws = Self {
            token,
            tx,
            subscriptions: Arc::new(Mutex::new(HashSet::new())),
            command_tx,
            command_rx: Mutex::new(command_rx),
            shutdown: Arc::new(tokio::sync::Notify::new()),
        };
        (ws, rx)
    }

    pub fn sender(&self) -> broadcast::Sender<PriceTick> {
        self.tx.clone()
    }

    /// Track a symbol. Takes effect immediately when connected and is
    /// replayed after every reconnect.
    pub async fn subscribe(&self, ticker: &str) {
        if ticker.is_empty() {
            return;
        }
        self.subscriptions.lock().await.insert(ticker.to_string());
        let _ = self
            .command_tx
            .send(WsCommand::Subscribe(ticker.to_string()))
            .await;
    }

    pub async fn unsubscribe(&self, ticker: &str) {
        self.subscriptions.lock().await.remove(ticker);
        let _ = self
            .command_tx
            .send(WsCommand::Unsubscribe(ticker.to_string()))
            .await;
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Connect and stream until shutdown, reconnecting on errors
    pub async fn run(&self) {
        loop {
            match self.connect_and_stream().await {
                Ok(()) => {
                    tracing::info!("Finnhub WS disconnected gracefully");
                    break;
                }
                Err(e) => {
                    tracing::warn!("Finnhub WS error: {}, reconnecting in 5s", e);
                    tokio::select! {
                        _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {},
                        _ = self.shutdown.notified() => {
                            tracing::info!("Finnhub WS shutdown requested");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn connect_and_stream(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{}?token={}", FINNHUB_WS_URL, self.token);
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();
        tracing::info!("Connected to Finnhub WebSocket");

        // Replay the subscription set
        let subs = self.subscriptions.lock().await.clone();
        for ticker in &subs {
            write
                .send(Message::Text(subscribe_message(ticker, true)))
                .await?;
        }
        if !subs.is_empty() {
            tracing::info!("Subscribed to {} symbols", subs.len());
        }

        let mut commands = self.command_rx.lock().await;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            for tick in parse_trades(&text) {
                                let _ = self.tx.send(tick);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!("Finnhub WS connection closed");
                            return Ok(());
                        }
                        Some(Err(e)) => {
                            return Err(Box::new(e));
                        }
                        _ => {}
                    }
                }
                Some(command) = commands.recv() => {
                    let message = match command {
                        WsCommand::Subscribe(ticker) => subscribe_message(&ticker, true),
                        WsCommand::Unsubscribe(ticker) => subscribe_message(&ticker, false),
                    };
                    write.send(Message::Text(message)).await?;
                }
                _ = self.shutdown.notified() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }
}

fn subscribe_message(ticker: &str, subscribe: bool) -> String {
    let action = if subscribe { "subscribe" } else { "unsubscribe" };
    serde_json::json!({ "type": action, "symbol": ticker }).to_string()
}

/// Extract trade prints from a raw frame. Finnhub batches trades as
/// `{"type":"trade","data":[{"s":sym,"p":price,"t":ms,...}]}`; anything
/// else (pings, status) yields no ticks.
fn parse_trades(text: &str) -> Vec<PriceTick> {
    let Ok(message) = serde_json::from_str::<serde_json::Value>(text) else {
        return Vec::new();
    };

    if message.get("type").and_then(|t| t.as_str()) != Some("trade") {
        return Vec::new();
    }

    message
        .get("data")
        .and_then(|d| d.as_array())
        .map(|trades| {
            trades
                .iter()
                .filter_map(|trade| {
                    Some(PriceTick {
                        ticker: trade.get("s")?.as_str()?.to_string(),
                        price: trade.get("p")?.as_f64()?,
                        timestamp: trade.get("t").and_then(|t| t.as_i64()).unwrap_or(0),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trade_batch() {
        let frame = r#"{"type":"trade","data":[
            {"s":"NVDA","p":156.32,"t":1730000000000,"v":100},
            {"s":"AMD","p":177.08,"t":1730000000500,"v":50}
        ]}"#;

        let ticks = parse_trades(frame);
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].ticker, "NVDA");
        assert_eq!(ticks[0].price, 156.32);
        assert_eq!(ticks[1].timestamp, 1730000000500);
    }

    #[test]
    fn test_parse_ignores_non_trade_frames() {
        assert!(parse_trades(r#"{"type":"ping"}"#).is_empty());
        assert!(parse_trades("not json").is_empty());
        assert!(parse_trades(r#"{"type":"trade"}"#).is_empty());
    }

    #[test]
    fn test_parse_skips_incomplete_trades() {
        let frame = r#"{"type":"trade","data":[{"s":"NVDA"},{"s":"AMD","p":1.0}]}"#;
        let ticks = parse_trades(frame);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].ticker, "AMD");
    }

    #[test]
    fn test_subscribe_message_format() {
        let msg = subscribe_message("NVDA", true);
        let parsed: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(parsed["type"], "subscribe");
        assert_eq!(parsed["symbol"], "NVDA");
    }
}
