//! Shared fixtures for the integration scenarios.

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use node_runtime::{FleetlineNode, NodeConfig, SeedTrip};
use serde_json::json;
use shared_types::{SubjectId, TripId};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const ISSUER: &str = "fleetline-auth";
pub const AUDIENCE: &str = "fleetline";
pub const SIGNING_KEY: &str = "integration-signing-key";

/// How long any single wait may take before the test fails.
pub const WAIT: Duration = Duration::from_secs(5);

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A node serving on an ephemeral port. Aborted on drop.
pub struct TestNode {
    pub addr: SocketAddr,
    pub node: Arc<FleetlineNode>,
    _shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Drop for TestNode {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestNode {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(configure: impl FnOnce(&mut NodeConfig)) -> Self {
        let mut config = NodeConfig::default();
        config.gateway.token.issuer = ISSUER.into();
        config.gateway.token.audience = AUDIENCE.into();
        config.gateway.token.signing_key = SIGNING_KEY.into();
        config.seed_trips = ["T1", "T2"]
            .iter()
            .map(|id| SeedTrip {
                trip_id: TripId::new(*id).unwrap(),
                status_id: None,
            })
            .collect();
        configure(&mut config);

        let node = Arc::new(FleetlineNode::build(config).await.unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let serving = Arc::clone(&node);
        let handle = tokio::spawn(async move {
            let _ = serving
                .serve(listener, async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            node,
            _shutdown: shutdown_tx,
            handle,
        }
    }

    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn ws_url(&self, query: &str) -> String {
        format!("ws://{}/ws?{}", self.addr, query)
    }

    /// Producer connection for `user_id` with a freshly minted token.
    pub async fn producer(&self, user_id: &str) -> Socket {
        self.connect(&format!(
            "userId={user_id}&action=send&token={}",
            mint_token(user_id)
        ))
        .await
    }

    /// Subscriber connection for `user_id`, returned once it is registered.
    pub async fn subscriber(&self, user_id: &str) -> Socket {
        let before = self.subscriber_count(user_id);
        let socket = self.connect(&format!("userId={user_id}&action=subscribe")).await;
        self.wait_until(|| self.subscriber_count(user_id) > before).await;
        socket
    }

    pub async fn connect(&self, query: &str) -> Socket {
        let (socket, _) = connect_async(self.ws_url(query)).await.unwrap();
        socket
    }

    pub fn subscriber_count(&self, user_id: &str) -> usize {
        self.node
            .gateway()
            .broadcaster()
            .registry()
            .subscriber_count(&SubjectId::new(user_id).unwrap())
    }

    pub fn has_producer(&self, user_id: &str) -> bool {
        self.node
            .gateway()
            .broadcaster()
            .registry()
            .producer_of(&SubjectId::new(user_id).unwrap())
            .is_some()
    }

    /// Poll `condition` until it holds or [`WAIT`] elapses.
    pub async fn wait_until(&self, condition: impl Fn() -> bool) {
        timeout(WAIT, async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }
}

pub fn mint_token(subject: &str) -> String {
    encode(
        &Header::default(),
        &json!({
            "sub": subject,
            "iss": ISSUER,
            "aud": AUDIENCE,
            "exp": Utc::now().timestamp() + 3600,
        }),
        &EncodingKey::from_secret(SIGNING_KEY.as_bytes()),
    )
    .unwrap()
}

pub async fn send_text(socket: &mut Socket, text: &str) {
    socket.send(Message::text(text.to_string())).await.unwrap();
}

/// Next text frame, skipping control frames.
pub async fn next_text(socket: &mut Socket) -> String {
    timeout(WAIT, async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return text.as_str().to_string(),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    })
    .await
    .expect("no text frame in time")
}

/// Close code and reason of the server's close frame.
pub async fn expect_close(socket: &mut Socket) -> (u16, String) {
    timeout(WAIT, async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Close(Some(frame)))) => {
                    return (u16::from(frame.code), frame.reason.as_str().to_string())
                }
                Some(Ok(Message::Close(None))) | None => panic!("closed without a close frame"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("socket error before close frame: {e}"),
            }
        }
    })
    .await
    .expect("no close frame in time")
}

/// Keep reading for `window` and count server pings. Reading lets the client
/// answer each ping with a pong. Panics if the socket closes meanwhile.
pub async fn count_pings(socket: &mut Socket, window: Duration) -> usize {
    let mut pings = 0;
    let _ = timeout(window, async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Ping(_))) => pings += 1,
                Some(Ok(Message::Pong(_))) => continue,
                other => panic!("expected only pings, got {other:?}"),
            }
        }
    })
    .await;
    pings
}

/// True if nothing but control frames arrives within `window`.
pub async fn stays_quiet(socket: &mut Socket, window: Duration) -> bool {
    timeout(window, async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                _ => return,
            }
        }
    })
    .await
    .is_err()
}
