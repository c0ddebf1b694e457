//! Hub 连接 - 传输层、生命周期与状态指示

pub mod controller;
pub mod hub_protocol;
pub mod replay;
pub mod retry;
pub mod status;
pub mod transport;
pub mod websocket;

pub use controller::{ConnectionLifecycleController, LifecycleEvent};
pub use replay::{ReplaySource, ReplayTransport};
pub use retry::RetryPolicy;
pub use status::ConnectionStatusIndicator;
pub use transport::{HubTransport, TransportEvent};
pub use websocket::{WebSocketConfig, WebSocketHubTransport};
