pub mod broadcast;
pub mod buffer;
pub mod config;
pub mod pager;
pub mod record;
pub mod server;
pub mod session;
pub mod store;

pub use broadcast::{BroadcastLayer, Broadcaster, SessionHandle, Subscription};
pub use buffer::RingBuffer;
pub use config::{ConfigError, LogStreamConfig};
pub use pager::{PageResult, Paginator};
pub use record::{LogLevel, LogRecord};
pub use server::{LogStreamServer, QueryService};
pub use session::{SessionGateway, SessionState, KEEP_ALIVE_TOKEN};
pub use store::{human_size, RotationStore, SegmentMeta, StoreError};
