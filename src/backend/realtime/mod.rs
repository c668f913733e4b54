//! Real-time Collaboration Module
//!
//! Live updates for the task/project workspace: who is connected, who is
//! watching which project or task, who is online, who is typing, and the
//! fan-out of domain events to the right connections.
//!
//! # Architecture
//!
//! - **`hub`** - `RealtimeHub`, the service object that owns every registry
//! - **`registry`** - connection → user ownership and outbound queues
//! - **`subscription`** - project/task subscriber index
//! - **`presence`** - per-project online/offline records
//! - **`typing`** - ephemeral typing indicators
//! - **`broadcast`** - the dispatcher (unicast, per-user and scoped broadcast)
//! - **`notify`** - fire-and-forget domain event fan-out
//! - **`handlers`** - inbound message table
//! - **`session`** - WebSocket upgrade and per-connection loop
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs          - Module exports and documentation
//! ├── hub.rs          - RealtimeHub and HubState
//! ├── registry.rs     - Connection registry
//! ├── subscription.rs - Subscription index
//! ├── presence.rs     - Presence store
//! ├── typing.rs       - Typing tracker
//! ├── broadcast.rs    - Dispatcher
//! ├── notify.rs       - Notification trigger layer
//! ├── handlers.rs     - Inbound handlers
//! └── session.rs      - WebSocket session loop
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskcollab::backend::auth::identity::StaticIdentityResolver;
//! use taskcollab::backend::directory::InMemoryDirectory;
//! use taskcollab::backend::realtime::{NotificationTrigger, RealtimeHub};
//!
//! # async fn example() {
//! let hub = Arc::new(RealtimeHub::new(
//!     Arc::new(StaticIdentityResolver::new().with_token("dev", 1)),
//!     Arc::new(InMemoryDirectory::allow_all()),
//!     256,
//! ));
//! let (notifications, _worker) = NotificationTrigger::spawn(hub.clone(), 1024);
//! notifications.task_deleted(1, 10, 42);
//! # }
//! ```

pub mod broadcast;
pub mod handlers;
pub mod hub;
pub mod notify;
pub mod presence;
pub mod registry;
pub mod session;
pub mod subscription;
pub mod typing;

pub use hub::{HubStats, RealtimeHub, AUTH_FAILURE_CLOSE_CODE, NORMAL_CLOSE_CODE};
pub use notify::{fan_out, NotificationTrigger};
pub use registry::{Outbound, OutboundReceiver, OutboundSender};
pub use session::ws_handler;
