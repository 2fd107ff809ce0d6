//! Mosaic event bus.
//!
//! Widgets talk to each other by publishing named events and subscribing to
//! dot-segmented patterns:
//!
//! ```text
//! subscribe("order.*")            publish("order.created", {"id": 5}, "orders-table")
//!        │                                  │
//!        └──────────── matches ◄────────────┘   (equal segment count, `*` = one segment)
//! ```
//!
//! The bus is an explicitly constructed value; clones share the same
//! subscribers, safe-mode flag and event log, so one bus can be handed to
//! every widget of a dashboard while tests build as many isolated buses as
//! they like.
//!
//! # Usage
//!
//! ```
//! use mosaic_bus::{BusConfig, EventBus};
//! use serde_json::json;
//!
//! let bus = EventBus::new(BusConfig::default());
//! let sub = bus.subscribe("order.*", |event| {
//!   assert_eq!(event.payload["id"], 5);
//!   Ok(())
//! });
//!
//! assert_eq!(bus.publish("order.created", json!({ "id": 5 }), "orders"), 1);
//! assert_eq!(bus.publish("invoice.created", json!({}), "billing"), 0);
//!
//! sub.unsubscribe();
//! assert_eq!(bus.event_log().len(), 2);
//! ```

mod bus;
mod config;
mod event;
mod log;
mod pattern;

pub use bus::{EventBus, Handler, HandlerError, Subscription, SubscriptionId};
pub use config::BusConfig;
pub use event::{DeliveryOutcome, Event, EventLogEntry};
pub use log::EventLog;
pub use pattern::Pattern;
