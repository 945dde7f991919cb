//! Core recorder data types.
//!
//! This module contains the values the recorder manipulates:
//! - `Event`: a captured `(action, data)` pair
//! - `EventLog`: the ordered, shared buffer of events
//! - `Subscription`: the present/absent recording handle
//!
//! Nothing here talks to a bus; the types are usable on their own.

mod event;
mod log;
mod subscription;

pub use event::Event;
pub use log::EventLog;
pub use subscription::{Subscription, SubscriptionId};
