//! # casefeed-router
//!
//! Classifies decoded events by their `type` tag into four domain
//! categories (case, workflow, notification, alert) and republishes them to
//! filtered subscriptions.

pub mod category;
pub mod filter;
pub mod router;
pub mod subscription;

pub use category::EventCategory;
pub use filter::EventFilter;
pub use router::EventRouter;
pub use subscription::{EventSubscription, RoutedEvent};
