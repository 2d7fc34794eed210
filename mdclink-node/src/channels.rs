//! Inter-task communication channels
//!
//! Static embassy-sync primitives shared between the link task and the
//! rest of the application.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::pubsub::PubSubChannel;

use mdclink_core::{Control, Notification};

/// Channel capacity for control calls
const CONTROL_CHANNEL_SIZE: usize = 8;

/// Notifications buffered per subscriber
const NOTIFICATION_CAPACITY: usize = 16;

/// Maximum notification subscribers
const NOTIFICATION_SUBSCRIBERS: usize = 4;

/// Control calls for the display (power, input, polls, heartbeat)
pub static CONTROL: Channel<CriticalSectionRawMutex, Control, CONTROL_CHANNEL_SIZE> =
    Channel::new();

/// State changes published by the link task
///
/// Published with `publish_immediate`, so a slow subscriber loses the
/// oldest notifications rather than stalling the link.
pub static NOTIFICATIONS: PubSubChannel<
    CriticalSectionRawMutex,
    Notification,
    NOTIFICATION_CAPACITY,
    NOTIFICATION_SUBSCRIBERS,
    1,
> = PubSubChannel::new();
