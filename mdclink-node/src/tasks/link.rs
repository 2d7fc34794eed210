//! Display link task
//!
//! Owns the TCP socket and the [`Display`] controller. One loop waits on
//! three sources at once:
//!
//! - bytes from the socket (bounded by the idle timeout)
//! - the periodic tick that drives every timer in the controller
//! - control calls from [`CONTROL`]
//!
//! After each event the outbox is flushed to the socket and pending
//! notifications are logged or published.

use defmt::*;
use embassy_futures::select::{select3, Either3};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, Ipv4Address, Stack};
use embassy_time::{with_deadline, Duration, Instant, Ticker, Timer};
use embedded_io_async::Write;

use mdclink_core::display::Tracked;
use mdclink_core::traits::Transport;
use mdclink_core::{Control, Display, Notification};

use crate::channels::{CONTROL, NOTIFICATIONS};
use crate::config::NodeConfig;
use crate::outbox::Outbox;

/// Tick interval in milliseconds
pub const TICK_INTERVAL_MS: u64 = 250;

/// Socket buffer sizes
const RX_BUF_SIZE: usize = 1024;
const TX_BUF_SIZE: usize = 1024;

/// Bytes read from the socket per wakeup
const READ_CHUNK: usize = 256;

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

/// Link task - keeps one display connected and controlled
#[embassy_executor::task]
pub async fn link_task(stack: Stack<'static>, config: &'static NodeConfig) {
    info!(
        "Link task started; will connect to {}:{}, set id {}",
        config.host.as_str(),
        config.port,
        config.display.set_id
    );

    let mut display = Display::new(config.display, Outbox::new());
    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS));
    let mut rx_buf = [0u8; RX_BUF_SIZE];
    let mut tx_buf = [0u8; TX_BUF_SIZE];

    let idle_timeout = Duration::from_secs(u64::from(config.idle_timeout_s));
    let reconnect_delay = Duration::from_secs(u64::from(config.reconnect_delay_s));

    display.start(now_ms());

    loop {
        stack.wait_config_up().await;

        let Some(address) = resolve(stack, config.host.as_str()).await else {
            wait_reconnect(&mut display, &mut ticker, reconnect_delay).await;
            continue;
        };

        let mut socket = TcpSocket::new(stack, &mut rx_buf, &mut tx_buf);
        match socket.connect((address, config.port)).await {
            Ok(()) => {
                info!("TCP connected");
                display.transport_mut().set_connected(true);
                display.on_connected(now_ms());
                publish_notifications(&mut display);

                serve(&mut socket, &mut display, &mut ticker, idle_timeout).await;
            }
            Err(e) => {
                warn!("TCP connect failed: {:?}", e);
                display.on_disconnected();
            }
        }

        socket.abort();
        display.transport_mut().set_connected(false);
        publish_notifications(&mut display);

        wait_reconnect(&mut display, &mut ticker, reconnect_delay).await;
    }
}

/// IPv4 literal, or the first A record for a host name
async fn resolve(stack: Stack<'static>, host: &str) -> Option<IpAddress> {
    if let Ok(address) = host.parse::<Ipv4Address>() {
        return Some(IpAddress::Ipv4(address));
    }

    match stack.dns_query(host, DnsQueryType::A).await {
        Ok(addresses) => {
            let address = addresses.first().copied();
            if address.is_none() {
                warn!("DNS lookup for {} returned no addresses", host);
            }
            address
        }
        Err(e) => {
            warn!("DNS lookup for {} failed: {:?}", host, e);
            None
        }
    }
}

/// Run the connected loop until the controller drops the connection
async fn serve(
    socket: &mut TcpSocket<'_>,
    display: &mut Display<Outbox>,
    ticker: &mut Ticker,
    idle_timeout: Duration,
) {
    let mut buf = [0u8; READ_CHUNK];
    let mut last_rx = Instant::now();

    loop {
        let event = select3(
            with_deadline(last_rx + idle_timeout, socket.read(&mut buf)),
            ticker.next(),
            CONTROL.receive(),
        )
        .await;

        let now = now_ms();
        match event {
            Either3::First(Ok(Ok(0))) => {
                warn!("TCP disconnected");
                display.on_disconnected();
            }
            Either3::First(Ok(Ok(n))) => {
                last_rx = Instant::now();
                trace!("tcp_recv {:02x}", &buf[..n]);
                display.on_received(&buf[..n], now);
            }
            Either3::First(Ok(Err(e))) => {
                warn!("TCP read error: {:?}", e);
                display.on_disconnected();
            }
            Either3::First(Err(_)) => {
                warn!("TCP timeout");
                display.on_timeout();
            }
            Either3::Second(()) => display.tick(now),
            Either3::Third(control) => apply_control(display, control, now),
        }

        if let Err(e) = flush(socket, display.transport_mut()).await {
            warn!("TCP write error: {:?}", e);
            display.on_disconnected();
        }

        publish_notifications(display);

        if display.transport_mut().take_drop_request() {
            return;
        }
    }
}

/// Keep ticking and accepting controls while disconnected
async fn wait_reconnect(display: &mut Display<Outbox>, ticker: &mut Ticker, delay: Duration) {
    debug!("Reconnecting in {} s", delay.as_secs());
    let deadline = Instant::now() + delay;

    loop {
        match select3(Timer::at(deadline), ticker.next(), CONTROL.receive()).await {
            Either3::First(()) => return,
            Either3::Second(()) => display.tick(now_ms()),
            Either3::Third(control) => apply_control(display, control, now_ms()),
        }
        publish_notifications(display);
    }
}

fn apply_control(display: &mut Display<Outbox>, control: Control, now: u64) {
    debug!("Control: {:?}", control);
    if let Err(e) = display.apply(control, now) {
        warn!("Control {:?} rejected: {:?}", control, e);
    }
}

async fn flush(
    socket: &mut TcpSocket<'_>,
    outbox: &mut Outbox,
) -> Result<(), embassy_net::tcp::Error> {
    if outbox.is_empty() {
        return Ok(());
    }

    trace!("tcp_send {:02x}", outbox.pending());
    let result = socket.write_all(outbox.pending()).await;
    outbox.clear_queue();
    result?;
    socket.flush().await
}

/// Log diagnostics and publish state changes
fn publish_notifications(display: &mut Display<Outbox>) {
    let publisher = NOTIFICATIONS.immediate_publisher();

    while let Some(notification) = display.poll_notification() {
        if notification.is_diagnostic() {
            log_diagnostic(&notification);
        } else {
            debug!("{:?}", notification);
            publisher.publish_immediate(notification);
        }
    }
}

fn log_diagnostic(notification: &Notification) {
    match notification {
        Notification::FramingDiscarded { bytes } => {
            warn!("Bad header; threw away {} bytes", bytes)
        }
        Notification::ResponseRejected { command, error } => {
            warn!("Response to {:?} rejected: {:?}", command, error)
        }
        Notification::UnsolicitedFrame => debug!("Frame arrived with nothing in flight"),
        Notification::ProtocolTimeout { abandoned } => {
            info!("Protocol timeout; flushed buffer and {} requests", abandoned)
        }
        Notification::RequestFailed(e) => warn!("Request not issued: {:?}", e),
        Notification::EnforcementStarted(property) => {
            info!("{}: enforcing requested state", name(*property))
        }
        Notification::EnforcementSettled(property) => {
            info!("{}: done checking state; states match", name(*property))
        }
        Notification::EnforcementGaveUp(property) => {
            warn!("{}: giving up enforcing state", name(*property))
        }
        Notification::InputAborted => {
            warn!("input: desired power is off; aborting input request")
        }
        Notification::PowerPrecondition => {
            info!("input: power is not on; turning on so the input can be chosen")
        }
        other => debug!("{:?}", other),
    }
}

fn name(property: Tracked) -> &'static str {
    match property {
        Tracked::Power => "power",
        Tracked::Input => "input",
    }
}
