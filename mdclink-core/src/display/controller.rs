//! Display controller
//!
//! Owns everything for one display connection: the frame decoder, the
//! request queue, the power and input reconcilers, the status monitor and
//! the poll schedules. All entry points take the current monotonic time
//! and run to completion; nothing here blocks or spawns.

use core::mem;

use heapless::Deque;
use mdclink_protocol::messages::{
    decode_clear_menu_ack, decode_input_ack, decode_ir_remote, decode_power_ack,
    decode_serial_number, decode_software_version, decode_volume_ack,
};
use mdclink_protocol::{
    Command, DisplayStatus, ExtendedStatus, Frame, FrameDecoder, FrameError, InputCode, IrRemote,
    Power, Response,
};

use super::control::{Control, ControlError, MAX_VOLUME};
use super::notification::{
    changed, info_text, replaced, ConnectionState, DisplayState, Notification, Published,
    Tracked,
};
use crate::config::DisplayConfig;
use crate::queue::RequestQueue;
use crate::schedule::Schedule;
use crate::state::{Effective, Phase, Property, Step};
use crate::status::{StatusMonitor, WallClock};
use crate::traits::Transport;

/// Notifications held until drained; the oldest is dropped when full
pub const NOTIFICATION_CAPACITY: usize = 32;

/// Controller for one display
pub struct Display<T: Transport> {
    config: DisplayConfig,
    transport: T,
    decoder: FrameDecoder,
    queue: RequestQueue<Command>,
    connection: Option<ConnectionState>,

    power: Property<Power>,
    input: Property<InputCode>,

    monitor: StatusMonitor,
    status_poll: Schedule,
    extended_poll: Schedule,
    info_poll: Schedule,

    published: Published,
    notifications: Deque<Notification, NOTIFICATION_CAPACITY>,
}

impl<T: Transport> Display<T> {
    pub fn new(config: DisplayConfig, transport: T) -> Self {
        let timings = config.timings;
        let clock = WallClock::new(i32::from(config.utc_offset_minutes));

        Self {
            config,
            transport,
            decoder: FrameDecoder::new(),
            queue: RequestQueue::new(timings.protocol_timeout_ms()),
            connection: None,
            power: Property::new(timings.retry_period_ms(), timings.give_up_ms()),
            input: Property::new(timings.retry_period_ms(), timings.give_up_ms()),
            monitor: StatusMonitor::new(timings.monitor(), config.heartbeat_enabled, clock),
            status_poll: Schedule::every(timings.status_poll_ms()),
            extended_poll: Schedule::every(timings.extended_poll_ms())
                .after(timings.extended_poll_first_ms()),
            info_poll: Schedule::every(timings.info_poll_ms()).after(timings.info_poll_first_ms()),
            published: Published::default(),
            notifications: Deque::new(),
        }
    }

    /// Start the poll schedules and the status monitor
    pub fn start(&mut self, now_ms: u64) {
        self.status_poll.start(now_ms);
        self.extended_poll.start(now_ms);
        self.info_poll.start(now_ms);
        self.monitor.start(now_ms);
    }

    // ---- transport events ----

    pub fn on_connected(&mut self, now_ms: u64) {
        self.set_connection(ConnectionState::Connected);
        self.status_poll
            .set_delay(now_ms, self.config.timings.status_poll_on_connect_ms());
    }

    pub fn on_disconnected(&mut self) {
        self.connection_lost(ConnectionState::Disconnected);
    }

    pub fn on_timeout(&mut self) {
        self.connection_lost(ConnectionState::Timeout);
    }

    /// Feed received bytes; chunk boundaries are irrelevant
    pub fn on_received(&mut self, bytes: &[u8], now_ms: u64) {
        self.monitor.record_receive(now_ms);

        let mut decoder = mem::take(&mut self.decoder);
        let report = decoder.feed(bytes, |frame| self.handle_frame(&frame, now_ms));
        self.decoder = decoder;

        if report.discarded > 0 {
            self.notify(Notification::FramingDiscarded {
                bytes: report.discarded,
            });
        }
    }

    /// Drive timers; call periodically
    pub fn tick(&mut self, now_ms: u64) {
        if let Some(abandoned) = self.queue.check_timeout(now_ms) {
            self.decoder.reset();
            self.notify(Notification::ProtocolTimeout { abandoned });
        }

        if self.power.retry_due(now_ms) {
            self.enforce_power(now_ms);
        }
        if self.input.retry_due(now_ms) {
            self.enforce_input(now_ms);
        }

        let connected = self.is_connected();
        if self.status_poll.poll(now_ms) && connected {
            self.request_or_report(Command::Status, now_ms);
        }
        if self.extended_poll.poll(now_ms) && connected {
            self.request_or_report(Command::ExtendedStatus, now_ms);
        }
        if self.info_poll.poll(now_ms) && connected {
            if let Err(err) = self.poll_non_critical_info(now_ms) {
                self.notify(Notification::RequestFailed(err));
            }
        }

        let power_on = self.power(now_ms) == Some(Effective::Exact(Power::On));
        if let Some(status) = self.monitor.poll(now_ms, power_on) {
            if changed(&mut self.published.contact, status.clone()) {
                self.notify(Notification::Contact(status));
            }
        }

        // Effective values go stale with time alone
        self.publish_effective(now_ms);
    }

    // ---- control surface ----

    /// Apply a control call delivered as a value
    pub fn apply(&mut self, control: Control, now_ms: u64) -> Result<(), ControlError> {
        match control {
            Control::SetPower(power) => {
                self.set_power(power, now_ms);
                Ok(())
            }
            Control::SetInput(input) => {
                self.set_input(input, now_ms);
                Ok(())
            }
            Control::EnsureState(power) => self.ensure_state(power, now_ms),
            Control::PollStatus => self.poll_status(now_ms),
            Control::PollExtendedStatus => self.poll_extended_status(now_ms),
            Control::GetSerialNumber => self.get_serial_number(now_ms),
            Control::GetSoftwareVersion => self.get_software_version(now_ms),
            Control::GetIrRemoteControl => self.get_ir_remote_control(now_ms),
            Control::SetIrRemoteControl(state) => self.set_ir_remote_control(state, now_ms),
            Control::SetVolume(level) => self.set_volume(level, now_ms),
            Control::ClearMenu => self.clear_menu(now_ms),
            Control::PollNonCriticalInfo => self.poll_non_critical_info(now_ms),
            Control::Heartbeat => {
                self.heartbeat(now_ms);
                Ok(())
            }
            Control::SyncWallClock(unix_ms) => {
                self.sync_wall_clock(unix_ms, now_ms);
                Ok(())
            }
        }
    }

    /// Request a power state and enforce it until the display agrees
    pub fn set_power(&mut self, power: Power, now_ms: u64) {
        let started = self.power.set_desired(power, now_ms);
        self.publish_effective(now_ms);

        if started {
            self.notify(Notification::EnforcementStarted(Tracked::Power));
            self.enforce_power(now_ms);
        }
    }

    /// Request an input and enforce it, turning the display on if needed
    pub fn set_input(&mut self, input: InputCode, now_ms: u64) {
        let started = self.input.set_desired(input, now_ms);
        self.publish_effective(now_ms);

        if started {
            self.notify(Notification::EnforcementStarted(Tracked::Input));
            self.enforce_input(now_ms);
        }
    }

    /// On: power on and select the main input. Off: power off.
    pub fn ensure_state(&mut self, power: Power, now_ms: u64) -> Result<(), ControlError> {
        let main_input = self
            .config
            .main_input_code
            .ok_or(ControlError::NoMainInputCode)?;

        self.set_power(power, now_ms);
        if power == Power::On {
            self.set_input(main_input, now_ms);
        }
        Ok(())
    }

    pub fn poll_status(&mut self, now_ms: u64) -> Result<(), ControlError> {
        self.request(Command::Status, now_ms)
    }

    pub fn poll_extended_status(&mut self, now_ms: u64) -> Result<(), ControlError> {
        self.request(Command::ExtendedStatus, now_ms)
    }

    pub fn get_serial_number(&mut self, now_ms: u64) -> Result<(), ControlError> {
        self.request(Command::SerialNumber, now_ms)
    }

    pub fn get_software_version(&mut self, now_ms: u64) -> Result<(), ControlError> {
        self.request(Command::SoftwareVersion, now_ms)
    }

    pub fn get_ir_remote_control(&mut self, now_ms: u64) -> Result<(), ControlError> {
        self.request(Command::GetIrRemote, now_ms)
    }

    pub fn set_ir_remote_control(&mut self, state: IrRemote, now_ms: u64) -> Result<(), ControlError> {
        self.request(Command::SetIrRemote(state), now_ms)
    }

    pub fn set_volume(&mut self, level: u8, now_ms: u64) -> Result<(), ControlError> {
        if level > MAX_VOLUME {
            return Err(ControlError::VolumeOutOfRange);
        }
        self.request(Command::SetVolume(level), now_ms)
    }

    pub fn clear_menu(&mut self, now_ms: u64) -> Result<(), ControlError> {
        self.request(Command::ClearMenu, now_ms)
    }

    pub fn poll_non_critical_info(&mut self, now_ms: u64) -> Result<(), ControlError> {
        self.get_serial_number(now_ms)?;
        self.get_ir_remote_control(now_ms)?;
        self.get_software_version(now_ms)
    }

    pub fn heartbeat(&mut self, now_ms: u64) {
        self.monitor.record_heartbeat(now_ms);
    }

    pub fn sync_wall_clock(&mut self, unix_ms: i64, now_ms: u64) {
        self.monitor.sync_wall_clock(unix_ms, now_ms);
    }

    // ---- observers ----

    /// Next pending notification, oldest first
    pub fn poll_notification(&mut self) -> Option<Notification> {
        self.notifications.pop_front()
    }

    pub fn connection(&self) -> Option<ConnectionState> {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == Some(ConnectionState::Connected)
    }

    pub fn power(&self, now_ms: u64) -> Option<Effective<Power>> {
        self.power.effective(now_ms, self.config.timings.stale_after_ms())
    }

    pub fn input(&self, now_ms: u64) -> Option<Effective<InputCode>> {
        self.input.effective(now_ms, self.config.timings.stale_after_ms())
    }

    pub fn raw_power(&self) -> Option<Power> {
        self.power.raw()
    }

    pub fn raw_input(&self) -> Option<InputCode> {
        self.input.raw()
    }

    pub fn power_phase(&self) -> Phase {
        self.power.phase()
    }

    pub fn input_phase(&self) -> Phase {
        self.input.phase()
    }

    pub fn volume(&self) -> Option<u8> {
        self.published.volume
    }

    pub fn mute(&self) -> Option<bool> {
        self.published.mute
    }

    pub fn state(&self) -> DisplayState {
        match self.power.raw() {
            None => DisplayState::Unknown,
            Some(Power::Off) => DisplayState::Off,
            Some(Power::On) => match self.input.raw() {
                None => DisplayState::On,
                Some(current) if Some(current) == self.config.main_input_code => DisplayState::On,
                Some(_) => DisplayState::UnknownInput,
            },
        }
    }

    /// Requests in flight plus waiting
    pub fn pending_requests(&self) -> usize {
        self.queue.len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ---- internals ----

    fn request(&mut self, command: Command, now_ms: u64) -> Result<(), ControlError> {
        let frame = command.to_frame(self.config.set_id)?;
        self.queue.request(command, frame, now_ms, &mut self.transport)?;
        Ok(())
    }

    /// Request from a timer, where nobody is waiting for the result
    fn request_or_report(&mut self, command: Command, now_ms: u64) {
        if let Err(err) = self.request(command, now_ms) {
            self.notify(Notification::RequestFailed(err));
        }
    }

    fn connection_lost(&mut self, state: ConnectionState) {
        self.set_connection(state);
        self.queue.clear();
        self.decoder.reset();
        self.transport.drop_connection();
        self.transport.clear_queue();
    }

    fn set_connection(&mut self, state: ConnectionState) {
        self.connection = Some(state);
        if changed(&mut self.published.connection, state) {
            self.notify(Notification::Connection(state));
        }
    }

    fn enforce_power(&mut self, now_ms: u64) {
        match self.power.enforce(now_ms) {
            Step::InSync => {}
            Step::GaveUp => self.notify(Notification::EnforcementGaveUp(Tracked::Power)),
            Step::Retry(power) => self.request_or_report(Command::SetPower(power), now_ms),
        }
    }

    fn enforce_input(&mut self, now_ms: u64) {
        let input = match self.input.enforce(now_ms) {
            Step::InSync => return,
            Step::GaveUp => {
                self.notify(Notification::EnforcementGaveUp(Tracked::Input));
                return;
            }
            Step::Retry(input) => input,
        };

        if self.power.desired().map(|d| d.value) == Some(Power::Off) {
            self.input.abandon();
            self.notify(Notification::InputAborted);
            return;
        }

        if self.power.raw() != Some(Power::On) {
            self.notify(Notification::PowerPrecondition);
            self.set_power(Power::On, now_ms);
            return;
        }

        self.request_or_report(Command::SetInput(input), now_ms);
    }

    fn handle_frame(&mut self, frame: &Frame, now_ms: u64) {
        let Some(command) = self.queue.handle(now_ms, &mut self.transport) else {
            self.notify(Notification::UnsolicitedFrame);
            return;
        };

        let result = Response::decode(frame).and_then(|response| {
            self.handle_response(command, &response, now_ms)
        });

        if let Err(error) = result {
            self.notify(Notification::ResponseRejected {
                command: Some(command.opcode()),
                error,
            });
        }
    }

    fn handle_response(
        &mut self,
        command: Command,
        response: &Response<'_>,
        now_ms: u64,
    ) -> Result<(), FrameError> {
        match command {
            Command::Status => {
                let status = DisplayStatus::decode(response)?;
                self.update_power(status.power, now_ms);
                self.update_input(status.input, now_ms);
                self.publish_volume(status.volume);
                if changed(&mut self.published.mute, status.mute) {
                    self.notify(Notification::Mute(status.mute));
                }
            }
            Command::ExtendedStatus => {
                let status = ExtendedStatus::decode(response)?;
                self.monitor.set_faults(status.faults);
                if changed(&mut self.published.faults, status.faults) {
                    self.notify(Notification::Faults(status.faults));
                }
                if changed(&mut self.published.temperature, status.current_temperature) {
                    self.notify(Notification::Temperature(status.current_temperature));
                }
            }
            Command::SerialNumber => {
                let text = info_text(decode_serial_number(response)?);
                if changed(&mut self.published.serial_number, text.clone()) {
                    self.notify(Notification::SerialNumber(text));
                }
            }
            Command::SoftwareVersion => {
                let text = info_text(decode_software_version(response)?);
                if changed(&mut self.published.software_version, text.clone()) {
                    self.notify(Notification::SoftwareVersion(text));
                }
            }
            Command::SetPower(_) => {
                let power = decode_power_ack(response)?;
                self.update_power(power, now_ms);
            }
            Command::SetVolume(_) => {
                let level = decode_volume_ack(response)?;
                self.publish_volume(level);
            }
            Command::SetInput(_) => {
                let input = decode_input_ack(response)?;
                self.update_input(input, now_ms);
            }
            Command::ClearMenu => decode_clear_menu_ack(response)?,
            Command::GetIrRemote | Command::SetIrRemote(_) => {
                let state = decode_ir_remote(response)?;
                if changed(&mut self.published.ir_remote, state) {
                    self.notify(Notification::IrRemote(state));
                }
            }
        }
        Ok(())
    }

    fn update_power(&mut self, power: Power, now_ms: u64) {
        let was_changed = self.power.update_raw(power);
        if self.power.quick_check().settled {
            self.notify(Notification::EnforcementSettled(Tracked::Power));
        }

        if was_changed {
            self.publish_state();
            if power == Power::On && self.input.is_enforcing() {
                self.enforce_input(now_ms);
            }
        }
        self.publish_effective(now_ms);
    }

    fn update_input(&mut self, input: InputCode, now_ms: u64) {
        let was_changed = self.input.update_raw(input);
        if self.input.quick_check().settled {
            self.notify(Notification::EnforcementSettled(Tracked::Input));
        }

        if was_changed {
            self.publish_state();
        }
        self.publish_effective(now_ms);
    }

    fn publish_volume(&mut self, level: u8) {
        if changed(&mut self.published.volume, level) {
            self.notify(Notification::Volume(level));
        }
    }

    fn publish_state(&mut self) {
        let state = self.state();
        if changed(&mut self.published.state, state) {
            self.notify(Notification::State(state));
        }
    }

    fn publish_effective(&mut self, now_ms: u64) {
        let power = self.power(now_ms);
        if replaced(&mut self.published.power, power) {
            self.notify(Notification::Power(power));
        }
        let input = self.input(now_ms);
        if replaced(&mut self.published.input, input) {
            self.notify(Notification::Input(input));
        }
    }

    fn notify(&mut self, notification: Notification) {
        if self.notifications.is_full() {
            self.notifications.pop_front();
        }
        let _ = self.notifications.push_back(notification);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::status::StatusLevel;
    use crate::traits::transport::mock::RecordingTransport;
    use mdclink_protocol::messages::{
        CMD_EXTENDED_STATUS, CMD_INPUT_SOURCE, CMD_POWER, CMD_SERIAL_NUMBER, CMD_STATUS,
    };
    use mdclink_protocol::FaultFlags;

    fn display() -> Display<RecordingTransport> {
        Display::new(DisplayConfig::default(), RecordingTransport::default())
    }

    fn response(command: u8, data: &[u8]) -> Vec<u8> {
        let mut payload = Vec::from([b'A', command]);
        payload.extend_from_slice(data);
        Frame::encode(0xff, 0x00, &payload).unwrap().as_bytes().to_vec()
    }

    fn status(power: u8, input: u8) -> Vec<u8> {
        response(CMD_STATUS, &[power, 0x00, 0x00, input, 0x10, 0x00, 0x00])
    }

    fn frame_of(command: Command) -> Vec<u8> {
        command.to_frame(0).unwrap().as_bytes().to_vec()
    }

    fn drain(display: &mut Display<RecordingTransport>) -> Vec<Notification> {
        core::iter::from_fn(|| display.poll_notification()).collect()
    }

    fn report_power_off(display: &mut Display<RecordingTransport>) {
        display.poll_status(0).unwrap();
        display.on_received(&status(0x00, 0x14), 0);
        assert_eq!(display.raw_power(), Some(Power::Off));
    }

    #[test]
    fn test_set_power_from_unknown() {
        let mut d = display();
        d.set_power(Power::On, 0);

        assert_eq!(
            d.transport().last_sent(),
            Some(&[0xaa, 0x11, 0x00, 0x01, 0x01, 0x13][..])
        );
        assert_eq!(d.power(0), Some(Effective::Partially(Power::On)));

        d.on_received(&response(CMD_POWER, &[0x01]), 500);

        assert_eq!(d.raw_power(), Some(Power::On));
        assert_eq!(d.power(500), Some(Effective::Exact(Power::On)));
        assert_eq!(d.power_phase(), Phase::InSync);

        let notes = drain(&mut d);
        assert!(notes.contains(&Notification::EnforcementStarted(Tracked::Power)));
        assert!(notes.contains(&Notification::Power(Some(Effective::Partially(Power::On)))));
        assert!(notes.contains(&Notification::Power(Some(Effective::Exact(Power::On)))));
        assert!(notes.contains(&Notification::EnforcementSettled(Tracked::Power)));

        // Converged, so no retry
        d.tick(25_000);
        assert_eq!(d.transport().sent.len(), 1);
    }

    #[test]
    fn test_second_request_waits_for_first() {
        let mut d = display();
        d.poll_status(0).unwrap();
        d.poll_extended_status(0).unwrap();

        assert_eq!(d.transport().sent.len(), 1);
        assert_eq!(d.pending_requests(), 2);

        d.on_received(&status(0x01, 0x21), 100);

        assert_eq!(d.transport().sent.len(), 2);
        assert_eq!(
            d.transport().last_sent(),
            Some(frame_of(Command::ExtendedStatus).as_slice())
        );
        assert_eq!(d.pending_requests(), 1);
    }

    #[test]
    fn test_status_response_in_three_slices() {
        let mut d = display();
        d.poll_status(0).unwrap();

        let data = [
            0xaa, 0xff, 0x00, 0x09, 0x41, 0x00, 0x01, 0x00, 0x00, 0x14, 0x10, 0x00, 0x00, 0x6e,
        ];
        d.on_received(&data[..2], 10);
        d.on_received(&data[2..11], 20);
        assert_eq!(d.raw_power(), None);
        d.on_received(&data[11..], 30);

        assert_eq!(d.raw_power(), Some(Power::On));
        assert_eq!(d.raw_input(), Some(InputCode::new(0x14)));
        assert_eq!(d.volume(), Some(0));
        assert_eq!(d.mute(), Some(false));
        // No main input configured, so any reported input is unrecognised
        assert_eq!(d.state(), DisplayState::UnknownInput);
        assert!(!drain(&mut d).iter().any(|n| matches!(
            n,
            Notification::ResponseRejected { .. } | Notification::UnsolicitedFrame
        )));
    }

    #[test]
    fn test_off_network_after_silence() {
        let mut d = display();
        d.start(0);
        d.on_connected(0);

        d.tick(1_000);
        assert_eq!(d.transport().last_sent(), Some(frame_of(Command::Status).as_slice()));
        d.on_received(&status(0x01, 0x14), 1_200);

        d.tick(75_000);
        d.tick(166_000);

        let contacts: Vec<_> = drain(&mut d)
            .into_iter()
            .filter_map(|n| match n {
                Notification::Contact(status) => Some(status),
                _ => None,
            })
            .collect();

        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].level, StatusLevel::Ok);
        assert_eq!(contacts[1].level, StatusLevel::Error);
        assert_eq!(
            contacts[1].message.as_str(),
            "Off the network for approx. 1 mins"
        );
    }

    #[test]
    fn test_input_waits_for_power() {
        let mut d = display();
        report_power_off(&mut d);

        d.set_input(InputCode::parse("HM1").unwrap(), 100);

        assert_eq!(d.transport().sent.len(), 2);
        assert_eq!(
            d.transport().last_sent(),
            Some(frame_of(Command::SetPower(Power::On)).as_slice())
        );
        assert!(drain(&mut d).contains(&Notification::PowerPrecondition));

        d.on_received(&response(CMD_POWER, &[0x01]), 200);

        assert_eq!(d.transport().sent.len(), 3);
        assert_eq!(
            d.transport().last_sent(),
            Some(frame_of(Command::SetInput(InputCode::new(0x21))).as_slice())
        );

        d.on_received(&response(CMD_INPUT_SOURCE, &[0x21]), 300);

        assert_eq!(d.raw_input(), Some(InputCode::new(0x21)));
        assert_eq!(d.input_phase(), Phase::InSync);
        assert!(drain(&mut d).contains(&Notification::EnforcementSettled(Tracked::Input)));
    }

    #[test]
    fn test_input_aborts_when_power_wanted_off() {
        let mut d = display();
        report_power_off(&mut d);
        d.set_power(Power::Off, 0);
        drain(&mut d);

        d.set_input(InputCode::new(0x21), 100);

        assert_eq!(d.transport().sent.len(), 1);
        assert_eq!(d.input_phase(), Phase::GaveUp);
        assert!(drain(&mut d).contains(&Notification::InputAborted));
    }

    #[test]
    fn test_gives_up_after_75_seconds() {
        let mut d = display();
        report_power_off(&mut d);

        d.set_power(Power::On, 0);
        assert_eq!(d.transport().sent.len(), 2);

        let mut sent_at_75s = 0;
        for now in (250..=200_000).step_by(250) {
            d.tick(now);
            if now == 60_250 {
                assert_eq!(d.power(now), Some(Effective::Exact(Power::Off)));
            }
            if now == 75_000 {
                sent_at_75s = d.transport().sent.len();
            }
        }

        // Attempts at 0, 25, 50 and 75 seconds
        assert_eq!(sent_at_75s, 5);
        assert_eq!(d.transport().sent.len(), 5);
        assert_eq!(d.power_phase(), Phase::GaveUp);
        assert_eq!(d.power(200_000), Some(Effective::Exact(Power::Off)));

        let notes = drain(&mut d);
        assert!(notes.contains(&Notification::EnforcementGaveUp(Tracked::Power)));
        assert!(notes.contains(&Notification::ProtocolTimeout { abandoned: 1 }));
    }

    #[test]
    fn test_usable_after_protocol_timeout() {
        let mut d = display();
        d.poll_status(0).unwrap();
        d.poll_extended_status(0).unwrap();

        // Half a frame that never completes
        d.on_received(&[0xaa, 0xff, 0x00], 5_000);

        d.tick(10_000);
        assert_eq!(d.pending_requests(), 0);
        assert!(drain(&mut d).contains(&Notification::ProtocolTimeout { abandoned: 2 }));

        d.poll_status(10_001).unwrap();
        assert_eq!(d.transport().sent.len(), 2);

        d.on_received(&status(0x01, 0x21), 10_500);
        assert_eq!(d.raw_power(), Some(Power::On));
        assert_eq!(d.pending_requests(), 0);
    }

    #[test]
    fn test_concatenated_responses_resolve_in_order() {
        let mut d = display();
        d.poll_status(0).unwrap();
        d.poll_extended_status(0).unwrap();
        d.get_serial_number(0).unwrap();

        let mut chunk = status(0x01, 0x21);
        chunk.extend(response(CMD_EXTENDED_STATUS, &[0, 0, 0, 1, 0x36, 1]));
        chunk.extend(response(CMD_SERIAL_NUMBER, b"SN123\0\0\0"));
        d.on_received(&chunk, 100);

        assert_eq!(d.transport().sent.len(), 3);
        assert_eq!(d.pending_requests(), 0);
        assert_eq!(d.raw_power(), Some(Power::On));

        let notes = drain(&mut d);
        let faults = FaultFlags {
            no_sync: true,
            fan: true,
            ..FaultFlags::default()
        };
        let faults_at = notes
            .iter()
            .position(|n| *n == Notification::Faults(faults))
            .unwrap();
        let serial_at = notes
            .iter()
            .position(|n| *n == Notification::SerialNumber(info_text("SN123")))
            .unwrap();
        assert!(faults_at < serial_at);
        assert!(notes.contains(&Notification::Temperature(0x36)));
        assert!(!notes.iter().any(|n| matches!(
            n,
            Notification::ResponseRejected { .. } | Notification::UnsolicitedFrame
        )));
    }

    #[test]
    fn test_unsolicited_frame() {
        let mut d = display();
        d.on_received(&status(0x01, 0x21), 0);
        assert_eq!(d.raw_power(), None);
        assert!(drain(&mut d).contains(&Notification::UnsolicitedFrame));
    }

    #[test]
    fn test_nak_is_rejected() {
        let mut d = display();
        d.poll_status(0).unwrap();

        let nak = Frame::encode(0xff, 0x00, &[b'N', CMD_STATUS, 0x02]).unwrap();
        d.on_received(nak.as_bytes(), 10);

        assert_eq!(d.raw_power(), None);
        assert!(drain(&mut d).contains(&Notification::ResponseRejected {
            command: Some(CMD_STATUS),
            error: FrameError::Nak {
                command: CMD_STATUS,
                code: 0x02
            },
        }));
    }

    #[test]
    fn test_leading_garbage_is_reported() {
        let mut d = display();
        d.poll_status(0).unwrap();

        let mut chunk = Vec::from([0x00, 0x13]);
        chunk.extend(status(0x00, 0x14));
        d.on_received(&chunk, 10);

        assert_eq!(d.raw_power(), Some(Power::Off));
        assert!(drain(&mut d).contains(&Notification::FramingDiscarded { bytes: 2 }));
    }

    #[test]
    fn test_ensure_state_needs_main_input() {
        let mut d = display();
        assert_eq!(
            d.ensure_state(Power::On, 0),
            Err(ControlError::NoMainInputCode)
        );
        assert!(d.transport().sent.is_empty());
    }

    #[test]
    fn test_ensure_state_on() {
        let config = DisplayConfig {
            main_input_code: Some(InputCode::new(0x21)),
            ..DisplayConfig::default()
        };
        let mut d = Display::new(config, RecordingTransport::default());
        d.poll_status(0).unwrap();
        d.on_received(&status(0x01, 0x14), 0);
        assert_eq!(d.state(), DisplayState::UnknownInput);

        d.ensure_state(Power::On, 100).unwrap();
        assert_eq!(
            d.transport().last_sent(),
            Some(frame_of(Command::SetInput(InputCode::new(0x21))).as_slice())
        );

        d.on_received(&response(CMD_INPUT_SOURCE, &[0x21]), 200);
        assert_eq!(d.state(), DisplayState::On);
        assert!(drain(&mut d).contains(&Notification::State(DisplayState::On)));
    }

    #[test]
    fn test_volume_range() {
        let mut d = display();
        assert_eq!(d.set_volume(101, 0), Err(ControlError::VolumeOutOfRange));
        d.set_volume(100, 0).unwrap();
        assert_eq!(
            d.transport().last_sent(),
            Some(frame_of(Command::SetVolume(100)).as_slice())
        );
    }

    #[test]
    fn test_non_critical_info_queues_three() {
        let mut d = display();
        d.apply(Control::PollNonCriticalInfo, 0).unwrap();
        assert_eq!(d.pending_requests(), 3);
        assert_eq!(
            d.transport().last_sent(),
            Some(frame_of(Command::SerialNumber).as_slice())
        );
    }

    #[test]
    fn test_disconnect_resets_link() {
        let mut d = display();
        d.on_connected(0);
        d.poll_status(0).unwrap();
        d.on_disconnected();

        assert_eq!(d.connection(), Some(ConnectionState::Disconnected));
        assert_eq!(d.pending_requests(), 0);
        assert_eq!(d.transport().drops, 1);
        assert_eq!(d.transport().clears, 1);

        let notes = drain(&mut d);
        assert_eq!(
            notes,
            Vec::from([
                Notification::Connection(ConnectionState::Connected),
                Notification::Connection(ConnectionState::Disconnected),
            ])
        );
    }

    #[test]
    fn test_timeout_resets_link() {
        let mut d = display();
        d.on_connected(0);
        d.poll_status(0).unwrap();
        d.poll_extended_status(0).unwrap();
        d.on_received(&[0xaa, 0xff, 0x00], 100);
        d.on_timeout();

        assert_eq!(d.connection(), Some(ConnectionState::Timeout));
        assert!(!d.is_connected());
        assert_eq!(d.pending_requests(), 0);
        assert_eq!(d.transport().drops, 1);
        assert_eq!(d.transport().clears, 1);

        let notes = drain(&mut d);
        assert_eq!(
            notes,
            Vec::from([
                Notification::Connection(ConnectionState::Connected),
                Notification::Connection(ConnectionState::Timeout),
            ])
        );

        // Partial frame from before the timeout is gone
        d.on_connected(5_000);
        d.poll_status(5_000).unwrap();
        d.on_received(&status(0x01, 0x21), 5_100);
        assert_eq!(d.raw_power(), Some(Power::On));
        assert!(!drain(&mut d).iter().any(|n| matches!(
            n,
            Notification::ResponseRejected { .. } | Notification::FramingDiscarded { .. }
        )));
    }

    #[test]
    fn test_stale_request_with_silent_display_goes_unknown() {
        let mut d = display();
        d.set_power(Power::On, 0);

        for now in (250..=120_000).step_by(250) {
            d.tick(now);
        }

        assert_eq!(d.raw_power(), None);
        assert_eq!(d.power(120_000), None);

        let published: Vec<_> = drain(&mut d)
            .into_iter()
            .filter_map(|n| match n {
                Notification::Power(power) => Some(power),
                _ => None,
            })
            .collect();
        assert_eq!(
            published,
            Vec::from([Some(Effective::Partially(Power::On)), None])
        );
    }

    #[test]
    fn test_state_without_main_input() {
        let mut d = display();
        d.set_power(Power::On, 0);
        d.on_received(&response(CMD_POWER, &[0x01]), 100);
        assert_eq!(d.raw_input(), None);
        assert_eq!(d.state(), DisplayState::On);

        d.poll_status(200).unwrap();
        d.on_received(&status(0x01, 0x21), 300);
        assert_eq!(d.state(), DisplayState::UnknownInput);
    }

    #[test]
    fn test_polls_wait_for_connection() {
        let mut d = display();
        d.start(0);
        d.tick(30_000);
        assert!(d.transport().sent.is_empty());

        d.on_connected(30_000);
        d.tick(31_000);
        assert_eq!(d.transport().sent.len(), 1);
    }

    #[test]
    fn test_repeated_status_is_not_republished() {
        let mut d = display();
        d.poll_status(0).unwrap();
        d.on_received(&status(0x01, 0x14), 0);
        drain(&mut d);

        d.poll_status(30_000).unwrap();
        d.on_received(&status(0x01, 0x14), 30_000);
        assert!(drain(&mut d).is_empty());
    }

    #[test]
    fn test_notifications_drop_oldest() {
        let mut d = display();
        for _ in 0..NOTIFICATION_CAPACITY + 5 {
            d.on_received(&status(0x01, 0x14), 0);
        }
        assert_eq!(drain(&mut d).len(), NOTIFICATION_CAPACITY);
    }
}
