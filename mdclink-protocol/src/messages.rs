//! Commands and response layouts
//!
//! Requests are built from [`Command`]. Responses are not self-describing:
//! each field lives at a fixed offset documented by the device manual, so
//! every decoder below reads absolute frame offsets.

use crate::frame::{Frame, FrameError, Response};
use crate::input::InputCode;

// Command opcodes
pub const CMD_STATUS: u8 = 0x00;
pub const CMD_SERIAL_NUMBER: u8 = 0x0B;
pub const CMD_EXTENDED_STATUS: u8 = 0x0D;
pub const CMD_SOFTWARE_VERSION: u8 = 0x0E;
pub const CMD_POWER: u8 = 0x11;
pub const CMD_VOLUME: u8 = 0x12;
pub const CMD_INPUT_SOURCE: u8 = 0x14;
pub const CMD_CLEAR_MENU: u8 = 0x34;
pub const CMD_IR_REMOTE: u8 = 0x36;

/// First data byte of a response (after ACK and echoed command)
const DATA_OFFSET: usize = 6;

// Status response:
//
//   PWR  VOL  MUTE  INPUT  ASPECT  NTimeNF  FTimeNF  CSUM
//   +6   +7   +8    +9     +10     +11      +12      +13
const STATUS_POWER: usize = 6;
const STATUS_VOLUME: usize = 7;
const STATUS_MUTE: usize = 8;
const STATUS_INPUT: usize = 9;
const STATUS_ASPECT: usize = 10;
const STATUS_ON_TIMER: usize = 11;
const STATUS_OFF_TIMER: usize = 12;

// Extended status response:
//
//   LampErr  TempErr  BrightSens  NoSyncErr  CurTemp  FanErr  CSUM
//   +6       +7       +8          +9         +10      +11     +12
const EXT_LAMP: usize = 6;
const EXT_TEMPERATURE: usize = 7;
const EXT_BRIGHT_SENSOR: usize = 8;
const EXT_NO_SYNC: usize = 9;
const EXT_CURRENT_TEMP: usize = 10;
const EXT_FAN: usize = 11;

/// Bytes trimmed from the end of a serial number response (includes checksum)
const SERIAL_TRAILING: usize = 4;

/// Power state as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Power {
    On,
    Off,
}

impl Power {
    pub fn from_byte(byte: u8) -> Self {
        if byte == 0x01 {
            Power::On
        } else {
            Power::Off
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Power::On => 0x01,
            Power::Off => 0x00,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Power::On => "On",
            Power::Off => "Off",
        }
    }
}

impl core::fmt::Display for Power {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IR remote control lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrRemote {
    Enabled,
    Disabled,
}

impl IrRemote {
    pub fn from_byte(byte: u8) -> Self {
        if byte == 0x01 {
            IrRemote::Enabled
        } else {
            IrRemote::Disabled
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            IrRemote::Enabled => 0x01,
            IrRemote::Disabled => 0x00,
        }
    }
}

/// Requests understood by the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Power, volume, mute and input in one response
    Status,
    /// Fault flags and temperature
    ExtendedStatus,
    SerialNumber,
    SoftwareVersion,
    SetPower(Power),
    SetVolume(u8),
    SetInput(InputCode),
    /// Dismiss the on-screen menu
    ClearMenu,
    GetIrRemote,
    SetIrRemote(IrRemote),
}

impl Command {
    /// Opcode byte for this command
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Status => CMD_STATUS,
            Command::ExtendedStatus => CMD_EXTENDED_STATUS,
            Command::SerialNumber => CMD_SERIAL_NUMBER,
            Command::SoftwareVersion => CMD_SOFTWARE_VERSION,
            Command::SetPower(_) => CMD_POWER,
            Command::SetVolume(_) => CMD_VOLUME,
            Command::SetInput(_) => CMD_INPUT_SOURCE,
            Command::ClearMenu => CMD_CLEAR_MENU,
            Command::GetIrRemote | Command::SetIrRemote(_) => CMD_IR_REMOTE,
        }
    }

    /// Encode this command for the display at `set_id`
    pub fn to_frame(&self, set_id: u8) -> Result<Frame, FrameError> {
        let opcode = self.opcode();
        match self {
            Command::Status
            | Command::ExtendedStatus
            | Command::SerialNumber
            | Command::SoftwareVersion
            | Command::GetIrRemote => Frame::encode(opcode, set_id, &[]),
            Command::SetPower(power) => Frame::encode(opcode, set_id, &[power.to_byte()]),
            Command::SetVolume(level) => Frame::encode(opcode, set_id, &[*level]),
            Command::SetInput(input) => Frame::encode(opcode, set_id, &[input.code()]),
            Command::ClearMenu => Frame::encode(opcode, set_id, &[0x00]),
            Command::SetIrRemote(state) => Frame::encode(opcode, set_id, &[state.to_byte()]),
        }
    }
}

/// Basic status report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayStatus {
    pub power: Power,
    /// Volume level (0-100)
    pub volume: u8,
    pub mute: bool,
    pub input: InputCode,
    pub aspect: u8,
    pub on_timer: u8,
    pub off_timer: u8,
}

impl DisplayStatus {
    pub fn decode(response: &Response<'_>) -> Result<Self, FrameError> {
        response.expect(CMD_STATUS)?;
        Ok(Self {
            power: Power::from_byte(response.byte(STATUS_POWER)?),
            volume: response.byte(STATUS_VOLUME)?,
            mute: response.byte(STATUS_MUTE)? == 0x01,
            input: InputCode::new(response.byte(STATUS_INPUT)?),
            aspect: response.byte(STATUS_ASPECT)?,
            on_timer: response.byte(STATUS_ON_TIMER)?,
            off_timer: response.byte(STATUS_OFF_TIMER)?,
        })
    }
}

/// Device-reported fault flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultFlags {
    pub lamp: bool,
    pub temperature: bool,
    pub bright_sensor: bool,
    /// No video sync on the current input
    pub no_sync: bool,
    pub fan: bool,
}

impl FaultFlags {
    pub fn any(&self) -> bool {
        self.lamp || self.temperature || self.bright_sensor || self.no_sync || self.fan
    }
}

/// Extended (error) status report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtendedStatus {
    pub faults: FaultFlags,
    /// Raw temperature reading; units are not documented
    pub current_temperature: u8,
}

impl ExtendedStatus {
    pub fn decode(response: &Response<'_>) -> Result<Self, FrameError> {
        response.expect(CMD_EXTENDED_STATUS)?;
        let flag = |offset| response.byte(offset).map(|b| b == 0x01);
        Ok(Self {
            faults: FaultFlags {
                lamp: flag(EXT_LAMP)?,
                temperature: flag(EXT_TEMPERATURE)?,
                bright_sensor: flag(EXT_BRIGHT_SENSOR)?,
                no_sync: flag(EXT_NO_SYNC)?,
                fan: flag(EXT_FAN)?,
            },
            current_temperature: response.byte(EXT_CURRENT_TEMP)?,
        })
    }
}

/// Serial number text
pub fn decode_serial_number<'a>(response: &Response<'a>) -> Result<&'a str, FrameError> {
    response.expect(CMD_SERIAL_NUMBER)?;
    let bytes = response.span(DATA_OFFSET, SERIAL_TRAILING)?;
    core::str::from_utf8(bytes).map_err(|_| FrameError::InvalidText)
}

/// Software version text
pub fn decode_software_version<'a>(response: &Response<'a>) -> Result<&'a str, FrameError> {
    response.expect(CMD_SOFTWARE_VERSION)?;
    let bytes = response.span(DATA_OFFSET, 1)?;
    core::str::from_utf8(bytes).map_err(|_| FrameError::InvalidText)
}

/// Power state confirmed by a SetPower acknowledgement
pub fn decode_power_ack(response: &Response<'_>) -> Result<Power, FrameError> {
    response.expect(CMD_POWER)?;
    Ok(Power::from_byte(response.byte(DATA_OFFSET)?))
}

/// Volume confirmed by a SetVolume acknowledgement
pub fn decode_volume_ack(response: &Response<'_>) -> Result<u8, FrameError> {
    response.expect(CMD_VOLUME)?;
    response.byte(DATA_OFFSET)
}

/// Input confirmed by a SetInput acknowledgement
pub fn decode_input_ack(response: &Response<'_>) -> Result<InputCode, FrameError> {
    response.expect(CMD_INPUT_SOURCE)?;
    Ok(InputCode::new(response.byte(DATA_OFFSET)?))
}

/// IR remote state from either a get or a set acknowledgement
pub fn decode_ir_remote(response: &Response<'_>) -> Result<IrRemote, FrameError> {
    response.expect(CMD_IR_REMOTE)?;
    Ok(IrRemote::from_byte(response.byte(DATA_OFFSET)?))
}

/// Clear-menu acknowledgement carries nothing beyond the echo
pub fn decode_clear_menu_ack(response: &Response<'_>) -> Result<(), FrameError> {
    response.expect(CMD_CLEAR_MENU)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_frame(bytes: &[u8]) -> Frame {
        Frame::from_bytes(bytes).unwrap()
    }

    #[test]
    fn test_set_power_frame() {
        let frame = Command::SetPower(Power::On).to_frame(0).unwrap();
        assert_eq!(frame.as_bytes(), &[0xaa, 0x11, 0x00, 0x01, 0x01, 0x13]);
    }

    #[test]
    fn test_status_request_frame() {
        let frame = Command::Status.to_frame(1).unwrap();
        assert_eq!(frame.as_bytes(), &[0xaa, 0x00, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_set_input_frame() {
        let frame = Command::SetInput(InputCode::new(0x21)).to_frame(0).unwrap();
        assert_eq!(frame.as_bytes(), &[0xaa, 0x14, 0x00, 0x01, 0x21, 0x36]);
    }

    #[test]
    fn test_clear_menu_frame() {
        let frame = Command::ClearMenu.to_frame(0).unwrap();
        assert_eq!(frame.as_bytes(), &[0xaa, 0x34, 0x00, 0x01, 0x00, 0x35]);
    }

    #[test]
    fn test_decode_status() {
        let frame = response_frame(&[
            0xaa, 0xff, 0x00, 0x09, 0x41, 0x00, 0x01, 0x00, 0x00, 0x14, 0x10, 0x00, 0x00, 0x6e,
        ]);
        let response = Response::decode(&frame).unwrap();
        let status = DisplayStatus::decode(&response).unwrap();

        assert_eq!(status.power, Power::On);
        assert_eq!(status.volume, 0);
        assert!(!status.mute);
        assert_eq!(status.input, InputCode::new(0x14));
        assert_eq!(status.aspect, 0x10);
    }

    #[test]
    fn test_decode_extended_status() {
        let frame = response_frame(&[
            0xaa, 0xff, 0x01, 0x08, 0x41, 0x0d, 0x00, 0x00, 0x02, 0x00, 0x36, 0x00, 0x8e,
        ]);
        let response = Response::decode(&frame).unwrap();
        let status = ExtendedStatus::decode(&response).unwrap();

        assert_eq!(status.faults, FaultFlags::default());
        assert!(!status.faults.any());
        assert_eq!(status.current_temperature, 0x36);
    }

    #[test]
    fn test_decode_status_wrong_command() {
        let frame = response_frame(&[0xaa, 0xff, 0x00, 0x03, 0x41, 0x11, 0x00, 0x54]);
        let response = Response::decode(&frame).unwrap();
        assert_eq!(
            DisplayStatus::decode(&response),
            Err(FrameError::UnexpectedCommand {
                expected: CMD_STATUS,
                actual: CMD_POWER
            })
        );
    }

    #[test]
    fn test_decode_power_ack() {
        let frame = response_frame(&[0xaa, 0xff, 0x00, 0x03, 0x41, 0x11, 0x00, 0x54]);
        let response = Response::decode(&frame).unwrap();
        assert_eq!(decode_power_ack(&response), Ok(Power::Off));
    }

    #[test]
    fn test_decode_ir_remote() {
        let frame = response_frame(&[0xaa, 0xff, 0x00, 0x03, 0x41, 0x36, 0x01, 0x7a]);
        let response = Response::decode(&frame).unwrap();
        assert_eq!(decode_ir_remote(&response), Ok(IrRemote::Enabled));
    }

    #[test]
    fn test_decode_software_version() {
        let frame = Frame::encode(0xff, 0x00, &[b'A', CMD_SOFTWARE_VERSION, b'T', b'-', b'1']).unwrap();
        let response = Response::decode(&frame).unwrap();
        assert_eq!(decode_software_version(&response), Ok("T-1"));
    }

    #[test]
    fn test_decode_serial_number_trims_tail() {
        let frame = Frame::encode(
            0xff,
            0x00,
            &[b'A', CMD_SERIAL_NUMBER, b'S', b'N', b'1', b'2', 0x00, 0x00, 0x00],
        )
        .unwrap();
        let response = Response::decode(&frame).unwrap();
        assert_eq!(decode_serial_number(&response), Ok("SN12"));
    }
}
