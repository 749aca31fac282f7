// Byte vocabulary shared with the motor-control board.
// Every transaction is one byte out, one byte back.

/// Host -> board: request status, no side effect
pub const POLL_COMMAND: u8 = 0;
/// Host -> board: stop the fan and home the servo to center
pub const RESET_COMMAND: u8 = 200;
/// Host -> board: start the fan (honoured only while the board reports Ready)
pub const START_COMMAND: u8 = 255;

/// Lowest byte the board accepts as an angle command
pub const ANGLE_COMMAND_MIN: u8 = 10;
/// Highest byte the board accepts as an angle command
pub const ANGLE_COMMAND_MAX: u8 = 170;

/// Board -> host: fan off, servo at center, user pressed the start button
pub const STATUS_READY: u8 = 111;
/// Board -> host: fan running, angle commands are followed
pub const STATUS_RUNNING: u8 = 222;
/// Board -> host: fan stopped or servo still homing
pub const STATUS_HOMING_OFF: u8 = 0;

/// A single host -> board command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Poll,
    Reset,
    Start,
    Angle(u8),
}

impl Command {
    /// Build an angle command, rejecting bytes outside the board's angle window.
    pub fn angle(degrees: u8) -> Option<Command> {
        if (ANGLE_COMMAND_MIN..=ANGLE_COMMAND_MAX).contains(&degrees) {
            Some(Command::Angle(degrees))
        } else {
            None
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Command::Poll => POLL_COMMAND,
            Command::Reset => RESET_COMMAND,
            Command::Start => START_COMMAND,
            Command::Angle(degrees) => degrees,
        }
    }
}

/// Decoded board -> host status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Ready,
    Running,
    HomingOff,
    Unknown(u8),
}

impl LinkStatus {
    pub fn from_byte(byte: u8) -> LinkStatus {
        match byte {
            STATUS_READY => LinkStatus::Ready,
            STATUS_RUNNING => LinkStatus::Running,
            STATUS_HOMING_OFF => LinkStatus::HomingOff,
            other => LinkStatus::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            LinkStatus::Ready => STATUS_READY,
            LinkStatus::Running => STATUS_RUNNING,
            LinkStatus::HomingOff => STATUS_HOMING_OFF,
            LinkStatus::Unknown(byte) => byte,
        }
    }
}
