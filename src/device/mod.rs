use thiserror::Error;

use crate::{
    pipeline::{handler::EventHandler, sentence::RawSentence},
    pvt::FixSample,
};

pub mod modem;
pub mod simulator;

#[cfg(test)]
pub mod mock;

/// Receiver notifications
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
    /// New PVT frame available
    Pvt,

    /// New NMEA sentence available
    Nmea,

    /// Any other notification, identified by its raw code
    Other(u32),
}

/// Positioning subsystem failure, carrying the code returned by the subsystem.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum GnssError {
    #[error("invalid argument (code {0})")]
    InvalidArgument(i32),

    #[error("operation not permitted in current state (code {0})")]
    NotPermitted(i32),

    #[error("no data available (code {0})")]
    NoData(i32),

    #[error("positioning subsystem error (code {0})")]
    Code(i32),
}

/// Bitmask of NMEA sentences the receiver should emit
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct NmeaMask(u16);

impl NmeaMask {
    pub const GGA: Self = Self(0x01);
    pub const GLL: Self = Self(0x02);
    pub const GSA: Self = Self(0x04);
    pub const GSV: Self = Self(0x08);
    pub const RMC: Self = Self(0x10);

    /// Every sentence this application subscribes to
    pub const fn all() -> Self {
        Self(Self::GGA.0 | Self::GLL.0 | Self::GSA.0 | Self::GSV.0 | Self::RMC.0)
    }

    pub const fn intersects(&self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

/// Use case bitmask
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct UseCase(u8);

impl UseCase {
    /// Multiple hot starts performance mode, always set
    pub const MULTIPLE_HOT_START: Self = Self(0x01);

    /// Low accuracy fixes allowed
    pub const LOW_ACCURACY: Self = Self(0x02);

    /// Scheduled navigation data downloads disabled
    pub const SCHED_DOWNLOAD_DISABLE: Self = Self(0x04);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn intersects(&self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOrAssign for UseCase {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Receiver power saving mode (continuous tracking only)
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum PowerMode {
    #[default]
    Disabled,

    /// Duty cycling, performance oriented
    DutyCyclingPerformance,

    /// Duty cycling, power oriented
    DutyCyclingPower,
}

/// QZSS satellite numbering in NMEA output
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum QzssNmeaMode {
    /// Standard NMEA, QZSS satellites are not reported
    #[default]
    Standard,

    /// Custom numbering, QZSS satellites become visible
    Custom,
}

/// Read-out access to the receiver data. The [EventHandler] is handed
/// this interface on every notification.
pub trait Readout {
    /// Reads the latest PVT frame into `frame`
    fn read_pvt(&self, frame: &mut FixSample) -> Result<(), GnssError>;

    /// Reads the pending NMEA sentence into `sentence`
    fn read_nmea(&self, sentence: &mut RawSentence) -> Result<(), GnssError>;
}

/// Positioning subsystem control interface
pub trait Gnss {
    /// Registers the [EventHandler] notified on each receiver event
    fn set_event_handler(&mut self, handler: EventHandler) -> Result<(), GnssError>;

    fn set_nmea_mask(&mut self, mask: NmeaMask) -> Result<(), GnssError>;

    fn set_qzss_nmea_mode(&mut self, mode: QzssNmeaMode) -> Result<(), GnssError>;

    fn set_use_case(&mut self, use_case: UseCase) -> Result<(), GnssError>;

    /// Minimal satellite elevation (degrees) for use in fix
    fn set_elevation_threshold(&mut self, angle: u8) -> Result<(), GnssError>;

    fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), GnssError>;

    /// Fix retry timeout (s), 0 means no limit
    fn set_fix_retry(&mut self, retry: u16) -> Result<(), GnssError>;

    /// Fix interval (s), 1 means continuous tracking
    fn set_fix_interval(&mut self, interval: u16) -> Result<(), GnssError>;

    fn start(&mut self) -> Result<(), GnssError>;

    fn stop(&mut self) -> Result<(), GnssError>;
}
