use hifitime::prelude::Epoch;

/// Maximal number of satellites reported in a single PVT frame
pub const MAX_SATELLITES: usize = 12;

/// PVT frame status flags, as reported by the receiver
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PvtFlags(u8);

impl PvtFlags {
    /// Position, velocity and time solution is valid
    pub const FIX_VALID: Self = Self(0x01);

    /// Leap second is known
    pub const LEAP_SECOND_VALID: Self = Self(0x02);

    /// Receiver sleeps in between two PVT notifications
    pub const SLEEP_BETWEEN_PVT: Self = Self(0x04);

    /// GNSS operation was blocked by LTE activity
    pub const DEADLINE_MISSED: Self = Self(0x08);

    /// Not enough time windows were granted to the receiver
    pub const NOT_ENOUGH_WINDOW_TIME: Self = Self(0x10);

    /// Velocity estimate is valid
    pub const VELOCITY_VALID: Self = Self(0x20);

    /// Receiver is downloading navigation data
    pub const SCHED_DOWNLOAD: Self = Self(0x40);

    #[cfg(test)]
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn intersects(&self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for PvtFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for PvtFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Per satellite flags
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SvFlags(u8);

impl SvFlags {
    /// Satellite contributes to the current fix
    pub const USED_IN_FIX: Self = Self(0x02);

    /// Satellite is flagged unhealthy
    pub const UNHEALTHY: Self = Self(0x08);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn intersects(&self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for SvFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Signal being tracked
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Signal {
    #[default]
    None,
    GpsL1Ca,
    QzssL1Ca,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::GpsL1Ca => write!(f, "GPS L1C/A"),
            Self::QzssL1Ca => write!(f, "QZSS L1C/A"),
        }
    }
}

/// Tracking state of one satellite
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct SatelliteInfo {
    /// Satellite number, 0 means unused slot
    pub sv: u16,

    /// Tracked [Signal]
    pub signal: Signal,

    /// Carrier to noise density ratio (0.1 dB-Hz)
    pub cn0: u16,

    /// Elevation (degrees)
    pub elevation: i16,

    /// Azimuth (degrees)
    pub azimuth: i16,

    /// [SvFlags]
    pub flags: SvFlags,
}

/// UTC date and time of the solution
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub seconds: u8,
    pub ms: u16,
}

impl DateTime {
    /// Builds [DateTime] from UTC [Epoch]
    pub fn from_epoch(t: Epoch) -> Self {
        let (year, month, day, hour, minute, seconds, nanos) = t.to_gregorian_utc();
        Self {
            year: year as u16,
            month,
            day,
            hour,
            minute,
            seconds,
            ms: (nanos / 1_000_000) as u16,
        }
    }

    /// Converts to UTC [Epoch], when date and time are consistent.
    #[cfg(test)]
    pub fn to_epoch(&self) -> Option<Epoch> {
        Epoch::maybe_from_gregorian_utc(
            self.year as i32,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.seconds,
            self.ms as u32 * 1_000_000,
        )
        .ok()
    }
}

/// Position Velocity Time solution, as read out of the receiver.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FixSample {
    /// Latitude (decimal degrees)
    pub latitude: f64,

    /// Longitude (decimal degrees)
    pub longitude: f64,

    /// Altitude above WGS-84 ellipsoid (m)
    pub altitude: f32,

    /// Horizontal accuracy (m)
    pub accuracy: f32,

    /// Altitude accuracy (m)
    pub altitude_accuracy: f32,

    /// Horizontal speed (m/s)
    pub speed: f32,

    /// Horizontal speed accuracy (m/s)
    pub speed_accuracy: f32,

    /// Vertical speed (m/s)
    pub vertical_speed: f32,

    /// Vertical speed accuracy (m/s)
    pub vertical_speed_accuracy: f32,

    /// Heading of user movement (degrees)
    pub heading: f32,

    /// Heading accuracy (degrees)
    pub heading_accuracy: f32,

    /// UTC [DateTime] of the solution
    pub datetime: DateTime,

    pub pdop: f32,
    pub hdop: f32,
    pub vdop: f32,
    pub tdop: f32,

    /// [PvtFlags]
    pub flags: PvtFlags,

    /// Satellites tracking state
    pub sv: [SatelliteInfo; MAX_SATELLITES],
}

impl FixSample {
    /// True when this sample carries a valid fix
    pub fn is_valid(&self) -> bool {
        self.flags.intersects(PvtFlags::FIX_VALID)
    }

    /// Summarizes the satellite tracking state
    pub fn satellite_stats(&self) -> SatelliteStats {
        self.sv
            .iter()
            .filter(|sat| sat.sv > 0)
            .fold(SatelliteStats::default(), |mut stats, sat| {
                stats.tracked += 1;
                if sat.flags.intersects(SvFlags::USED_IN_FIX) {
                    stats.in_fix += 1;
                }
                if sat.flags.intersects(SvFlags::UNHEALTHY) {
                    stats.unhealthy += 1;
                }
                stats
            })
    }
}

/// Satellite tracking summary
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SatelliteStats {
    /// Number of satellites being tracked
    pub tracked: u8,

    /// Number of satellites used in the fix
    pub in_fix: u8,

    /// Number of unhealthy satellites
    pub unhealthy: u8,
}

impl std::fmt::Display for SatelliteStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tracking: {:2} Using: {:2} Unhealthy: {}",
            self.tracked, self.in_fix, self.unhealthy
        )
    }
}
