use std::num::ParseFloatError;

use crate::device::{PowerMode, UseCase};

/// Default periodic fix interval (s)
pub const DEFAULT_PERIODIC_INTERVAL: u16 = 120;

/// Default periodic fix retry timeout (s)
pub const DEFAULT_PERIODIC_TIMEOUT: u16 = 120;

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub enum TrackingMode {
    /// One fix per second, no retry limit
    #[default]
    Continuous,

    /// One fix attempt every `interval` seconds,
    /// each attempt limited to `timeout` seconds.
    Periodic { interval: u16, timeout: u16 },
}

/// Assistance data source. This only affects the receiver use case:
/// assistance data are never downloaded nor injected.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub enum Assistance {
    #[default]
    None,
    Agnss,
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub enum PowerSaving {
    #[default]
    Disabled,
    Moderate,
    High,
}

impl From<PowerSaving> for PowerMode {
    fn from(saving: PowerSaving) -> Self {
        match saving {
            PowerSaving::Disabled => Self::Disabled,
            PowerSaving::Moderate => Self::DutyCyclingPerformance,
            PowerSaving::High => Self::DutyCyclingPower,
        }
    }
}

/// Reference position, distances are reported against it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ReferencePoint {
    /// Latitude (decimal degrees)
    pub latitude: f64,

    /// Longitude (decimal degrees)
    pub longitude: f64,
}

impl ReferencePoint {
    /// Builds a [ReferencePoint] from configuration strings.
    /// The reference is only defined when both strings are not empty.
    pub fn from_config(latitude: &str, longitude: &str) -> Result<Option<Self>, ParseFloatError> {
        let (latitude, longitude) = (latitude.trim(), longitude.trim());

        if latitude.is_empty() || longitude.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            latitude: latitude.parse::<f64>()?,
            longitude: longitude.parse::<f64>()?,
        }))
    }
}

/// Acquisition settings
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Settings {
    /// [TrackingMode]
    pub mode: TrackingMode,

    /// [Assistance] mode
    pub assistance: Assistance,

    /// [PowerSaving] level, continuous tracking only
    pub power_saving: PowerSaving,

    /// Accept low accuracy fixes
    pub low_accuracy: bool,

    /// Minimal satellite elevation (degrees)
    pub elevation_threshold: Option<u8>,

    /// Possible [ReferencePoint]
    pub reference: Option<ReferencePoint>,
}

impl Settings {
    /// Receiver [UseCase] to apply
    pub fn use_case(&self) -> UseCase {
        let mut use_case = UseCase::MULTIPLE_HOT_START;

        // scheduled downloads are useless when assistance is provided
        if matches!(self.mode, TrackingMode::Periodic { .. }) && self.assistance != Assistance::None
        {
            use_case |= UseCase::SCHED_DOWNLOAD_DISABLE;
        }

        if self.low_accuracy {
            use_case |= UseCase::LOW_ACCURACY;
        }

        use_case
    }

    /// [PowerMode] to apply, only in continuous tracking mode
    pub fn power_mode(&self) -> Option<PowerMode> {
        match self.mode {
            TrackingMode::Continuous => Some(self.power_saving.into()),
            TrackingMode::Periodic { .. } => None,
        }
    }

    /// Fix retry timeout (s)
    pub fn fix_retry(&self) -> u16 {
        match self.mode {
            TrackingMode::Continuous => 0,
            TrackingMode::Periodic { timeout, .. } => timeout,
        }
    }

    /// Fix interval (s)
    pub fn fix_interval(&self) -> u16 {
        match self.mode {
            TrackingMode::Continuous => 1,
            TrackingMode::Periodic { interval, .. } => interval,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reference_point() {
        assert_eq!(ReferencePoint::from_config("", ""), Ok(None));
        assert_eq!(ReferencePoint::from_config("59.3293", ""), Ok(None));
        assert_eq!(ReferencePoint::from_config(" ", "18.0686"), Ok(None));

        assert_eq!(
            ReferencePoint::from_config("59.3293", "18.0686"),
            Ok(Some(ReferencePoint {
                latitude: 59.3293,
                longitude: 18.0686,
            }))
        );

        assert!(ReferencePoint::from_config("north", "18.0686").is_err());
    }

    #[test]
    fn continuous_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.fix_retry(), 0);
        assert_eq!(settings.fix_interval(), 1);
        assert_eq!(settings.power_mode(), Some(PowerMode::Disabled));
        assert_eq!(settings.use_case(), UseCase::MULTIPLE_HOT_START);
    }

    #[test]
    fn periodic_settings() {
        let mut settings = Settings {
            mode: TrackingMode::Periodic {
                interval: 300,
                timeout: 60,
            },
            power_saving: PowerSaving::High,
            ..Default::default()
        };

        assert_eq!(settings.fix_retry(), 60);
        assert_eq!(settings.fix_interval(), 300);
        assert_eq!(settings.power_mode(), None);

        // no assistance: scheduled downloads are required
        assert!(!settings.use_case().intersects(UseCase::SCHED_DOWNLOAD_DISABLE));

        settings.assistance = Assistance::Agnss;
        assert!(settings.use_case().intersects(UseCase::SCHED_DOWNLOAD_DISABLE));
        assert!(settings.use_case().intersects(UseCase::MULTIPLE_HOT_START));
        assert!(!settings.use_case().intersects(UseCase::LOW_ACCURACY));

        settings.low_accuracy = true;
        assert!(settings.use_case().intersects(UseCase::LOW_ACCURACY));
    }

    #[test]
    fn power_saving_levels() {
        for (saving, mode) in [
            (PowerSaving::Disabled, PowerMode::Disabled),
            (PowerSaving::Moderate, PowerMode::DutyCyclingPerformance),
            (PowerSaving::High, PowerMode::DutyCyclingPower),
        ] {
            let settings = Settings {
                power_saving: saving,
                ..Default::default()
            };
            assert_eq!(settings.power_mode(), Some(mode));
        }
    }
}
