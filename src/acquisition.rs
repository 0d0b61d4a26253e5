use log::{debug, info, warn};
use thiserror::Error;
use tokio::time::Instant;

use crate::{
    device::{
        Gnss, GnssError, NmeaMask, QzssNmeaMode,
        modem::{FunctionalMode, Modem, ModemError},
    },
    pipeline::handler::EventHandler,
    settings::{Settings, TrackingMode},
    utils::{nmea_mask_to_string, use_case_to_string},
};

/// Fatal acquisition setup failure. Names the failing step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcquisitionError {
    #[error("failed to activate GNSS functional mode: {0}")]
    FunctionalMode(ModemError),

    #[error("failed to set GNSS event handler: {0}")]
    EventHandler(GnssError),

    #[error("failed to set GNSS NMEA mask: {0}")]
    NmeaMask(GnssError),

    #[error("failed to set elevation threshold: {0}")]
    ElevationThreshold(GnssError),

    #[error("failed to set power saving mode: {0}")]
    PowerMode(GnssError),

    #[error("failed to set GNSS fix retry: {0}")]
    FixRetry(GnssError),

    #[error("failed to set GNSS fix interval: {0}")]
    FixInterval(GnssError),

    #[error("failed to start GNSS: {0}")]
    Start(GnssError),
}

/// Configures the receiver according to [Settings], registers
/// the [EventHandler] and starts tracking.
/// Returns the instant tracking started, baseline of the "last fix" time.
pub fn init_and_start<M: Modem, G: Gnss>(
    settings: &Settings,
    modem: &mut M,
    gnss: &mut G,
    handler: EventHandler,
) -> Result<Instant, AcquisitionError> {
    modem
        .set_functional_mode(FunctionalMode::ActivateGnss)
        .map_err(AcquisitionError::FunctionalMode)?;

    gnss.set_event_handler(handler)
        .map_err(AcquisitionError::EventHandler)?;

    let mask = NmeaMask::all();
    debug!("NMEA mask: {}", nmea_mask_to_string(mask));

    gnss.set_nmea_mask(mask)
        .map_err(AcquisitionError::NmeaMask)?;

    // QZSS satellites only become visible with custom numbering
    if let Err(e) = gnss.set_qzss_nmea_mode(QzssNmeaMode::Custom) {
        warn!("Failed to enable custom QZSS NMEA mode: {}", e);
    }

    let use_case = settings.use_case();
    debug!("use case: {}", use_case_to_string(use_case));

    if let Err(e) = gnss.set_use_case(use_case) {
        warn!("Failed to set GNSS use case: {}", e);
    }

    if let Some(elevation) = settings.elevation_threshold {
        debug!("elevation threshold: {} deg", elevation);
        gnss.set_elevation_threshold(elevation)
            .map_err(AcquisitionError::ElevationThreshold)?;
    }

    if let Some(power_mode) = settings.power_mode() {
        debug!("power mode: {:?}", power_mode);
        gnss.set_power_mode(power_mode)
            .map_err(AcquisitionError::PowerMode)?;
    }

    let (retry, interval) = (settings.fix_retry(), settings.fix_interval());
    debug!("fix retry: {} s, fix interval: {} s", retry, interval);

    gnss.set_fix_retry(retry)
        .map_err(AcquisitionError::FixRetry)?;

    gnss.set_fix_interval(interval)
        .map_err(AcquisitionError::FixInterval)?;

    gnss.start().map_err(AcquisitionError::Start)?;

    match settings.mode {
        TrackingMode::Continuous => info!("Continuous tracking started"),
        TrackingMode::Periodic { interval, timeout } => {
            info!(
                "Periodic tracking started (interval {} s, timeout {} s)",
                interval, timeout
            );
        },
    }

    Ok(Instant::now())
}
