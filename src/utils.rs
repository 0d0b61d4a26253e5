use itertools::Itertools;

use crate::{
    device::{NmeaMask, UseCase},
    pvt::PvtFlags,
};

/// Human readable receiver status, for the console
pub fn pvt_flags_to_string(flags: PvtFlags) -> String {
    let conditions = [
        (PvtFlags::DEADLINE_MISSED, "blocked by LTE"),
        (PvtFlags::NOT_ENOUGH_WINDOW_TIME, "insufficient time windows"),
        (PvtFlags::SLEEP_BETWEEN_PVT, "sleeping between PVT"),
        (PvtFlags::SCHED_DOWNLOAD, "scheduled download"),
    ]
    .into_iter()
    .filter_map(|(flag, label)| flags.intersects(flag).then_some(label))
    .join(", ");

    if conditions.is_empty() {
        "nominal".to_string()
    } else {
        conditions
    }
}

pub fn use_case_to_string(use_case: UseCase) -> String {
    [
        (UseCase::MULTIPLE_HOT_START, "multiple hot starts"),
        (UseCase::LOW_ACCURACY, "low accuracy"),
        (UseCase::SCHED_DOWNLOAD_DISABLE, "scheduled downloads disabled"),
    ]
    .into_iter()
    .filter_map(|(flag, label)| use_case.intersects(flag).then_some(label))
    .join(", ")
}

pub fn nmea_mask_to_string(mask: NmeaMask) -> String {
    [
        (NmeaMask::GGA, "GGA"),
        (NmeaMask::GLL, "GLL"),
        (NmeaMask::GSA, "GSA"),
        (NmeaMask::GSV, "GSV"),
        (NmeaMask::RMC, "RMC"),
    ]
    .into_iter()
    .filter_map(|(flag, label)| mask.intersects(flag).then_some(label))
    .join(", ")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_flags() {
        assert_eq!(pvt_flags_to_string(PvtFlags::empty()), "nominal");
        assert_eq!(pvt_flags_to_string(PvtFlags::FIX_VALID), "nominal");
        assert_eq!(
            pvt_flags_to_string(PvtFlags::DEADLINE_MISSED | PvtFlags::SCHED_DOWNLOAD),
            "blocked by LTE, scheduled download"
        );
    }

    #[test]
    fn masks() {
        assert_eq!(nmea_mask_to_string(NmeaMask::all()), "GGA, GLL, GSA, GSV, RMC");

        let mut use_case = UseCase::MULTIPLE_HOT_START;
        use_case |= UseCase::LOW_ACCURACY;
        assert_eq!(use_case_to_string(use_case), "multiple hot starts, low accuracy");
    }
}
