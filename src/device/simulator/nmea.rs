//! NMEA-0183 sentences, generated from simulated [FixSample]s

use itertools::Itertools;

use crate::{
    device::NmeaMask,
    pvt::{FixSample, SvFlags},
};

/// Satellites per GSV message
const GSV_SATELLITES: usize = 4;

/// 1 m/s in knots
const KNOTS: f32 = 1.943_844;

/// XOR of every byte between '$' and '*'
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

/// Frames `body` as a complete sentence
pub fn frame(body: &str) -> String {
    format!("${}*{:02X}\r\n", body, checksum(body))
}

/// Formats a coordinate as (d)ddmm.mmmm with its hemisphere
fn coordinate(value: f64, latitude: bool) -> String {
    let hemisphere = match (latitude, value >= 0.0) {
        (true, true) => 'N',
        (true, false) => 'S',
        (false, true) => 'E',
        (false, false) => 'W',
    };

    let value = value.abs();
    let degrees = value.trunc();
    let minutes = (value - degrees) * 60.0;

    if latitude {
        format!("{:02}{:07.4},{}", degrees as u32, minutes, hemisphere)
    } else {
        format!("{:03}{:07.4},{}", degrees as u32, minutes, hemisphere)
    }
}

fn time(pvt: &FixSample) -> String {
    let dt = &pvt.datetime;
    format!(
        "{:02}{:02}{:02}.{:02}",
        dt.hour,
        dt.minute,
        dt.seconds,
        dt.ms / 10
    )
}

fn position(pvt: &FixSample) -> String {
    if pvt.is_valid() {
        format!(
            "{},{}",
            coordinate(pvt.latitude, true),
            coordinate(pvt.longitude, false)
        )
    } else {
        ",,,".to_string()
    }
}

pub fn gga(pvt: &FixSample) -> String {
    let stats = pvt.satellite_stats();

    let body = if pvt.is_valid() {
        format!(
            "GPGGA,{},{},1,{:02},{:.1},{:.1},M,,M,,",
            time(pvt),
            position(pvt),
            stats.in_fix,
            pvt.hdop,
            pvt.altitude
        )
    } else {
        format!("GPGGA,{},{},0,{:02},,,M,,M,,", time(pvt), position(pvt), stats.in_fix)
    };

    frame(&body)
}

pub fn gll(pvt: &FixSample) -> String {
    let (status, mode) = if pvt.is_valid() {
        ('A', 'A')
    } else {
        ('V', 'N')
    };

    frame(&format!(
        "GPGLL,{},{},{},{}",
        position(pvt),
        time(pvt),
        status,
        mode
    ))
}

pub fn gsa(pvt: &FixSample) -> String {
    let used = pvt
        .sv
        .iter()
        .filter(|sat| sat.sv > 0 && sat.flags.intersects(SvFlags::USED_IN_FIX))
        .map(|sat| format!("{:02}", sat.sv))
        .pad_using(12, |_| String::new())
        .take(12)
        .join(",");

    let body = if pvt.is_valid() {
        format!(
            "GPGSA,A,3,{},{:.1},{:.1},{:.1}",
            used, pvt.pdop, pvt.hdop, pvt.vdop
        )
    } else {
        format!("GPGSA,A,1,{},,,", used)
    };

    frame(&body)
}

/// Satellites in view, split over as many messages as required
pub fn gsv(pvt: &FixSample) -> Vec<String> {
    let tracked = pvt
        .sv
        .iter()
        .filter(|sat| sat.sv > 0)
        .collect::<Vec<_>>();

    if tracked.is_empty() {
        return vec![frame("GPGSV,1,1,00")];
    }

    let total = tracked.len().div_ceil(GSV_SATELLITES);

    tracked
        .chunks(GSV_SATELLITES)
        .enumerate()
        .map(|(i, chunk)| {
            let satellites = chunk
                .iter()
                .map(|sat| {
                    format!(
                        "{:02},{:02},{:03},{:02}",
                        sat.sv, sat.elevation, sat.azimuth, sat.cn0
                    )
                })
                .join(",");

            frame(&format!(
                "GPGSV,{},{},{:02},{}",
                total,
                i + 1,
                tracked.len(),
                satellites
            ))
        })
        .collect()
}

pub fn rmc(pvt: &FixSample) -> String {
    let dt = &pvt.datetime;
    let date = format!("{:02}{:02}{:02}", dt.day, dt.month, dt.year % 100);

    let body = if pvt.is_valid() {
        format!(
            "GPRMC,{},A,{},{:.1},{:.1},{},,,A",
            time(pvt),
            position(pvt),
            pvt.speed * KNOTS,
            pvt.heading,
            date
        )
    } else {
        format!("GPRMC,{},V,{},,,{},,,N", time(pvt), position(pvt), date)
    };

    frame(&body)
}

/// Every sentence selected by the [NmeaMask], in emission order
pub fn sentences(pvt: &FixSample, mask: NmeaMask) -> Vec<String> {
    let mut sentences = Vec::new();

    if mask.intersects(NmeaMask::GGA) {
        sentences.push(gga(pvt));
    }
    if mask.intersects(NmeaMask::GLL) {
        sentences.push(gll(pvt));
    }
    if mask.intersects(NmeaMask::GSA) {
        sentences.push(gsa(pvt));
    }
    if mask.intersects(NmeaMask::GSV) {
        sentences.extend(gsv(pvt));
    }
    if mask.intersects(NmeaMask::RMC) {
        sentences.push(rmc(pvt));
    }

    sentences
}
