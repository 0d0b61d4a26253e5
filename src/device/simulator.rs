//! Simulated modem and positioning receiver, for hosts without cellular hardware.
//!
//! The receiver reports "searching" for a configurable time, while its
//! satellite list grows, then reports valid fixes wandering around
//! the configured position. Each PVT notification is followed by
//! the NMEA sentences selected by the mask.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use hifitime::prelude::Epoch;
use log::{debug, info};

use tokio::{
    task::JoinHandle,
    time::{Duration, Instant, MissedTickBehavior, interval},
};

use crate::{
    device::{
        Event, Gnss, GnssError, NmeaMask, PowerMode, QzssNmeaMode, Readout, UseCase,
        modem::{FunctionalMode, Modem, ModemError},
    },
    pipeline::{handler::EventHandler, sentence::RawSentence},
    pvt::{DateTime, FixSample, MAX_SATELLITES, PvtFlags, SatelliteInfo, Signal, SvFlags},
};

mod nmea;

/// Minimal number of satellites for a fix
const MIN_SATELLITES_IN_FIX: u8 = 4;

/// QZSS satellite, only visible with custom numbering
const QZSS_SV: u16 = 194;

/// Simulated sky: (sv, signal, elevation, azimuth, C/N0)
const SKY: [(u16, Signal, i16, i16, u16); MAX_SATELLITES] = [
    (5, Signal::GpsL1Ca, 67, 112, 44),
    (12, Signal::GpsL1Ca, 48, 301, 41),
    (25, Signal::GpsL1Ca, 35, 45, 39),
    (29, Signal::GpsL1Ca, 22, 190, 36),
    (18, Signal::GpsL1Ca, 58, 250, 42),
    (QZSS_SV, Signal::QzssL1Ca, 14, 160, 31),
    (31, Signal::GpsL1Ca, 8, 340, 28),
    (2, Signal::GpsL1Ca, 41, 78, 40),
    (20, Signal::GpsL1Ca, 27, 12, 37),
    (15, Signal::GpsL1Ca, 5, 222, 25),
    (23, Signal::GpsL1Ca, 63, 145, 43),
    (10, Signal::GpsL1Ca, 18, 275, 33),
];

/// Unhealthy simulated satellite
const UNHEALTHY_SV: u16 = 29;

/// Fix notification code
const EVT_FIX: u32 = 2;

/// Sleep after fix notification code (periodic tracking)
const EVT_SLEEP_AFTER_FIX: u32 = 9;

/// Injected read-out failure code (I/O error)
const EIO: i32 = -5;

/// Canned modem identity
const IMEI_RESPONSE: &str = "+CGSN: \"352656100367872\"\r\nOK\r\n";
const ICCID_RESPONSE: &str = "+CCID: 89882806660004909182\r\nOK\r\n";
const FIRMWARE_RESPONSE: &str = "mfw_nrf9160_1.3.7\r\nOK\r\n";

/// Simulation settings
#[derive(Debug, Clone, PartialEq)]
pub struct SimSettings {
    /// Time to first fix
    pub search: Duration,

    /// Simulated latitude (decimal degrees)
    pub latitude: f64,

    /// Simulated longitude (decimal degrees)
    pub longitude: f64,

    /// One read-out out of `fail_every` fails, when defined
    pub fail_every: Option<u32>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            search: Duration::from_secs(10),
            latitude: 59.3293,
            longitude: 18.0686,
            fail_every: None,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    /// Modem library initialized
    initialized: AtomicBool,

    /// Receiver powered
    gnss_powered: AtomicBool,
}

/// Simulated modem and receiver pair
pub struct Simulator;

impl Simulator {
    /// Builds a modem and its positioning receiver
    pub fn new(settings: SimSettings) -> (SimModem, SimGnss) {
        let shared = Arc::new(Shared::default());

        let modem = SimModem {
            shared: shared.clone(),
        };

        let gnss = SimGnss {
            shared,
            readout: Arc::new(SimReadout::new(settings.fail_every)),
            settings,
            handler: None,
            mask: NmeaMask::default(),
            qzss: QzssNmeaMode::default(),
            use_case: UseCase::empty(),
            elevation: 5,
            power_mode: PowerMode::default(),
            retry: 0,
            interval: 1,
            task: None,
        };

        (modem, gnss)
    }
}

#[derive(Debug)]
pub struct SimModem {
    shared: Arc<Shared>,
}

impl SimModem {
    fn initialized(&self) -> Result<(), ModemError> {
        if self.shared.initialized.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(ModemError::Library(-1))
        }
    }
}

impl Modem for SimModem {
    fn init(&mut self) -> Result<(), ModemError> {
        self.shared.initialized.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), ModemError> {
        self.initialized()?;
        self.shared.gnss_powered.store(false, Ordering::Relaxed);
        self.shared.initialized.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn set_functional_mode(&mut self, mode: FunctionalMode) -> Result<(), ModemError> {
        self.initialized()?;

        let powered = mode == FunctionalMode::ActivateGnss;
        self.shared.gnss_powered.store(powered, Ordering::Relaxed);

        debug!("modem functional mode: {:?}", mode);
        Ok(())
    }

    fn at_command(&mut self, cmd: &str) -> Result<String, ModemError> {
        self.initialized()?;

        match cmd {
            "AT+CGSN=1" => Ok(IMEI_RESPONSE.to_string()),
            "AT+CCID" => Ok(ICCID_RESPONSE.to_string()),
            "AT+CGMR" => Ok(FIRMWARE_RESPONSE.to_string()),
            _ => Err(ModemError::Transport(-8)),
        }
    }

    fn firmware_version(&mut self) -> Result<String, ModemError> {
        let response = self.at_command("AT+CGMR")?;

        response
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .ok_or(ModemError::Parse("firmware version"))
    }
}

/// Simulated receiver read-out buffers
#[derive(Debug)]
pub struct SimReadout {
    /// Latest solution
    frame: Mutex<FixSample>,

    /// Pending sentences
    sentences: Mutex<VecDeque<String>>,

    /// Read-outs so far
    reads: AtomicU32,

    fail_every: Option<u32>,
}

impl SimReadout {
    fn new(fail_every: Option<u32>) -> Self {
        Self {
            fail_every,
            frame: Mutex::new(FixSample::default()),
            sentences: Mutex::new(VecDeque::new()),
            reads: AtomicU32::new(0),
        }
    }

    /// Counts one read-out, returns true when it should fail
    fn fails(&self) -> bool {
        let reads = self.reads.fetch_add(1, Ordering::Relaxed) + 1;
        match self.fail_every {
            Some(n) if n > 0 => reads % n == 0,
            _ => false,
        }
    }
}

impl Readout for SimReadout {
    fn read_pvt(&self, frame: &mut FixSample) -> Result<(), GnssError> {
        if self.fails() {
            return Err(GnssError::Code(EIO));
        }

        *frame = self
            .frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Ok(())
    }

    fn read_nmea(&self, sentence: &mut RawSentence) -> Result<(), GnssError> {
        let next = self
            .sentences
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or(GnssError::NoData(-11))?;

        // consumed either way
        if self.fails() {
            return Err(GnssError::Code(EIO));
        }

        sentence.fill(next.as_bytes());
        Ok(())
    }
}

/// Simulated solution engine
#[derive(Debug, Clone)]
struct Engine {
    settings: SimSettings,
    mask: NmeaMask,
    qzss: QzssNmeaMode,
    use_case: UseCase,
    elevation: u8,
    interval: u16,
}

impl Engine {
    /// Solution `elapsed` after start, at UTC `epoch`
    fn solve(&self, elapsed: Duration, epoch: Option<Epoch>) -> FixSample {
        let mut pvt = FixSample::default();

        let secs = elapsed.as_secs();
        let searching = elapsed < self.settings.search;

        // one more satellite every other second
        let visible = (1 + secs as usize / 2).min(MAX_SATELLITES);

        let mut slot = 0;
        let mut in_fix = 0;

        for (sv, signal, elevation, azimuth, cn0) in SKY.iter().take(visible) {
            if *sv == QZSS_SV && self.qzss != QzssNmeaMode::Custom {
                continue;
            }

            let mut flags = SvFlags::empty();

            if *sv == UNHEALTHY_SV {
                flags = flags | SvFlags::UNHEALTHY;
            } else if !searching && *elevation >= self.elevation as i16 {
                flags = flags | SvFlags::USED_IN_FIX;
                in_fix += 1;
            }

            pvt.sv[slot] = SatelliteInfo {
                sv: *sv,
                signal: *signal,
                cn0: *cn0,
                elevation: *elevation,
                azimuth: *azimuth,
                flags,
            };

            slot += 1;
        }

        if let Some(epoch) = epoch {
            pvt.datetime = DateTime::from_epoch(epoch);
            pvt.flags |= PvtFlags::LEAP_SECOND_VALID;
        }

        if self.interval > 1 {
            pvt.flags |= PvtFlags::SLEEP_BETWEEN_PVT;
        }

        if searching
            && self.interval > 1
            && !self.use_case.intersects(UseCase::SCHED_DOWNLOAD_DISABLE)
        {
            pvt.flags |= PvtFlags::SCHED_DOWNLOAD;
        }

        if in_fix < MIN_SATELLITES_IN_FIX {
            return pvt;
        }

        // slow circular wander, about 20 m wide
        let phase = secs as f64 / 60.0;
        let low_accuracy = self.use_case.intersects(UseCase::LOW_ACCURACY);

        pvt.flags |= PvtFlags::FIX_VALID;
        pvt.flags |= PvtFlags::VELOCITY_VALID;

        pvt.latitude = self.settings.latitude + 1.0E-4 * phase.sin();
        pvt.longitude = self.settings.longitude + 1.0E-4 * phase.cos();
        pvt.altitude = 28.5;
        pvt.accuracy = (if low_accuracy { 25.0 } else { 4.0 }) + 8.0 / in_fix as f32;
        pvt.altitude_accuracy = 2.0 * pvt.accuracy;
        pvt.speed = 0.2;
        pvt.speed_accuracy = 0.5;
        pvt.vertical_speed = 0.0;
        pvt.vertical_speed_accuracy = 0.8;
        pvt.heading = ((phase.to_degrees() + 90.0) % 360.0) as f32;
        pvt.heading_accuracy = 12.0;

        pvt.pdop = 1.0 + 6.0 / in_fix as f32;
        pvt.hdop = 0.8 * pvt.pdop;
        pvt.vdop = 1.2 * pvt.pdop;
        pvt.tdop = 0.6 * pvt.pdop;

        pvt
    }

    /// Notifications raised for one solution followed by `sentences` NMEA sentences
    fn notifications(&self, pvt: &FixSample, sentences: usize) -> Vec<Event> {
        let valid = pvt.is_valid();
        let mut events = vec![Event::Pvt];

        if valid {
            events.push(Event::Other(EVT_FIX));
        }

        events.extend(std::iter::repeat_n(Event::Nmea, sentences));

        if valid && self.interval > 1 {
            events.push(Event::Other(EVT_SLEEP_AFTER_FIX));
        }

        events
    }

    /// Publishes one solution, then its NMEA sentences
    fn step(&self, elapsed: Duration, readout: &SimReadout, handler: &EventHandler) {
        let pvt = self.solve(elapsed, Epoch::now().ok());
        let sentences = nmea::sentences(&pvt, self.mask);
        let events = self.notifications(&pvt, sentences.len());

        *readout.frame.lock().unwrap_or_else(PoisonError::into_inner) = pvt;

        // sentences nobody read out are overwritten
        readout
            .sentences
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let mut sentences = sentences.into_iter();

        for event in events {
            if event == Event::Nmea {
                if let Some(sentence) = sentences.next() {
                    readout
                        .sentences
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push_back(sentence);
                }
            }

            handler.handle(event, readout);
        }
    }
}

/// Simulated positioning receiver
#[derive(Debug)]
pub struct SimGnss {
    shared: Arc<Shared>,
    readout: Arc<SimReadout>,
    settings: SimSettings,
    handler: Option<EventHandler>,
    mask: NmeaMask,
    qzss: QzssNmeaMode,
    use_case: UseCase,
    elevation: u8,
    power_mode: PowerMode,
    retry: u16,
    interval: u16,
    task: Option<JoinHandle<()>>,
}

impl SimGnss {
    fn stopped(&self) -> Result<(), GnssError> {
        if self.task.is_some() {
            Err(GnssError::NotPermitted(-1))
        } else {
            Ok(())
        }
    }

    fn engine(&self) -> Engine {
        Engine {
            settings: self.settings.clone(),
            mask: self.mask,
            qzss: self.qzss,
            use_case: self.use_case,
            elevation: self.elevation,
            interval: self.interval,
        }
    }

    /// True while tracking
    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Gnss for SimGnss {
    fn set_event_handler(&mut self, handler: EventHandler) -> Result<(), GnssError> {
        self.handler = Some(handler);
        Ok(())
    }

    fn set_nmea_mask(&mut self, mask: NmeaMask) -> Result<(), GnssError> {
        self.stopped()?;
        self.mask = mask;
        Ok(())
    }

    fn set_qzss_nmea_mode(&mut self, mode: QzssNmeaMode) -> Result<(), GnssError> {
        self.stopped()?;
        self.qzss = mode;
        Ok(())
    }

    fn set_use_case(&mut self, use_case: UseCase) -> Result<(), GnssError> {
        self.stopped()?;
        self.use_case = use_case;
        Ok(())
    }

    fn set_elevation_threshold(&mut self, angle: u8) -> Result<(), GnssError> {
        self.stopped()?;
        if angle > 90 {
            return Err(GnssError::InvalidArgument(-22));
        }
        self.elevation = angle;
        Ok(())
    }

    fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), GnssError> {
        self.stopped()?;
        self.power_mode = mode;
        Ok(())
    }

    fn set_fix_retry(&mut self, retry: u16) -> Result<(), GnssError> {
        self.stopped()?;
        self.retry = retry;
        Ok(())
    }

    fn set_fix_interval(&mut self, interval: u16) -> Result<(), GnssError> {
        self.stopped()?;
        // 0: single fix, 1: continuous, 10 and above: periodic
        if interval == 0 || (2..10).contains(&interval) {
            return Err(GnssError::InvalidArgument(-22));
        }
        self.interval = interval;
        Ok(())
    }

    fn start(&mut self) -> Result<(), GnssError> {
        self.stopped()?;

        if !self.shared.gnss_powered.load(Ordering::Relaxed) {
            return Err(GnssError::NotPermitted(-1));
        }

        let handler = self.handler.clone().ok_or(GnssError::NotPermitted(-1))?;

        let engine = self.engine();
        let readout = self.readout.clone();
        let period = Duration::from_secs(self.interval as u64);

        info!(
            "Simulated receiver started (fix in {} s, power mode {:?}, retry {} s)",
            self.settings.search.as_secs(),
            self.power_mode,
            self.retry
        );

        self.task = Some(tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                engine.step(started.elapsed(), &readout, &handler);
            }
        }));

        Ok(())
    }

    fn stop(&mut self) -> Result<(), GnssError> {
        let task = self.task.take().ok_or(GnssError::NotPermitted(-1))?;
        task.abort();
        info!("Simulated receiver stopped");
        Ok(())
    }
}
