//! Recording test doubles for the [Modem] and [Gnss] interfaces.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use crate::{
    device::{
        Gnss, GnssError, NmeaMask, PowerMode, QzssNmeaMode, Readout, UseCase,
        modem::{FunctionalMode, Modem, ModemError},
    },
    pipeline::{handler::EventHandler, sentence::RawSentence},
    pvt::FixSample,
};

#[derive(Debug)]
pub struct MockModem {
    pub init_error: Option<ModemError>,
    pub mode_error: Option<ModemError>,
    pub responses: HashMap<&'static str, Result<String, ModemError>>,
    pub commands: Vec<String>,
    pub modes: Vec<FunctionalMode>,
}

impl Default for MockModem {
    fn default() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            "AT+CGSN=1",
            Ok("+CGSN: \"352656100367872\"\r\nOK\r\n".to_string()),
        );
        responses.insert(
            "AT+CCID",
            Ok("+CCID: 89882806660004909182\r\nOK\r\n".to_string()),
        );
        Self {
            responses,
            init_error: None,
            mode_error: None,
            commands: Vec::new(),
            modes: Vec::new(),
        }
    }
}

impl Modem for MockModem {
    fn init(&mut self) -> Result<(), ModemError> {
        match self.init_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn shutdown(&mut self) -> Result<(), ModemError> {
        Ok(())
    }

    fn set_functional_mode(&mut self, mode: FunctionalMode) -> Result<(), ModemError> {
        self.modes.push(mode);
        match self.mode_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn at_command(&mut self, cmd: &str) -> Result<String, ModemError> {
        self.commands.push(cmd.to_string());
        self.responses
            .get(cmd)
            .cloned()
            .unwrap_or(Err(ModemError::Transport(-1)))
    }

    fn firmware_version(&mut self) -> Result<String, ModemError> {
        Ok("mfw_nrf9160_1.3.7".to_string())
    }
}

/// Configuration calls, in order of issuance
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    EventHandler,
    NmeaMask(NmeaMask),
    QzssNmeaMode(QzssNmeaMode),
    UseCase(UseCase),
    ElevationThreshold(u8),
    PowerMode(PowerMode),
    FixRetry(u16),
    FixInterval(u16),
    Start,
    Stop,
}

impl Call {
    fn name(&self) -> &'static str {
        match self {
            Self::EventHandler => "event_handler",
            Self::NmeaMask(_) => "nmea_mask",
            Self::QzssNmeaMode(_) => "qzss_nmea_mode",
            Self::UseCase(_) => "use_case",
            Self::ElevationThreshold(_) => "elevation_threshold",
            Self::PowerMode(_) => "power_mode",
            Self::FixRetry(_) => "fix_retry",
            Self::FixInterval(_) => "fix_interval",
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

#[derive(Debug, Default)]
pub struct MockGnss {
    /// Issued calls, in order
    pub calls: Vec<Call>,

    /// Calls (by name) that should fail
    pub failing: Vec<&'static str>,

    pub handler: Option<EventHandler>,
}

impl MockGnss {
    pub fn failing(names: &[&'static str]) -> Self {
        Self {
            failing: names.to_vec(),
            ..Default::default()
        }
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls.iter().any(|call| call.name() == name)
    }

    fn record(&mut self, call: Call) -> Result<(), GnssError> {
        let name = call.name();
        self.calls.push(call);
        if self.failing.contains(&name) {
            Err(GnssError::Code(-22))
        } else {
            Ok(())
        }
    }
}

impl Gnss for MockGnss {
    fn set_event_handler(&mut self, handler: EventHandler) -> Result<(), GnssError> {
        self.handler = Some(handler);
        self.record(Call::EventHandler)
    }

    fn set_nmea_mask(&mut self, mask: NmeaMask) -> Result<(), GnssError> {
        self.record(Call::NmeaMask(mask))
    }

    fn set_qzss_nmea_mode(&mut self, mode: QzssNmeaMode) -> Result<(), GnssError> {
        self.record(Call::QzssNmeaMode(mode))
    }

    fn set_use_case(&mut self, use_case: UseCase) -> Result<(), GnssError> {
        self.record(Call::UseCase(use_case))
    }

    fn set_elevation_threshold(&mut self, angle: u8) -> Result<(), GnssError> {
        self.record(Call::ElevationThreshold(angle))
    }

    fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), GnssError> {
        self.record(Call::PowerMode(mode))
    }

    fn set_fix_retry(&mut self, retry: u16) -> Result<(), GnssError> {
        self.record(Call::FixRetry(retry))
    }

    fn set_fix_interval(&mut self, interval: u16) -> Result<(), GnssError> {
        self.record(Call::FixInterval(interval))
    }

    fn start(&mut self) -> Result<(), GnssError> {
        self.record(Call::Start)
    }

    fn stop(&mut self) -> Result<(), GnssError> {
        self.record(Call::Stop)
    }
}

/// Scripted [Readout]: each read pops the next scripted result.
#[derive(Debug, Default)]
pub struct MockReadout {
    pub pvt: Mutex<VecDeque<Result<FixSample, GnssError>>>,
    pub nmea: Mutex<VecDeque<Result<String, GnssError>>>,
}

impl MockReadout {
    pub fn push_pvt(&self, frame: Result<FixSample, GnssError>) {
        self.pvt.lock().unwrap().push_back(frame);
    }

    pub fn push_nmea(&self, sentence: Result<&str, GnssError>) {
        self.nmea
            .lock()
            .unwrap()
            .push_back(sentence.map(|s| s.to_string()));
    }
}

impl Readout for MockReadout {
    fn read_pvt(&self, frame: &mut FixSample) -> Result<(), GnssError> {
        let next = self
            .pvt
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GnssError::NoData(-11)))?;
        *frame = next;
        Ok(())
    }

    fn read_nmea(&self, sentence: &mut RawSentence) -> Result<(), GnssError> {
        let next = self
            .nmea
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GnssError::NoData(-11)))?;
        sentence.fill(next.as_bytes());
        Ok(())
    }
}
