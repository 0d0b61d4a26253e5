use log::{error, info, warn};
use thiserror::Error;

/// Maximal length of identity strings, terminator excluded
pub const MAX_MODEM_INFO_LEN: usize = 29;

/// Cellular modem failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModemError {
    /// Command could not be issued, or was rejected
    #[error("modem transport error (code {0})")]
    Transport(i32),

    /// Command succeeded but its response is malformed
    #[error("failed to parse {0}")]
    Parse(&'static str),

    #[error("modem library error (code {0})")]
    Library(i32),
}

/// Modem functional mode
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FunctionalMode {
    /// Powers the positioning receiver
    ActivateGnss,
    DeactivateGnss,
}

/// Cellular modem interface
pub trait Modem {
    /// Initializes the modem library
    fn init(&mut self) -> Result<(), ModemError>;

    /// Shuts down the modem library
    fn shutdown(&mut self) -> Result<(), ModemError>;

    fn set_functional_mode(&mut self, mode: FunctionalMode) -> Result<(), ModemError>;

    /// Issues an AT command and returns the raw textual response
    fn at_command(&mut self, cmd: &str) -> Result<String, ModemError>;

    /// Modem firmware version string
    fn firmware_version(&mut self) -> Result<String, ModemError>;
}

/// Modem identity strings. Each field remains unset when its retrieval failed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Identity {
    pub imei: Option<String>,
    pub iccid: Option<String>,
    pub firmware: Option<String>,
}

fn truncated(s: &str) -> String {
    s.chars().take(MAX_MODEM_INFO_LEN).collect()
}

/// Extracts IMEI from `AT+CGSN=1` response: `+CGSN: "352656100367872"`
pub fn parse_imei(response: &str) -> Result<String, ModemError> {
    let (_, tail) = response.split_once('"').ok_or(ModemError::Parse("IMEI"))?;
    let (imei, _) = tail.split_once('"').ok_or(ModemError::Parse("IMEI"))?;
    Ok(truncated(imei))
}

/// Extracts ICCID from `AT+CCID` response: `+CCID: 89882806660004909182\r\nOK`
pub fn parse_iccid(response: &str) -> Result<String, ModemError> {
    let (_, tail) = response.split_once(':').ok_or(ModemError::Parse("ICCID"))?;
    let tail = tail.trim_start_matches(' ');
    let end = tail.find(['\r', '\n']).unwrap_or(tail.len());
    Ok(truncated(&tail[..end]))
}

pub fn imei<M: Modem>(modem: &mut M) -> Result<String, ModemError> {
    let response = modem.at_command("AT+CGSN=1").inspect_err(|e| {
        error!("Couldn't get IMEI: {}", e);
    })?;

    parse_imei(&response).inspect_err(|_| {
        error!("Failed to parse IMEI");
    })
}

pub fn iccid<M: Modem>(modem: &mut M) -> Result<String, ModemError> {
    let response = modem.at_command("AT+CCID").inspect_err(|e| {
        error!("Couldn't get ICCID: {}", e);
    })?;

    parse_iccid(&response).inspect_err(|_| {
        error!("Failed to parse ICCID");
    })
}

/// Initializes the modem library then gathers the [Identity].
/// Only the library initialization is fatal.
pub fn init<M: Modem>(modem: &mut M) -> Result<Identity, ModemError> {
    info!("Initializing modem library");

    modem.init().inspect_err(|e| {
        error!("Failed to initialize the modem library: {}", e);
    })?;

    let mut identity = Identity::default();

    if let Ok(imei) = imei(modem) {
        info!("IMEI: [ {} ]", imei);
        identity.imei = Some(imei);
    }

    if let Ok(iccid) = iccid(modem) {
        info!("ICCID: [ {} ]", iccid);
        identity.iccid = Some(iccid);
    }

    match modem.firmware_version() {
        Ok(version) => {
            let version = truncated(&version);
            info!("Modem FW version: {}", version);
            identity.firmware = Some(version);
        },
        Err(e) => {
            warn!("Failed to get modem FW version: {}", e);
        },
    }

    Ok(identity)
}

/// Shuts the modem library down
pub fn deinit<M: Modem>(modem: &mut M) -> Result<(), ModemError> {
    match modem.shutdown() {
        Ok(_) => {
            info!("Modem library successfully shut down");
            Ok(())
        },
        Err(e) => {
            error!("Modem library shutdown failed: {}", e);
            Err(e)
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::mock::MockModem;

    #[test]
    fn imei_parsing() {
        assert_eq!(
            parse_imei("+CGSN: \"352656100367872\"\r\nOK\r\n"),
            Ok("352656100367872".to_string())
        );

        assert_eq!(
            parse_imei("+CGSN: 352656100367872"),
            Err(ModemError::Parse("IMEI"))
        );

        assert_eq!(
            parse_imei("+CGSN: \"3526561"),
            Err(ModemError::Parse("IMEI"))
        );

        let long = format!("+CGSN: \"{}\"", "1".repeat(40));
        assert_eq!(parse_imei(&long).unwrap().len(), MAX_MODEM_INFO_LEN);
    }

    #[test]
    fn iccid_parsing() {
        assert_eq!(
            parse_iccid("+CCID:   89882806660004909182\r\nOK\r\n"),
            Ok("89882806660004909182".to_string())
        );

        assert_eq!(
            parse_iccid("+CCID: 8988280666000490918"),
            Ok("8988280666000490918".to_string())
        );

        assert_eq!(parse_iccid("ERROR"), Err(ModemError::Parse("ICCID")));
    }

    #[test]
    fn identity_failures_are_not_fatal() {
        let mut modem = MockModem::default();
        modem.responses.insert("AT+CGSN=1", Err(ModemError::Transport(-5)));
        modem.responses.insert("AT+CCID", Ok("garbage".to_string()));

        let identity = init(&mut modem).unwrap();

        assert!(identity.imei.is_none());
        assert!(identity.iccid.is_none());
        assert_eq!(identity.firmware.as_deref(), Some("mfw_nrf9160_1.3.7"));
    }

    #[test]
    fn library_failure_is_fatal() {
        let mut modem = MockModem {
            init_error: Some(ModemError::Library(-12)),
            ..Default::default()
        };

        assert_eq!(init(&mut modem), Err(ModemError::Library(-12)));
        assert!(modem.commands.is_empty());
    }
}
