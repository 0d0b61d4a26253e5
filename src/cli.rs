use clap::{Arg, ArgAction, ArgMatches, ColorChoice, Command};

use tokio::time::Duration;

use crate::{
    device::simulator::SimSettings,
    settings::{
        Assistance, DEFAULT_PERIODIC_INTERVAL, DEFAULT_PERIODIC_TIMEOUT, PowerSaving,
        ReferencePoint, Settings, TrackingMode,
    },
};

/// Shortest periodic fix interval (s)
const MIN_PERIODIC_INTERVAL: u16 = 10;

pub struct Cli {
    /// Arguments passed by user
    matches: ArgMatches,
}

impl Cli {
    /// Build new command line interface
    pub fn new() -> Self {
        Self {
            matches: Self::command().get_matches(),
        }
    }

    #[cfg(test)]
    fn from_args(args: &[&str]) -> Self {
        Self {
            matches: Self::command().get_matches_from(args),
        }
    }

    fn command() -> Command {
        Command::new("gnssmon")
            .author("Guillaume W. Bres, <guillaume.bressaix@gmail.com>")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Cellular modem GNSS fix acquisition and console reporting")
            .color(ColorChoice::Always)
            .next_help_heading("Tracking mode")
            .arg(
                Arg::new("periodic")
                    .long("periodic")
                    .action(ArgAction::SetTrue)
                    .help("Periodic fixes, instead of continuous tracking (one fix per second)"),
            )
            .arg(
                Arg::new("interval")
                    .long("interval")
                    .value_name("Seconds (u16)")
                    .requires("periodic")
                    .help("Periodic fix interval, 10 s minimum. Default is 120 s"),
            )
            .arg(
                Arg::new("timeout")
                    .long("timeout")
                    .value_name("Seconds (u16)")
                    .requires("periodic")
                    .help("Periodic fix retry timeout. 0 means no limit. Default is 120 s"),
            )
            .next_help_heading("Receiver configuration")
            .arg(
                Arg::new("assistance")
                    .long("assistance")
                    .value_name("none|agnss")
                    .help(
                        "Assistance data mode. Only affects the receiver use case: \
                         scheduled downloads are disabled in periodic mode, \
                         when assistance is provided",
                    ),
            )
            .arg(
                Arg::new("power-saving")
                    .long("power-saving")
                    .value_name("disabled|moderate|high")
                    .help("Receiver duty cycling, continuous tracking only. Disabled by default"),
            )
            .arg(
                Arg::new("low-accuracy")
                    .long("low-accuracy")
                    .action(ArgAction::SetTrue)
                    .help("Accept low accuracy fixes"),
            )
            .arg(
                Arg::new("elevation")
                    .long("elevation")
                    .value_name("Degrees (u8)")
                    .help("Satellites below this elevation are not used in fix"),
            )
            .next_help_heading("Reference point")
            .arg(
                Arg::new("ref-lat")
                    .long("ref-lat")
                    .value_name("Degrees")
                    .default_value("")
                    .help(
                        "Reference latitude. Distance to the reference is reported \
                         when both --ref-lat and --ref-lon are defined",
                    ),
            )
            .arg(
                Arg::new("ref-lon")
                    .long("ref-lon")
                    .value_name("Degrees")
                    .default_value("")
                    .help("Reference longitude"),
            )
            .next_help_heading("Simulated receiver")
            .arg(
                Arg::new("sim-search")
                    .long("sim-search")
                    .value_name("Seconds")
                    .help("Time to first fix. Default is 10 s"),
            )
            .arg(
                Arg::new("sim-lat")
                    .long("sim-lat")
                    .value_name("Degrees")
                    .help("Simulated latitude"),
            )
            .arg(
                Arg::new("sim-lon")
                    .long("sim-lon")
                    .value_name("Degrees")
                    .help("Simulated longitude"),
            )
            .arg(
                Arg::new("sim-fail-every")
                    .long("sim-fail-every")
                    .value_name("N (u32)")
                    .help("Fail one receiver read-out out of N"),
            )
    }

    fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T>
    where
        T::Err: std::fmt::Display,
    {
        let value = self.matches.get_one::<String>(key)?;
        Some(
            value
                .trim()
                .parse::<T>()
                .unwrap_or_else(|e| panic!("Invalid --{} value \"{}\": {}", key, value, e)),
        )
    }

    fn tracking_mode(&self) -> TrackingMode {
        if !self.matches.get_flag("periodic") {
            return TrackingMode::Continuous;
        }

        let interval = self
            .parse::<u16>("interval")
            .unwrap_or(DEFAULT_PERIODIC_INTERVAL);

        if interval < MIN_PERIODIC_INTERVAL {
            panic!(
                "Periodic fix interval is limited to {} s",
                MIN_PERIODIC_INTERVAL
            );
        }

        let timeout = self
            .parse::<u16>("timeout")
            .unwrap_or(DEFAULT_PERIODIC_TIMEOUT);

        TrackingMode::Periodic { interval, timeout }
    }

    fn assistance(&self) -> Assistance {
        match self
            .matches
            .get_one::<String>("assistance")
            .map(|s| s.as_str())
        {
            None | Some("none") => Assistance::None,
            Some("agnss") => Assistance::Agnss,
            Some(other) => panic!("Invalid assistance mode: \"{}\"", other),
        }
    }

    fn power_saving(&self) -> PowerSaving {
        match self
            .matches
            .get_one::<String>("power-saving")
            .map(|s| s.as_str())
        {
            None | Some("disabled") => PowerSaving::Disabled,
            Some("moderate") => PowerSaving::Moderate,
            Some("high") => PowerSaving::High,
            Some(other) => panic!("Invalid power saving level: \"{}\"", other),
        }
    }

    fn elevation_threshold(&self) -> Option<u8> {
        let elevation = self.parse::<u8>("elevation")?;

        if elevation > 90 {
            panic!("Elevation threshold is limited to 90 degrees");
        }

        Some(elevation)
    }

    fn reference(&self) -> Option<ReferencePoint> {
        let latitude = self
            .matches
            .get_one::<String>("ref-lat")
            .map(|s| s.as_str())
            .unwrap_or_default();

        let longitude = self
            .matches
            .get_one::<String>("ref-lon")
            .map(|s| s.as_str())
            .unwrap_or_default();

        ReferencePoint::from_config(latitude, longitude)
            .unwrap_or_else(|e| panic!("Invalid reference point: {}", e))
    }

    /// Acquisition [Settings]
    pub fn settings(&self) -> Settings {
        Settings {
            mode: self.tracking_mode(),
            assistance: self.assistance(),
            power_saving: self.power_saving(),
            low_accuracy: self.matches.get_flag("low-accuracy"),
            elevation_threshold: self.elevation_threshold(),
            reference: self.reference(),
        }
    }

    /// Simulated receiver [SimSettings]
    pub fn simulator_settings(&self) -> SimSettings {
        let default = SimSettings::default();

        SimSettings {
            search: self
                .parse::<u64>("sim-search")
                .map(Duration::from_secs)
                .unwrap_or(default.search),
            latitude: self.parse::<f64>("sim-lat").unwrap_or(default.latitude),
            longitude: self.parse::<f64>("sim-lon").unwrap_or(default.longitude),
            fail_every: self.parse::<u32>("sim-fail-every").or(default.fail_every),
        }
    }
}
