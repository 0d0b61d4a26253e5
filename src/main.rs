#![doc(
    html_logo_url = "https://raw.githubusercontent.com/nav-solutions/.github/master/logos/logo2.jpg"
)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

/*
 * GNSSMON is part of the nav-solutions framework.
 * Authors: Guillaume W. Bres <guillaume.bressaix@gmail.com> et al,
 * (cf. https://github.com/nav-solutions/gnssmon/graphs/contributors)
 * This framework is shipped under Mozilla Public V2 license.
 *
 * Documentation: https://github.com/nav-solutions/gnssmon
 */

use env_logger::{Builder, Target};

use hifitime::prelude::{Duration, Epoch};

use log::{debug, error, info, warn};

use tokio::{signal, sync::watch};

mod acquisition;
mod cli;
mod device;
mod display;
mod geo;
mod pipeline;
mod pvt;
mod runtime;
mod settings;
mod utils;

use crate::{
    cli::Cli,
    device::{
        Gnss,
        modem::{self, Modem},
        simulator::Simulator,
    },
    pipeline::{Pipeline, reporter::Reporter},
};

#[tokio::main]
pub async fn main() {
    // stdout belongs to the console display
    let mut builder = Builder::from_default_env();

    builder
        .target(Target::Stderr)
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    let cfg_precision = Duration::from_seconds(1.0);

    let t_utc = Epoch::now().unwrap_or_else(|e| panic!("Failed to determine system time: {}", e));

    info!(
        "{} - Starting GNSS based location tracking",
        t_utc.round(cfg_precision)
    );

    // cli
    let cli = Cli::new();
    let settings = cli.settings();

    match &settings.reference {
        Some(reference) => info!(
            "Reference point: {:.6}, {:.6}",
            reference.latitude, reference.longitude
        ),
        None => debug!("No reference point"),
    }

    let (mut modem, mut gnss) = Simulator::new(cli.simulator_settings());

    if modem::init(&mut modem).is_err() {
        std::process::exit(1);
    }

    let pipeline = Pipeline::new();
    let handler = pipeline.handler.clone();
    let pool = pipeline.pool.clone();

    let baseline =
        match acquisition::init_and_start(&settings, &mut modem, &mut gnss, handler.clone()) {
            Ok(baseline) => baseline,
            Err(e) => {
                error!("Failed to initialize GNSS: {}", e);
                // failure is logged by deinit, exit status is 1 either way
                let _ = modem::deinit(&mut modem);
                std::process::exit(1);
            },
        };

    info!("Getting GNSS data...");

    // shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        signal::ctrl_c()
            .await
            .unwrap_or_else(|e| panic!("Tokio signal handling error: {}", e));

        info!("Shutdown requested");

        if shutdown_tx.send(true).is_err() {
            debug!("reporter already stopped");
        }
    });

    let mut reporter = Reporter::from_pipeline(
        pipeline,
        shutdown_rx,
        baseline,
        settings.reference,
        std::io::stdout(),
    );

    reporter.run().await;

    drop(reporter);

    if let Err(e) = gnss.stop() {
        warn!("Failed to stop GNSS: {}", e);
    }

    if let Err(e) = modem.set_functional_mode(modem::FunctionalMode::DeactivateGnss) {
        warn!("Failed to deactivate GNSS: {}", e);
    }

    let deinit = modem::deinit(&mut modem);

    debug!(
        "PVT read-out failures: {}, NMEA sentences dropped: {}",
        handler.pvt_failures(),
        handler.nmea_dropped()
    );

    debug!(
        "NMEA buffers: {} acquired, {} released, {}/{} available",
        pool.acquired(),
        pool.released(),
        pool.available(),
        pool.capacity()
    );

    let t_utc = Epoch::now().unwrap_or(t_utc);
    info!("{} - application stopped", t_utc.round(cfg_precision));

    if deinit.is_err() {
        std::process::exit(1);
    }
}
