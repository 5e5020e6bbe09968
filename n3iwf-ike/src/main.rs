//! # n3iwf-ike
//!
//! Standalone runner for the IKEv2 responder core of an N3IWF

#![warn(missing_docs, clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use n3iwf_ike::random::OsRandom;
use n3iwf_ike::xfrm::RecordingXfrmDriver;
use n3iwf_ike::{service, Credentials, IkeServer};
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use tokio::sync::mpsc;
use tracing::{error, info};

/// The cli of the responder runner
#[derive(Debug, Parser)]
#[clap(author, version)]
struct Cli {
    /// Path to the TOML configuration
    #[clap(short, long)]
    config: PathBuf,

    /// Path to the responder's RSA private key, PKCS#8 DER
    #[clap(short, long)]
    key: PathBuf,

    /// Path to the responder's X.509 certificate, DER
    #[clap(long)]
    cert: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt::init();

    let cfg = match std::fs::read_to_string(&cli.config)
        .map_err(|err| err.to_string())
        .and_then(|raw| toml::from_str(&raw).map_err(|err| err.to_string()))
    {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("Could not load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    let private_key = match std::fs::read(&cli.key)
        .map_err(|err| err.to_string())
        .and_then(|der| RsaPrivateKey::from_pkcs8_der(&der).map_err(|err| err.to_string()))
    {
        Ok(key) => key,
        Err(err) => {
            error!("Could not load the private key: {err}");
            return ExitCode::FAILURE;
        }
    };
    let certificate_der = match std::fs::read(&cli.cert) {
        Ok(der) => der,
        Err(err) => {
            error!("Could not load the certificate: {err}");
            return ExitCode::FAILURE;
        }
    };

    let (ngap_tx, mut ngap_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (out_tx, out_rx) = mpsc::channel(64);

    // Without an attached NGAP subsystem the events are only logged; a full
    // deployment feeds them into its AMF-facing service and answers through
    // `event_tx`, which is parked here to keep the channel open
    tokio::spawn(async move {
        let _event_tx = event_tx;
        while let Some(event) = ngap_rx.recv().await {
            info!("Event towards NGAP: {event:?}");
        }
    });

    let server = IkeServer::new(
        cfg,
        Credentials {
            private_key,
            certificate_der,
        },
        Box::new(RecordingXfrmDriver::default()),
        Box::new(OsRandom),
        ngap_tx,
        out_tx,
    );

    let socket = match service::bind(&server).await {
        Ok(socket) => socket,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    match service::run(Arc::clone(&server), socket, event_rx, out_rx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
