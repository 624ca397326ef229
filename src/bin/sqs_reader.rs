//! sqs-reader: worker entrypoint
//!
//! Overview
//! --------
//! Polls an SQS queue, unwraps the notification envelope in each message, and
//! writes every payload line to stdout. Fetched messages are deleted after
//! their lines have been handed to the stdout writer.
//!
//! Responsibilities
//! ----------------
//! - Initialize logging and configuration, build the signed SQS client.
//! - Run the poller on its own task, stream lines to stdout, stop on ctrl-c.
//!
//! Error Model
//! -----------
//! - Configuration failures are fatal.
//! - Everything after startup is logged and retried by the poller.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sqs_reader::app::Poller;
use sqs_reader::config::load_config;
use sqs_reader::sqs::SignedSqsClient;

pub fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(ErrorLayer::default())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    info!("sqs-reader starting");

    let config = load_config()?;
    let client = SignedSqsClient::from_config(&config);
    info!(region = %client.region(), "signing requests");

    let (tx, mut rx) = mpsc::channel::<Bytes>(config.sink_capacity);
    let poller = Arc::new(Poller::new(client, &config.sqs_endpoint, tx));
    let stop = poller.stop_handle();

    let worker = {
        let poller = poller.clone();
        tokio::spawn(async move { poller.start().await })
    };

    // Drains until the poller (and with it the sender) is dropped.
    let writer = tokio::spawn(async move {
        let mut out = BufWriter::new(tokio::io::stdout());
        while let Some(line) = rx.recv().await {
            out.write_all(&line).await?;
            out.write_all(b"\n").await?;
            if rx.is_empty() {
                out.flush().await?;
            }
        }
        out.flush().await?;
        Ok::<_, std::io::Error>(())
    });

    tokio::select! {
        res = signal::ctrl_c() => {
            res?;
            info!("shutdown requested; finishing current iteration");
            stop.stop();
        }
        _ = stop.stopped() => {
            info!("poller stopped on its own");
        }
    }

    if let Err(e) = worker.await {
        error!(err = %e, "poller task failed");
    }
    drop(poller);

    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(err = %e, "stdout writer failed"),
        Err(e) => error!(err = %e, "writer task failed"),
    }
    Ok(())
}
