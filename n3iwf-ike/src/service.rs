//! The thin glue between the UDP socket, the NGAP event channel and the
//! responder

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{error, info, instrument};

use crate::events::{Datagram, IkeEvent};
use crate::IkeServer;

/// Errors that may occur while running the service loops
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ServiceError {
    #[error("Could not bind: {0}")]
    CouldNotBind(io::Error),
    #[error("Could not recv: {0}")]
    Receive(io::Error),
}

/// Bind the responder's UDP socket as configured.
pub async fn bind(server: &IkeServer) -> Result<UdpSocket, ServiceError> {
    UdpSocket::bind(server.cfg.listen_addr)
        .await
        .map_err(ServiceError::CouldNotBind)
}

/// Run the receive loops until the NGAP event channel closes.
///
/// Datagrams are handled one after the other, which keeps the per-SA
/// ordering guarantee trivially: the response to message *n* is queued
/// before message *n+1* is even parsed. Outbound datagrams flow through
/// their own sender task so a full send queue can never deadlock a handler.
#[instrument(skip_all)]
pub async fn run(
    server: Arc<IkeServer>,
    socket: UdpSocket,
    mut event_rx: mpsc::Receiver<IkeEvent>,
    mut out_rx: mpsc::Receiver<Datagram>,
) -> Result<(), ServiceError> {
    let socket = Arc::new(socket);
    let local = socket.local_addr().map_err(ServiceError::Receive)?;
    info!("Listening for IKE traffic on {local}");

    let send_socket = socket.clone();
    let sender = tokio::spawn(async move {
        while let Some(datagram) = out_rx.recv().await {
            if let Err(err) = send_socket.send_to(&datagram.data, datagram.peer).await {
                error!("Could not send datagram to {}: {err}", datagram.peer);
            }
        }
    });

    const MAX_DATAGRAM_SIZE: usize = 65_507;
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        select! {
            received = socket.recv_from(&mut buf) => {
                let (len, peer) = received.map_err(ServiceError::Receive)?;
                server
                    .handle_datagram(Datagram {
                        data: buf[..len].to_vec(),
                        peer,
                        local,
                    })
                    .await;
            }
            event = event_rx.recv() => {
                match event {
                    Some(event) => server.handle_event(event).await,
                    None => {
                        info!("NGAP event channel closed, shutting down");
                        sender.abort();
                        return Ok(());
                    }
                }
            }
        }
    }
}
