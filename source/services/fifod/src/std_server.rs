// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: fifod host backend: device registration, request handling and serve loops
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Host tests in `source/services/fifod/tests/service_loopback.rs`
//! ADR: docs/adr/0017-service-architecture.md

use std::fs;
use std::io;
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use char_fifo::{ChrdevRegistry, DeviceError, FifoDevice, Registration};
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::config::{ConfigError, FifoConfig};
use crate::dispatcher::{Dispatcher, ServiceError};
use crate::protocol::{
    decode_request, encode_response, encode_status_response, Request, Response, Status,
    RESPONSE_BIT,
};
use crate::transport::{loopback_channel, LoopbackClient, Transport, TransportError, UnixTransport};

/// Result alias used by the service.
pub type Result<T> = core::result::Result<T, ServerError>;

/// Errors surfaced while starting or running the service.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Device creation or registration failed.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Notifies the supervisor when the service is ready.
pub struct ReadyNotifier(Box<dyn FnOnce() + Send>);

impl ReadyNotifier {
    pub fn new<F>(func: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(func))
    }

    pub fn notify(self) {
        (self.0)();
    }
}

/// Running service context: the device, its registration and the dispatcher in front of it.
pub struct FifoService {
    device: Arc<FifoDevice>,
    dispatcher: Arc<Dispatcher>,
    registration: Option<Registration>,
}

impl FifoService {
    /// Creates the device and registers it in a fresh registry.
    pub fn start(config: &FifoConfig) -> Result<Self> {
        Self::start_in(config, Arc::new(ChrdevRegistry::new()))
    }

    /// Creates the device and registers it in `registry`.
    pub fn start_in(config: &FifoConfig, registry: Arc<ChrdevRegistry>) -> Result<Self> {
        config.validate()?;
        let device = Arc::new(FifoDevice::new(&config.device.name, config.queue.capacity)?);
        let registration = Registration::register(
            registry.clone(),
            &config.device.name,
            &config.device.class,
            config.device.major,
            device.clone(),
        )?;
        info!(
            "fifod: {} ready at {} ({}), capacity {} bytes",
            config.device.name,
            registration.node_path(),
            registration.number(),
            config.queue.capacity
        );
        let dispatcher = Arc::new(Dispatcher::new(registry, config.limits.max_request_len));
        Ok(Self { device, dispatcher, registration: Some(registration) })
    }

    pub fn device(&self) -> &Arc<FifoDevice> {
        &self.device
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn node_path(&self) -> &str {
        self.registration.as_ref().map_or("", Registration::node_path)
    }

    /// Serves a new loopback channel on a background thread.
    ///
    /// The thread exits once every clone of the returned client is dropped.
    pub fn spawn_loopback(&self) -> (LoopbackClient, JoinHandle<Result<()>>) {
        let (client, mut server) = loopback_channel();
        let dispatcher = self.dispatcher.clone();
        let handle = thread::spawn(move || run_loop(&mut server, &dispatcher));
        (client, handle)
    }

    /// Removes the device registration, then releases open handles.
    pub fn shutdown(mut self) {
        if let Some(registration) = self.registration.take() {
            registration.unregister();
        }
        self.dispatcher.close_all();
    }
}

/// Runs the daemon on the Unix socket named in `config`.
pub fn service_main_loop(config: &FifoConfig, notifier: ReadyNotifier) -> Result<()> {
    let service = FifoService::start(config)?;
    let socket = &config.service.socket;
    remove_stale_socket(socket)?;
    let listener = UnixListener::bind(socket)?;
    info!("fifod: listening on {}", socket.display());
    notifier.notify();
    let outcome = serve_unix(listener, service.dispatcher().clone());
    service.shutdown();
    if let Err(err) = fs::remove_file(socket) {
        debug!("fifod: socket cleanup: {err}");
    }
    outcome
}

/// Accepts connections forever, serving each on its own thread.
pub fn serve_unix(listener: UnixListener, dispatcher: Arc<Dispatcher>) -> Result<()> {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                warn!("fifod: accept failed: {err}");
                continue;
            }
        };
        let dispatcher = dispatcher.clone();
        thread::spawn(move || {
            let mut transport = UnixTransport::new(stream);
            if let Err(err) = run_loop(&mut transport, &dispatcher) {
                debug!("fifod: connection ended: {err}");
            }
        });
    }
    Ok(())
}

/// Runs the service with an injected transport.
pub fn run_with_transport<T: Transport>(transport: &mut T, service: &FifoService) -> Result<()> {
    run_loop(transport, service.dispatcher())
}

/// Serves frames from `transport` until the peer goes away.
pub fn run_loop<T: Transport>(transport: &mut T, dispatcher: &Dispatcher) -> Result<()> {
    while let Some(frame) = transport.recv().map_err(|err| ServerError::Transport(err.into()))? {
        let response = handle_frame(dispatcher, &frame);
        transport.send(&response).map_err(|err| ServerError::Transport(err.into()))?;
    }
    Ok(())
}

/// Decodes one request, dispatches it and encodes the reply. Every frame gets a reply.
pub fn handle_frame(dispatcher: &Dispatcher, frame: &[u8]) -> Vec<u8> {
    let request = match decode_request(frame) {
        Ok(request) => request,
        Err(err) => {
            let op = frame.get(3).copied().unwrap_or(0) & !RESPONSE_BIT;
            warn!("fifod: rejected frame (op {op}): {err}");
            return encode_status_response(op, Status::from(err));
        }
    };
    let response = match request {
        Request::Open(req) => match dispatcher.open(&req.path) {
            Ok(handle) => Response::Open { status: Status::Ok, handle },
            Err(err) => Response::Open { status: failed(&err), handle: 0 },
        },
        Request::Read(req) => match dispatcher.read(req.handle, req.len, req.buf_cap) {
            Ok(data) => Response::Read { status: Status::Ok, data },
            Err(err) => Response::Read { status: failed(&err), data: Vec::new() },
        },
        Request::Write(req) => match dispatcher.write(req.handle, req.len, &req.data) {
            Ok(count) => Response::Write { status: Status::Ok, count: count as u32 },
            Err(err) => Response::Write { status: failed(&err), count: 0 },
        },
        Request::Close(req) => Response::Close {
            status: dispatcher.close(req.handle).map_or_else(|err| failed(&err), |()| Status::Ok),
        },
    };
    encode_response(&response)
}

fn failed(err: &ServiceError) -> Status {
    let status = err.status();
    match status {
        Status::BadAddress => error!("fifod: {err}"),
        _ => debug!("fifod: {err}"),
    }
    status
}

fn remove_stale_socket(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("fifod: removed stale socket {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
