//! Blocking bridge over an asynchronous `reqwest` client.
//!
//! Public adapters in this crate expose synchronous traits. Each adapter owns
//! a [`BlockingClient`], which pairs a `reqwest::Client` with a
//! `current_thread` Tokio runtime that is reused across calls.
//!
//! When called from within an existing multi-threaded Tokio runtime the
//! bridge uses that runtime's handle with [`tokio::task::block_in_place`].
//! From a `current_thread` runtime it falls back to the owned runtime, which
//! may deadlock if the caller's runtime drives IO this request depends on.

use std::{fmt, future::Future, io, time::Duration};

use reqwest::Client;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use crate::TransportError;

pub(crate) struct BlockingClient {
    client: Client,
    runtime: Runtime,
    timeout: Duration,
}

impl fmt::Debug for BlockingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingClient")
            .field("client", &self.client)
            .field("timeout", &self.timeout)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

/// How the client's timeout is applied to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Deadline {
    /// The whole exchange, body included, must finish within the timeout.
    Total,
    /// Only connecting and each wait for more body bytes are bounded, so a
    /// slow but live transfer runs to completion.
    Idle,
}

impl BlockingClient {
    pub(crate) fn new(
        user_agent: &str,
        timeout: Duration,
        deadline: Deadline,
    ) -> Result<Self, TransportError> {
        let builder = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout);
        let builder = match deadline {
            Deadline::Total => builder.timeout(timeout),
            Deadline::Idle => builder.read_timeout(timeout),
        };
        let client = builder.build().map_err(TransportError::Build)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportError::Runtime)?;
        Ok(Self {
            client,
            runtime,
            timeout,
        })
    }

    pub(crate) const fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }

    /// Map a `reqwest` failure onto [`TransportError`].
    pub(crate) fn convert_error(&self, error: &reqwest::Error, url: &str) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return TransportError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        TransportError::Network {
            url: url.to_owned(),
            source: io::Error::other(error.to_string()),
        }
    }
}
