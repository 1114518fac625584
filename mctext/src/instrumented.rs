//! Instrumented client with per-request latency callbacks and optional
//! built-in histogram tracking.

use std::time::Instant;

use crate::{Client, Error, Transport, Value};

// -- Types -------------------------------------------------------------------

/// The type of command that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Get,
    Set,
    Delete,
    Other,
}

/// Result metadata for a completed command, passed to the `on_result`
/// callback.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The command type.
    pub command: CommandType,
    /// Latency in nanoseconds (send until response parsed).
    pub latency_ns: u64,
    /// For GET: `Some(true)` = hit, `Some(false)` = miss. `None` for others.
    pub hit: Option<bool>,
    /// Whether the command succeeded (no error returned).
    pub success: bool,
}

// -- ClientMetrics -----------------------------------------------------------

#[cfg(feature = "metrics")]
pub struct ClientMetrics {
    pub latency: histogram::Histogram,
    pub get_latency: histogram::Histogram,
    pub set_latency: histogram::Histogram,
    pub del_latency: histogram::Histogram,
    pub requests: u64,
    pub errors: u64,
    pub hits: u64,
    pub misses: u64,
}

#[cfg(feature = "metrics")]
impl ClientMetrics {
    fn new() -> Self {
        Self {
            latency: histogram::Histogram::new(7, 64).unwrap(),
            get_latency: histogram::Histogram::new(7, 64).unwrap(),
            set_latency: histogram::Histogram::new(7, 64).unwrap(),
            del_latency: histogram::Histogram::new(7, 64).unwrap(),
            requests: 0,
            errors: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn record(&mut self, result: &CommandResult) {
        self.requests += 1;
        let _ = self.latency.increment(result.latency_ns);

        if !result.success {
            self.errors += 1;
        }

        match result.command {
            CommandType::Get => {
                let _ = self.get_latency.increment(result.latency_ns);
                match result.hit {
                    Some(true) => self.hits += 1,
                    Some(false) => self.misses += 1,
                    None => {}
                }
            }
            CommandType::Set => {
                let _ = self.set_latency.increment(result.latency_ns);
            }
            CommandType::Delete => {
                let _ = self.del_latency.increment(result.latency_ns);
            }
            _ => {}
        }
    }
}

// -- ClientBuilder -----------------------------------------------------------

pub struct ClientBuilder<T: Transport> {
    transport: T,
    on_result: Option<Box<dyn Fn(&CommandResult)>>,
    #[cfg(feature = "metrics")]
    with_metrics: bool,
}

impl<T: Transport> ClientBuilder<T> {
    fn new(transport: T) -> Self {
        Self {
            transport,
            on_result: None,
            #[cfg(feature = "metrics")]
            with_metrics: false,
        }
    }

    /// Register a callback invoked after each command completes.
    pub fn on_result<F: Fn(&CommandResult) + 'static>(mut self, f: F) -> Self {
        self.on_result = Some(Box::new(f));
        self
    }

    /// Enable built-in histogram tracking (requires the `metrics` feature).
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self) -> Self {
        self.with_metrics = true;
        self
    }

    /// Build the instrumented client.
    pub fn build(self) -> InstrumentedClient<T> {
        InstrumentedClient {
            client: Client::new(self.transport),
            on_result: self.on_result,
            #[cfg(feature = "metrics")]
            metrics: if self.with_metrics {
                Some(ClientMetrics::new())
            } else {
                None
            },
        }
    }
}

// -- InstrumentedClient ------------------------------------------------------

/// A client wrapper that measures per-request latency and invokes an
/// optional callback after each command.
pub struct InstrumentedClient<T: Transport> {
    client: Client<T>,
    on_result: Option<Box<dyn Fn(&CommandResult)>>,
    #[cfg(feature = "metrics")]
    metrics: Option<ClientMetrics>,
}

impl<T: Transport> InstrumentedClient<T> {
    /// Start building an instrumented client over a transport.
    pub fn builder(transport: T) -> ClientBuilder<T> {
        ClientBuilder::new(transport)
    }

    /// The wrapped client, for commands that are not instrumented.
    pub fn inner(&mut self) -> &mut Client<T> {
        &mut self.client
    }

    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> Option<&ClientMetrics> {
        self.metrics.as_ref()
    }

    #[inline]
    fn record(&mut self, result: &CommandResult) {
        if let Some(ref cb) = self.on_result {
            cb(result);
        }
        #[cfg(feature = "metrics")]
        if let Some(ref mut m) = self.metrics {
            m.record(result);
        }
    }

    // -- Commands -------------------------------------------------------------

    /// Get the value of a key.
    pub fn get(&mut self, key: impl AsRef<[u8]>) -> Result<Option<Value>, Error> {
        let start = Instant::now();
        let result = self.client.get(key);
        let latency_ns = start.elapsed().as_nanos() as u64;
        let (success, hit) = match &result {
            Ok(Some(_)) => (true, Some(true)),
            Ok(None) => (true, Some(false)),
            Err(_) => (false, None),
        };
        self.record(&CommandResult {
            command: CommandType::Get,
            latency_ns,
            hit,
            success,
        });
        result
    }

    /// Store a key-value pair with default flags and no expiration.
    pub fn set(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<(), Error> {
        let start = Instant::now();
        let result = self.client.set(key, value);
        let latency_ns = start.elapsed().as_nanos() as u64;
        self.record(&CommandResult {
            command: CommandType::Set,
            latency_ns,
            hit: None,
            success: result.is_ok(),
        });
        result
    }

    /// Store a key-value pair with explicit flags and expiration time.
    pub fn set_with_options(
        &mut self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        flags: u32,
        exptime: i32,
    ) -> Result<(), Error> {
        let start = Instant::now();
        let result = self.client.set_with_options(key, value, flags, exptime);
        let latency_ns = start.elapsed().as_nanos() as u64;
        self.record(&CommandResult {
            command: CommandType::Set,
            latency_ns,
            hit: None,
            success: result.is_ok(),
        });
        result
    }

    /// Delete a key.
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> Result<bool, Error> {
        let start = Instant::now();
        let result = self.client.delete(key);
        let latency_ns = start.elapsed().as_nanos() as u64;
        self.record(&CommandResult {
            command: CommandType::Delete,
            latency_ns,
            hit: None,
            success: result.is_ok(),
        });
        result
    }
}
