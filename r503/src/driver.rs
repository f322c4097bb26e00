//! Driver facade
//!
//! Owns the one sensor link and the one enrollment session a driver
//! instance may have, and exposes the readings and command-batch surfaces
//! a host polls.

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use r503_transport::SerialTransport;
use r503_types::{LedSignal, MatchResult, Readings, SlotId, SystemParameters};

use crate::config::Config;
use crate::dispatcher::{self, Reply};
use crate::enrollment::{self, EnrollmentSession};
use crate::error::{Error, Result, UsageError};
use crate::feedback::Feedback;
use crate::link::SensorLink;
use crate::matching;
use crate::sensor::FingerprintSensor;

/// Opens a sensor link on a serial device
pub trait Connector: Send {
    fn connect(&mut self, port: &str, config: &Config) -> Result<Box<dyn SensorLink>>;
}

impl<F> Connector for F
where
    F: FnMut(&str, &Config) -> Result<Box<dyn SensorLink>> + Send,
{
    fn connect(&mut self, port: &str, config: &Config) -> Result<Box<dyn SensorLink>> {
        self(port, config)
    }
}

/// Connects a [`FingerprintSensor`] over a [`SerialTransport`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn connect(&mut self, port: &str, config: &Config) -> Result<Box<dyn SensorLink>> {
        let transport = SerialTransport::new(port)
            .with_baud_rate(config.baud_rate)
            .with_timeout(config.read_timeout());

        let mut sensor = FingerprintSensor::new(transport)
            .with_address(config.address)
            .with_password(config.password);
        sensor.connect()?;

        Ok(Box::new(sensor))
    }
}

/// R503 driver
///
/// The sensor link is opened lazily on first use and then reused until the
/// driver is closed or reconfigured onto another device.
///
/// # Examples
///
/// ```no_run
/// use r503::{Config, Driver};
///
/// fn main() -> r503::Result<()> {
///     let mut driver = Driver::new(Config::with_port("/dev/ttyUSB0"))?;
///
///     let readings = driver.readings();
///     println!("{}", serde_json::to_string(&readings).unwrap_or_default());
///
///     Ok(())
/// }
/// ```
pub struct Driver {
    config: Config,
    port: String,
    connector: Box<dyn Connector>,
    link: Option<Box<dyn SensorLink>>,
    feedback: Feedback,
    enrollment: EnrollmentSession,
    startup_signalled: bool,
}

impl Driver {
    /// Create a driver on the serial port named by `config`, or the first
    /// one discovered. No serial device at all is a configuration fault.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_connector(config, SerialConnector)
    }

    /// Create a driver that opens its link through `connector`
    pub fn with_connector(config: Config, connector: impl Connector + 'static) -> Result<Self> {
        let port = config.resolve_port()?;
        info!("R503 driver using {}", port);

        Ok(Self {
            feedback: Feedback::new(&config.timing),
            config,
            port,
            connector: Box::new(connector),
            link: None,
            enrollment: EnrollmentSession::new(),
            startup_signalled: false,
        })
    }

    /// Build a driver from the host's attribute map
    pub fn from_attributes(attributes: &Map<String, Value>) -> Result<Self> {
        Self::new(Config::from_attributes(attributes)?)
    }

    /// Open the link unless it is already open. A fresh link gets its LED
    /// switched off; failing that is only logged.
    fn ensure_open<'a>(
        link: &'a mut Option<Box<dyn SensorLink>>,
        connector: &mut dyn Connector,
        port: &str,
        config: &Config,
    ) -> Result<&'a mut (dyn SensorLink + 'static)> {
        if link.is_none() {
            info!("Opening sensor on {}", port);
            let mut opened = connector.connect(port, config)?;

            if let Err(e) = opened.set_led(LedSignal::off()) {
                warn!("Failed to turn off LED after init: {}", e);
            }

            *link = Some(opened);
        }

        link.as_deref_mut().ok_or(Error::NotConnected)
    }

    fn open(&mut self) -> Result<&mut (dyn SensorLink + 'static)> {
        Self::ensure_open(
            &mut self.link,
            self.connector.as_mut(),
            &self.port,
            &self.config,
        )
    }

    /// One passive poll.
    ///
    /// Never fails: a transport fault becomes a readings value carrying an
    /// `error`. The very first poll of a driver shows the startup breathing.
    pub fn readings(&mut self) -> Readings {
        debug!("Getting readings from the sensor");

        let link = match Self::ensure_open(
            &mut self.link,
            self.connector.as_mut(),
            &self.port,
            &self.config,
        ) {
            Ok(link) => link,
            Err(e) => {
                error!("Fingerprint error: {}", e);
                return Readings::fault(e.to_string());
            }
        };

        if !self.startup_signalled {
            self.startup_signalled = true;
            self.feedback.startup(link);
        }

        matching::poll(link, &self.feedback).unwrap_or_else(|e| {
            error!("Fingerprint error: {}", e);
            Readings::fault(e.to_string())
        })
    }

    /// Run a command batch. Only failing to open the sensor is an `Err`;
    /// everything else is reported inside the reply.
    pub fn do_command(&mut self, commands: &Map<String, Value>) -> Result<Reply> {
        let link = Self::ensure_open(
            &mut self.link,
            self.connector.as_mut(),
            &self.port,
            &self.config,
        )?;

        Ok(dispatcher::dispatch(
            link,
            &self.feedback,
            &mut self.enrollment,
            commands,
        ))
    }

    /// Explicit one-shot match
    pub fn match_fingerprint(&mut self) -> Result<MatchResult> {
        let link = Self::ensure_open(
            &mut self.link,
            self.connector.as_mut(),
            &self.port,
            &self.config,
        )?;

        matching::match_once(link, &self.feedback)
    }

    /// Guided enrollment of one finger into `slot`, blocking until done.
    ///
    /// Refused while a step-wise enrollment is in flight since both use the
    /// same sensor buffers.
    pub fn enroll_finger(&mut self, slot: SlotId) -> Result<()> {
        if let (Some(active), Some(step)) = (self.enrollment.slot(), self.enrollment.step()) {
            return Err(UsageError::AlreadyActive {
                slot: active,
                step: step.number(),
            }
            .into());
        }

        let link = Self::ensure_open(
            &mut self.link,
            self.connector.as_mut(),
            &self.port,
            &self.config,
        )?;

        enrollment::enroll_finger(link, &self.feedback, &self.config.timing, slot)
    }

    /// Apply a new configuration.
    ///
    /// The open link is dropped when the device or its link settings
    /// change and reopened on next use. The enrollment session is kept;
    /// callers must not reconfigure mid-enrollment.
    pub fn reconfigure(&mut self, config: Config) -> Result<()> {
        let port = config.resolve_port()?;

        if self.enrollment.is_active() {
            warn!("Reconfiguring while an enrollment is active");
        }

        let relink = port != self.port
            || config.baud_rate != self.config.baud_rate
            || config.address != self.config.address
            || config.password != self.config.password
            || config.read_timeout_ms != self.config.read_timeout_ms;

        if relink {
            info!("Sensor moved from {} to {}", self.port, port);
            self.close();
            self.port = port;
        }

        self.feedback = Feedback::new(&config.timing);
        self.config = config;

        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serial device in use
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn enrollment(&self) -> &EnrollmentSession {
        &self.enrollment
    }

    /// Parameters read when the link was opened, opening it if needed
    pub fn system_parameters(&mut self) -> Result<Option<SystemParameters>> {
        Ok(self.open()?.system_parameters())
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Switch the LED off and release the link
    pub fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.set_led(LedSignal::off()) {
                warn!("Failed to turn off LED on close: {}", e);
            }
            info!("Sensor on {} closed", self.port);
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.close();
    }
}
