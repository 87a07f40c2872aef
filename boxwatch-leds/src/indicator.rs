/// On/off status LEDs.
///
/// Lines are requested once at startup from the configured GPIO chip; a line
/// that cannot be claimed is a startup error. After that, setting a value
/// never fails the loop: hardware errors are logged and ignored.
use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use std::path::{Path, PathBuf};

const CONSUMER: &str = "boxwatch-leds";

/// The three logical indicator channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Home-automation hub reachable.
    Primary,
    /// Public resolver reachable.
    Secondary,
    /// New error lines in the tailed log.
    Error,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Channel::Primary => "primary",
            Channel::Secondary => "secondary",
            Channel::Error => "error",
        };
        f.write_str(name)
    }
}

/// A binary visual signal.
pub trait StatusIndicator {
    /// Turn the signal on or off. Idempotent.
    fn set(&mut self, on: bool);

    /// Last value set, if any.
    fn state(&self) -> Option<bool>;
}

/// Errors claiming a GPIO output line.
#[derive(Debug)]
pub enum IndicatorError {
    Open {
        chip: PathBuf,
        source: gpio_cdev::Error,
    },
    Request {
        chip: PathBuf,
        pin: u32,
        source: gpio_cdev::Error,
    },
}

impl std::fmt::Display for IndicatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndicatorError::Open { chip, source } => {
                write!(f, "failed to open GPIO chip {}: {}", chip.display(), source)
            }
            IndicatorError::Request { chip, pin, source } => write!(
                f,
                "failed to claim line {} on {}: {}",
                pin,
                chip.display(),
                source
            ),
        }
    }
}

impl std::error::Error for IndicatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IndicatorError::Open { source, .. } => Some(source),
            IndicatorError::Request { source, .. } => Some(source),
        }
    }
}

/// An LED on a GPIO character-device line.
pub struct GpioIndicator {
    channel: Channel,
    handle: LineHandle,
    state: Option<bool>,
}

impl StatusIndicator for GpioIndicator {
    fn set(&mut self, on: bool) {
        if self.state == Some(on) {
            return;
        }
        tracing::debug!(channel = %self.channel, on, "LED changed");
        match self.handle.set_value(u8::from(on)) {
            Ok(()) => self.state = Some(on),
            Err(e) => {
                // Unknown line state; retry on the next set.
                tracing::warn!(channel = %self.channel, error = %e, "failed to set LED");
                self.state = None;
            }
        }
    }

    fn state(&self) -> Option<bool> {
        self.state
    }
}

/// Opens output lines on one GPIO chip.
pub struct GpioBank {
    path: PathBuf,
    chip: Chip,
}

impl GpioBank {
    pub fn open(path: &Path) -> Result<Self, IndicatorError> {
        let chip = Chip::new(path).map_err(|e| IndicatorError::Open {
            chip: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            chip,
        })
    }

    /// Claim `pin` as an output, initially off.
    pub fn output(&mut self, channel: Channel, pin: u32) -> Result<GpioIndicator, IndicatorError> {
        let handle = self
            .chip
            .get_line(pin)
            .and_then(|line| line.request(LineRequestFlags::OUTPUT, 0, CONSUMER))
            .map_err(|e| IndicatorError::Request {
                chip: self.path.clone(),
                pin,
                source: e,
            })?;
        tracing::info!(channel = %channel, pin, "LED line claimed");
        Ok(GpioIndicator {
            channel,
            handle,
            state: Some(false),
        })
    }
}

/// Indicator that only logs transitions, for hosts without LEDs.
pub struct LogIndicator {
    channel: Channel,
    state: Option<bool>,
}

impl LogIndicator {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            state: None,
        }
    }
}

impl StatusIndicator for LogIndicator {
    fn set(&mut self, on: bool) {
        if self.state != Some(on) {
            tracing::info!(channel = %self.channel, on, "indicator");
            self.state = Some(on);
        }
    }

    fn state(&self) -> Option<bool> {
        self.state
    }
}

/// The three indicators the status loop drives.
pub struct Indicators {
    pub primary: Box<dyn StatusIndicator>,
    pub secondary: Box<dyn StatusIndicator>,
    pub error: Box<dyn StatusIndicator>,
}

impl Indicators {
    /// Log-only indicators for every channel.
    pub fn logging() -> Self {
        Self {
            primary: Box::new(LogIndicator::new(Channel::Primary)),
            secondary: Box::new(LogIndicator::new(Channel::Secondary)),
            error: Box::new(LogIndicator::new(Channel::Error)),
        }
    }

    /// Claim the GPIO lines on `chip`. With no `error` pin, that line is left
    /// alone and the error channel only logs.
    pub fn gpio(
        chip: &Path,
        primary: u32,
        secondary: u32,
        error: Option<u32>,
    ) -> Result<Self, IndicatorError> {
        let mut bank = GpioBank::open(chip)?;
        let primary = Box::new(bank.output(Channel::Primary, primary)?);
        let secondary = Box::new(bank.output(Channel::Secondary, secondary)?);
        let error: Box<dyn StatusIndicator> = match error {
            Some(pin) => Box::new(bank.output(Channel::Error, pin)?),
            None => Box::new(LogIndicator::new(Channel::Error)),
        };
        Ok(Self {
            primary,
            secondary,
            error,
        })
    }

    pub fn set(&mut self, channel: Channel, on: bool) {
        self.get_mut(channel).set(on);
    }

    pub fn state(&self, channel: Channel) -> Option<bool> {
        match channel {
            Channel::Primary => self.primary.state(),
            Channel::Secondary => self.secondary.state(),
            Channel::Error => self.error.state(),
        }
    }

    fn get_mut(&mut self, channel: Channel) -> &mut dyn StatusIndicator {
        match channel {
            Channel::Primary => self.primary.as_mut(),
            Channel::Secondary => self.secondary.as_mut(),
            Channel::Error => self.error.as_mut(),
        }
    }
}
