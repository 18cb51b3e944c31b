use crate::input::types::EventCategory;
use crate::pipeline::error::{ThrottleError, ThrottleResult};
use crate::runtime::yielding::Priority;
use serde::{Deserialize, Serialize};

/// Output cadence of the sampling buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SampleRateRepr", into = "SampleRateRepr")]
pub enum SampleRate {
    /// Flush on the host's refresh callback.
    #[default]
    Auto,
    /// Flush on an internal timer at this many Hz, independent of the host refresh.
    Hz(f64),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SampleRateRepr {
    Keyword(String),
    Hz(f64),
}

impl TryFrom<SampleRateRepr> for SampleRate {
    type Error = String;

    fn try_from(repr: SampleRateRepr) -> Result<Self, Self::Error> {
        match repr {
            SampleRateRepr::Keyword(keyword) if keyword == "auto" => Ok(SampleRate::Auto),
            SampleRateRepr::Keyword(other) => Err(format!(
                "unknown sample rate \"{}\", expected \"auto\" or a number",
                other
            )),
            SampleRateRepr::Hz(hz) => Ok(SampleRate::Hz(hz)),
        }
    }
}

impl From<SampleRate> for SampleRateRepr {
    fn from(rate: SampleRate) -> Self {
        match rate {
            SampleRate::Auto => SampleRateRepr::Keyword("auto".to_string()),
            SampleRate::Hz(hz) => SampleRateRepr::Hz(hz),
        }
    }
}

impl SampleRate {
    /// `Auto`, or a finite positive frequency.
    pub fn is_valid(&self) -> bool {
        match *self {
            SampleRate::Auto => true,
            SampleRate::Hz(hz) => hz.is_finite() && hz > 0.0,
        }
    }
}

/// Throttle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThrottleConfig {
    pub sample_rate: SampleRate,

    /// Hint passed to the yield primitive before each delivery
    pub priority: Priority,

    /// Categories the interceptor attaches to
    pub event_types: Vec<EventCategory>,

    /// Sum wheel/scroll deltas of coalesced-away events into the delivery
    pub accumulate_deltas: bool,

    /// Log classification and metrics at debug level
    pub debug: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate::Auto,
            priority: Priority::UserVisible,
            event_types: vec![EventCategory::PointerMove, EventCategory::Wheel],
            accumulate_deltas: true,
            debug: false,
        }
    }
}

impl ThrottleConfig {
    /// Parses and validates a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ThrottleResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ThrottleResult<()> {
        if let SampleRate::Hz(hz) = self.sample_rate {
            if !self.sample_rate.is_valid() {
                return Err(ThrottleError::ConfigurationError(format!(
                    "sampleRate must be a positive number of Hz, got {}",
                    hz
                )));
            }
        }

        if self.event_types.is_empty() {
            return Err(ThrottleError::ConfigurationError(
                "eventTypes must name at least one event category".to_string(),
            ));
        }

        Ok(())
    }
}
