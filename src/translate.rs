//! Translation from sensor state to metric observations.

use tracing::{debug, warn};

use crate::bridge::{Sensor, StateValue};

/// State fields that never become observations.
pub const IGNORED_STATES: &[&str] = &["lastupdated"];

/// Sensor type tag that carries the legacy temperature metric.
const TEMPERATURE_SENSOR_TYPE: &str = "ZLLTemperature";

/// State field holding the temperature reading, in hundredths of a degree.
const TEMPERATURE_STATE: &str = "temperature";

/// The metrics this exporter publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Generic per-field gauge, labeled by sensor uid, name and field.
    SensorStatus,
    /// Legacy temperature gauge, labeled by sensor uid only.
    Temperature,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::SensorStatus => "sensor_status",
            Metric::Temperature => "temperature",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Metric::SensorStatus => "Every parsable status for each sensor",
            Metric::Temperature => "Temperature in hundreds of degrees Celsius",
        }
    }
}

/// One labeled gauge value destined for the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub metric: Metric,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

/// Translate a sensor snapshot into metric observations.
///
/// Emits one generic observation per usable state field, plus the
/// specialized temperature observation for temperature sensors. The
/// specialized stage is layered on top of the generic one; both can emit
/// for the same field in the same cycle.
pub fn translate(sensor: &Sensor) -> Vec<Observation> {
    let mut observations = state_observations(sensor);

    if sensor.kind == TEMPERATURE_SENSOR_TYPE {
        match temperature_observation(sensor) {
            Some(observation) => observations.push(observation),
            None => warn!(
                sensor = %sensor.name,
                uid = %sensor.unique_id,
                "could not get temperature reading"
            ),
        }
    }

    observations
}

/// Generic stage: one observation per float-like or boolean state field.
///
/// Ignored and unrecognized fields are skipped at debug level; they never
/// fail the cycle.
pub fn state_observations(sensor: &Sensor) -> Vec<Observation> {
    let mut observations = Vec::with_capacity(sensor.state.len());

    for (field, value) in &sensor.state {
        if IGNORED_STATES.contains(&field.as_str()) {
            debug!(field = %field, "ignoring sensor state");
            continue;
        }

        let value = match value {
            StateValue::Number(n) => *n,
            StateValue::Bool(true) => 1.0,
            StateValue::Bool(false) => 0.0,
            StateValue::Other(raw) => {
                debug!(
                    sensor = %sensor.name,
                    field = %field,
                    reading = %raw,
                    "could not register sensor state"
                );
                continue;
            }
        };

        observations.push(Observation {
            metric: Metric::SensorStatus,
            labels: vec![
                ("uid".to_string(), sensor.unique_id.clone()),
                ("name".to_string(), sensor.name.clone()),
                ("type".to_string(), field.clone()),
            ],
            value,
        });
    }

    observations
}

/// Specialized stage: the backward-compatible temperature metric.
///
/// Returns `None` when the sensor has no float-like `temperature` field.
/// The value is in hundredths of a degree and passed through unconverted.
pub fn temperature_observation(sensor: &Sensor) -> Option<Observation> {
    match sensor.state.get(TEMPERATURE_STATE) {
        Some(StateValue::Number(temperature)) => Some(Observation {
            metric: Metric::Temperature,
            labels: vec![("uid".to_string(), sensor.unique_id.clone())],
            value: *temperature,
        }),
        _ => None,
    }
}
