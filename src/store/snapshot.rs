use rand::Rng;
use serde::{Deserialize, Serialize};

/// Names of the sensor fields a snapshot carries, in wire order.
pub const FIELDS: [&str; 7] = [
    "compass_heading",
    "gps_heading",
    "bot_speed",
    "gps_speed",
    "rudder_angle",
    "satellite",
    "valid",
];

/// One decoded telemetry record from the vehicle.
///
/// The wire format is a UTF-8 JSON object with exactly these keys; unknown
/// keys are rejected and every key is required, so a partially shaped
/// payload never half-applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySnapshot {
    /// Magnetic compass heading, 0..=360 degrees.
    pub compass_heading: u16,
    /// GPS course, 0..=255.
    pub gps_heading: u16,
    /// Hull speed reported by the vehicle, 1..=25.
    pub bot_speed: u16,
    /// Speed over ground from GPS, 1..=25.
    pub gps_speed: u16,
    /// Rudder deflection, 0..=30 degrees.
    pub rudder_angle: u16,
    /// Number of satellites in the GPS fix, 1..=25.
    pub satellite: u16,
    /// Fix validity flag, 0 or 1.
    pub valid: u16,
}

impl TelemetrySnapshot {
    /// Produce a snapshot with every field randomized inside its wire range.
    ///
    /// Used to seed the store at process start and by the data generator.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            compass_heading: rng.gen_range(0..=360),
            gps_heading: rng.gen_range(0..=255),
            bot_speed: rng.gen_range(1..=25),
            gps_speed: rng.gen_range(1..=25),
            rudder_angle: rng.gen_range(0..=30),
            satellite: rng.gen_range(1..=25),
            valid: rng.gen_range(0..=1),
        }
    }

    /// Look up a field by its wire name.
    pub fn get(&self, field: &str) -> Option<u16> {
        match field {
            "compass_heading" => Some(self.compass_heading),
            "gps_heading" => Some(self.gps_heading),
            "bot_speed" => Some(self.bot_speed),
            "gps_speed" => Some(self.gps_speed),
            "rudder_angle" => Some(self.rudder_angle),
            "satellite" => Some(self.satellite),
            "valid" => Some(self.valid),
            _ => None,
        }
    }
}
