//! Definição de tipos/structs de uma amostra força/torque.
//!
//! Uma [`Sample`] corresponde a uma leitura de 6 eixos do sensor
//! (Fx, Fy, Fz, Tx, Ty, Tz) mais o instante de recepção.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Rótulo das amostras vindas do sensor real.
pub const SENSOR_FRAME_ID: &str = "kms40";

/// Rótulo das amostras sintéticas do modo dummy.
pub const DUMMY_FRAME_ID: &str = "dummyFrame";

// ──────────────────────────────────────────────
// Vetores
// ──────────────────────────────────────────────

/// Vetor de 3 componentes, em unidades nativas do sensor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Norma euclidiana.
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

// ──────────────────────────────────────────────
// Wrench (força + torque)
// ──────────────────────────────────────────────

/// Força e torque medidos em um único instante.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Wrench {
    /// Força (N)
    pub force: Vector3,
    /// Torque (Nm)
    pub torque: Vector3,
}

impl Wrench {
    /// Monta a partir da ordem fixa de eixos do protocolo: Fx, Fy, Fz, Tx, Ty, Tz.
    pub const fn from_array(v: [f64; 6]) -> Self {
        Self {
            force: Vector3::new(v[0], v[1], v[2]),
            torque: Vector3::new(v[3], v[4], v[5]),
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.force.x,
            self.force.y,
            self.force.z,
            self.torque.x,
            self.torque.y,
            self.torque.z,
        ]
    }
}

// ──────────────────────────────────────────────
// Amostra completa
// ──────────────────────────────────────────────

/// Amostra entregue ao sink e republicada via UDP.
///
/// `timestamp` é o instante de *recepção* da linha, não o contador
/// de tempo enviado pelo sensor (que é lido e descartado).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub wrench: Wrench,
    pub timestamp: SystemTime,
    /// Contexto de origem (ex: "kms40", "dummyFrame")
    pub source_label: String,
}

impl Sample {
    pub fn new(wrench: Wrench, timestamp: SystemTime, source_label: impl Into<String>) -> Self {
        Self {
            wrench,
            timestamp,
            source_label: source_label.into(),
        }
    }

    pub fn force(&self) -> Vector3 {
        self.wrench.force
    }

    pub fn torque(&self) -> Vector3 {
        self.wrench.torque
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn axis_order_is_fixed() {
        let w = Wrench::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(w.force, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(w.torque, Vector3::new(4.0, 5.0, 6.0));
        assert_eq!(w.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn default_wrench_is_zeroed() {
        let w = Wrench::default();
        assert_eq!(w.to_array(), [0.0; 6]);
        assert_eq!(w.force.norm(), 0.0);
    }

    #[test]
    fn sample_roundtrip_bincode() {
        let sample = Sample::new(
            Wrench::from_array([-1.25, 0.5, 9.81, 0.01, -0.02, 0.003]),
            UNIX_EPOCH + Duration::from_micros(1_700_000_000_123_456),
            SENSOR_FRAME_ID,
        );

        let encoded = bincode::serialize(&sample).unwrap();
        let decoded: Sample = bincode::deserialize(&encoded).unwrap();

        assert_eq!(sample, decoded);
        assert!(encoded.len() < 100, "Amostra bincode deve ser compacta");
    }

    #[test]
    fn norm_of_unit_axes() {
        assert_eq!(Vector3::new(3.0, 4.0, 0.0).norm(), 5.0);
    }
}
