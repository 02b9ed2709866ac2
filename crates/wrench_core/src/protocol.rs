//! Frame binário de republicação das amostras.
//!
//! Layout fixo, little-endian, sem varints:
//!
//! ```text
//! off  0  magic      u8        0x57 ('W')
//! off  1  versão     u8        PROTOCOL_VERSION
//! off  2  segundos   u64       desde UNIX_EPOCH (recepção)
//! off 10  nanos      u32       < 1_000_000_000
//! off 14  Fx..Tz     6 × f64   ordem fixa, todos finitos
//! off 62  len rótulo u64       ≤ MAX_LABEL_LEN
//! off 70  rótulo     UTF-8
//! ```
//!
//! O corpo é gravado com bincode em codificação de inteiros fixa, então os
//! offsets acima valem para qualquer amostra. O decode valida tudo que o
//! parser de linhas garante na origem: eixos finitos, timestamp representável
//! e rótulo curto.

use crate::types::{Sample, Wrench};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::time::{Duration, UNIX_EPOCH};

/// Primeiro byte de todo frame de amostra.
pub const MAGIC_BYTE: u8 = 0x57; // 'W'

/// Versão do layout. A versão 1 serializava a amostra inteira.
pub const PROTOCOL_VERSION: u8 = 2;

/// Maior rótulo (frame id) aceito, em bytes.
pub const MAX_LABEL_LEN: usize = 64;

const HEADER_LEN: usize = 2;

/// segundos + nanos + 6 eixos + tamanho do rótulo
const FIXED_BODY_LEN: usize = 8 + 4 + 6 * 8 + 8;

/// Teto de leitura do bincode: rótulos enormes falham sem alocar.
const BODY_LIMIT: u64 = 1024;

const NANOS_PER_SEC: u32 = 1_000_000_000;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProtocolError {
    #[error("Frame curto demais: {0} bytes")]
    TooShort(usize),

    #[error("Magic byte inválido: 0x{0:02X}")]
    InvalidMagic(u8),

    #[error("Versão {0} não suportada (atual: {PROTOCOL_VERSION})")]
    VersionMismatch(u8),

    #[error("Eixo {axis} não finito")]
    NonFinite { axis: usize },

    #[error("Rótulo com {0} bytes (máximo {MAX_LABEL_LEN})")]
    LabelTooLong(usize),

    #[error("Timestamp anterior a UNIX_EPOCH")]
    BeforeEpoch,

    #[error("Timestamp fora do intervalo")]
    InvalidTimestamp,

    #[error("Corpo malformado: {0}")]
    Malformed(String),
}

/// Corpo do frame, na ordem dos offsets documentados no módulo.
#[derive(Serialize, Deserialize)]
struct WireBody<'a> {
    secs: u64,
    nanos: u32,
    axes: [f64; 6],
    label: &'a str,
}

impl WireBody<'_> {
    fn validate(&self) -> Result<(), ProtocolError> {
        if self.label.len() > MAX_LABEL_LEN {
            return Err(ProtocolError::LabelTooLong(self.label.len()));
        }
        if let Some(axis) = self.axes.iter().position(|v| !v.is_finite()) {
            return Err(ProtocolError::NonFinite { axis });
        }
        if self.nanos >= NANOS_PER_SEC {
            return Err(ProtocolError::InvalidTimestamp);
        }
        Ok(())
    }

    fn into_sample(self) -> Result<Sample, ProtocolError> {
        let timestamp = UNIX_EPOCH
            .checked_add(Duration::new(self.secs, self.nanos))
            .ok_or(ProtocolError::InvalidTimestamp)?;
        Ok(Sample::new(Wrench::from_array(self.axes), timestamp, self.label))
    }
}

fn wire() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(BODY_LIMIT)
        .reject_trailing_bytes()
}

/// Codifica uma [`Sample`] no frame de republicação.
///
/// Falha (sem panic) para eixos não finitos, rótulo longo ou relógio
/// anterior a 1970; o publisher conta o erro e segue.
pub fn encode_sample(sample: &Sample) -> Result<Vec<u8>, ProtocolError> {
    let since_epoch = sample
        .timestamp
        .duration_since(UNIX_EPOCH)
        .map_err(|_| ProtocolError::BeforeEpoch)?;

    let body = WireBody {
        secs: since_epoch.as_secs(),
        nanos: since_epoch.subsec_nanos(),
        axes: sample.wrench.to_array(),
        label: &sample.source_label,
    };
    body.validate()?;

    let mut frame = Vec::with_capacity(HEADER_LEN + FIXED_BODY_LEN + body.label.len());
    frame.extend_from_slice(&[MAGIC_BYTE, PROTOCOL_VERSION]);
    wire()
        .serialize_into(&mut frame, &body)
        .map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    Ok(frame)
}

/// Decodifica um frame recebido via UDP.
pub fn decode_sample(data: &[u8]) -> Result<Sample, ProtocolError> {
    let [magic, version, body @ ..] = data else {
        return Err(ProtocolError::TooShort(data.len()));
    };
    if *magic != MAGIC_BYTE {
        return Err(ProtocolError::InvalidMagic(*magic));
    }
    if *version != PROTOCOL_VERSION {
        return Err(ProtocolError::VersionMismatch(*version));
    }
    if body.len() < FIXED_BODY_LEN {
        return Err(ProtocolError::TooShort(data.len()));
    }

    let body: WireBody = wire()
        .deserialize(body)
        .map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    body.validate()?;
    body.into_sample()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SENSOR_FRAME_ID;
    use std::time::SystemTime;

    const AXES_AT: usize = 14;
    const LEN_AT: usize = 62;

    fn sample() -> Sample {
        Sample::new(
            Wrench::from_array([1.5, -2.5, 9.81, 0.125, -0.25, 0.0]),
            UNIX_EPOCH + Duration::new(1_700_000_000, 250_000_001),
            SENSOR_FRAME_ID,
        )
    }

    fn put_f64(frame: &mut [u8], axis: usize, value: f64) {
        let at = AXES_AT + axis * 8;
        frame[at..at + 8].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn layout_matches_documented_offsets() {
        let frame = encode_sample(&sample()).unwrap();

        assert_eq!(frame.len(), HEADER_LEN + FIXED_BODY_LEN + SENSOR_FRAME_ID.len());
        assert_eq!(&frame[..2], &[MAGIC_BYTE, PROTOCOL_VERSION]);
        assert_eq!(frame[2..10], 1_700_000_000u64.to_le_bytes());
        assert_eq!(frame[10..14], 250_000_001u32.to_le_bytes());
        assert_eq!(frame[AXES_AT + 16..AXES_AT + 24], 9.81f64.to_le_bytes());
        assert_eq!(frame[LEN_AT..LEN_AT + 8], (SENSOR_FRAME_ID.len() as u64).to_le_bytes());
        assert_eq!(&frame[LEN_AT + 8..], SENSOR_FRAME_ID.as_bytes());
    }

    #[test]
    fn decode_keeps_axis_order_and_nanoseconds() {
        let decoded = decode_sample(&encode_sample(&sample()).unwrap()).unwrap();
        assert_eq!(decoded.wrench.to_array(), [1.5, -2.5, 9.81, 0.125, -0.25, 0.0]);
        assert_eq!(
            decoded.timestamp.duration_since(UNIX_EPOCH).unwrap(),
            Duration::new(1_700_000_000, 250_000_001)
        );
        assert_eq!(decoded.source_label, SENSOR_FRAME_ID);
    }

    #[test]
    fn rejects_foreign_or_truncated_headers() {
        let frame = encode_sample(&sample()).unwrap();

        assert_eq!(decode_sample(&[]), Err(ProtocolError::TooShort(0)));
        assert_eq!(decode_sample(&[MAGIC_BYTE]), Err(ProtocolError::TooShort(1)));
        assert_eq!(decode_sample(&frame[..40]), Err(ProtocolError::TooShort(40)));

        let mut other = frame.clone();
        other[0] = 0x54;
        assert_eq!(decode_sample(&other), Err(ProtocolError::InvalidMagic(0x54)));

        let mut old = frame;
        old[1] = 1;
        assert_eq!(decode_sample(&old), Err(ProtocolError::VersionMismatch(1)));
    }

    #[test]
    fn non_finite_axes_never_cross_the_wire() {
        let mut nan = sample();
        nan.wrench.torque.y = f64::NAN;
        assert_eq!(encode_sample(&nan), Err(ProtocolError::NonFinite { axis: 4 }));

        let mut frame = encode_sample(&sample()).unwrap();
        put_f64(&mut frame, 2, f64::INFINITY);
        assert_eq!(decode_sample(&frame), Err(ProtocolError::NonFinite { axis: 2 }));
    }

    #[test]
    fn label_is_bounded_both_ways() {
        let long = "x".repeat(MAX_LABEL_LEN + 1);
        let mut s = sample();
        s.source_label = long.clone();
        assert_eq!(encode_sample(&s), Err(ProtocolError::LabelTooLong(MAX_LABEL_LEN + 1)));

        let mut frame = encode_sample(&sample()).unwrap();
        frame.truncate(LEN_AT);
        frame.extend_from_slice(&(long.len() as u64).to_le_bytes());
        frame.extend_from_slice(long.as_bytes());
        assert_eq!(decode_sample(&frame), Err(ProtocolError::LabelTooLong(MAX_LABEL_LEN + 1)));
    }

    #[test]
    fn rejects_trailing_bytes_and_bad_label_length() {
        let mut frame = encode_sample(&sample()).unwrap();
        frame.push(0);
        assert!(matches!(decode_sample(&frame), Err(ProtocolError::Malformed(_))));

        let mut frame = encode_sample(&sample()).unwrap();
        frame[LEN_AT..LEN_AT + 8].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(decode_sample(&frame), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn rejects_impossible_timestamps() {
        let mut frame = encode_sample(&sample()).unwrap();
        frame[10..14].copy_from_slice(&NANOS_PER_SEC.to_le_bytes());
        assert_eq!(decode_sample(&frame), Err(ProtocolError::InvalidTimestamp));

        let mut early = sample();
        early.timestamp = UNIX_EPOCH - Duration::from_secs(1);
        assert_eq!(encode_sample(&early), Err(ProtocolError::BeforeEpoch));

        // Recepção "agora" sempre codifica
        let now = Sample::new(Wrench::default(), SystemTime::now(), SENSOR_FRAME_ID);
        assert!(encode_sample(&now).is_ok());
    }
}
