//! Protocolo ASCII do sensor KMS40 (uma mensagem por linha).
//!
//! ```text
//! cliente → sensor:  L1()                      inicia streaming
//!                    L0()                      encerra streaming
//! sensor → cliente:  L1 ...                    confirmação do modo
//!                    F={fx,fy,fz,tx,ty,tz},t   registro de dados
//! ```
//!
//! O parser é uma função pura: não faz I/O e não guarda estado. Linhas
//! com outro prefixo ou com conteúdo numérico inválido falham inteiras,
//! nunca produzem amostra parcial.

use crate::types::{Sample, Wrench};
use std::time::SystemTime;

/// Comando que coloca o sensor em modo de publicação contínua.
pub const START_COMMAND: &str = "L1()";

/// Comando que encerra a publicação contínua.
pub const STOP_COMMAND: &str = "L0()";

/// Token esperado na resposta ao [`START_COMMAND`].
pub const ACK_TOKEN: &str = "L1";

/// Prefixo de um registro de dados.
pub const DATA_PREFIX: &str = "F=";

/// Número de componentes numéricos por registro (Fx..Tz).
const AXES: usize = 6;

/// Erros de parse de uma linha.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LineError {
    #[error("Linha vazia")]
    Empty,

    #[error("Token não reconhecido: {0:?}")]
    UnrecognizedToken(String),

    #[error("Registro sem chaves {{...}}")]
    MissingBraces,

    #[error("Número de campos inválido: {found} (esperado {expected})")]
    FieldCount { expected: usize, found: usize },

    #[error("Campo {index} não numérico: {token:?}")]
    InvalidNumber { index: usize, token: String },

    #[error("Campo {index} fora do intervalo representável")]
    NonFinite { index: usize },

    #[error("Timestamp inválido: {0:?}")]
    InvalidTimestamp(String),
}

/// Converte uma linha recebida em [`Sample`].
///
/// `received_at` vira o timestamp da amostra; o contador `t` enviado pelo
/// sensor é validado e descartado.
pub fn parse_line(
    line: &str,
    received_at: SystemTime,
    source_label: &str,
) -> Result<Sample, LineError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(LineError::Empty);
    }

    let Some(body) = line.strip_prefix(DATA_PREFIX) else {
        return Err(LineError::UnrecognizedToken(line.to_string()));
    };

    let wrench = parse_record(body)?;
    Ok(Sample::new(wrench, received_at, source_label))
}

/// Verifica se a resposta ao comando de início confirma o modo `L1`.
///
/// O primeiro token da resposta (letras e dígitos) precisa ser exatamente
/// [`ACK_TOKEN`]: `L1`, `L1()` e `L1 OK` confirmam; `L10` e `XL1` não.
pub fn is_acknowledgment(reply: &str) -> bool {
    reply
        .trim()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .next()
        .is_some_and(|token| token == ACK_TOKEN)
}

/// Interpreta `{f1,f2,f3,f4,f5,f6},t`.
fn parse_record(body: &str) -> Result<Wrench, LineError> {
    let inner = body.strip_prefix('{').ok_or(LineError::MissingBraces)?;
    let (fields, tail) = inner.split_once('}').ok_or(LineError::MissingBraces)?;

    let found = fields.split(',').count();
    if found != AXES {
        return Err(LineError::FieldCount {
            expected: AXES,
            found,
        });
    }

    let mut values = [0.0; AXES];
    for (index, token) in fields.split(',').enumerate() {
        values[index] = parse_component(index, token)?;
    }

    let stamp = tail
        .strip_prefix(',')
        .map(str::trim)
        .ok_or_else(|| LineError::InvalidTimestamp(tail.to_string()))?;
    stamp
        .parse::<i64>()
        .map_err(|_| LineError::InvalidTimestamp(stamp.to_string()))?;

    Ok(Wrench::from_array(values))
}

fn parse_component(index: usize, token: &str) -> Result<f64, LineError> {
    let token = token.trim();
    let value = token
        .parse::<f64>()
        .map_err(|_| LineError::InvalidNumber {
            index,
            token: token.to_string(),
        })?;

    // "inf", "nan" e overflow (ex: 1e999) são aceitos por f64::from_str
    if !value.is_finite() {
        return Err(LineError::NonFinite { index });
    }
    Ok(value)
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
