//! # Wrench Core
//!
//! Núcleo de aquisição de um sensor de força/torque KMS40: protocolo ASCII
//! por linhas, sessão de aquisição com reconexão automática, tipos de
//! amostra e frame binário (bincode) para republicação.
//!
//! ## Módulos
//! - [`types`] – Vetores, wrench e amostra
//! - [`line`] – Parser de linhas e comandos do protocolo do sensor
//! - [`transport`] – Conexão TCP orientada a linhas com o sensor
//! - [`session`] – Máquina de estados conexão → handshake → streaming → teardown
//! - [`sink`] – Trait de destino das amostras
//! - [`protocol`] – Encode/decode binário com magic byte
//! - [`config`] – Configuração unificada via TOML
//! - [`shutdown`] – Token de encerramento

pub mod types;
pub mod line;
pub mod transport;
pub mod session;
pub mod sink;
pub mod protocol;
pub mod config;
pub mod shutdown;

// Re-exports convenientes
pub use types::{Sample, Vector3, Wrench};
pub use line::{LineError, parse_line};
pub use protocol::{PROTOCOL_VERSION, decode_sample, encode_sample};
pub use config::AppConfig;
pub use session::{AcquisitionSession, SessionSettings, SessionStats, SystemTimer};
pub use transport::{SessionError, TcpConnector};
pub use sink::{ChannelSink, SampleSink};
pub use shutdown::ShutdownToken;
