//! Transporte orientado a linhas até o sensor.
//!
//! [`Connector`] e [`Connection`] isolam o socket da máquina de estados;
//! falhas chegam como [`SessionError`] em vez de pânico.

use crate::config::AppConfig;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Maior linha aceita do sensor (bytes, sem o terminador).
pub const MAX_LINE_LEN: usize = 1024;

// ──────────────────────────────────────────────
// Erros
// ──────────────────────────────────────────────

/// Falhas de conexão e de I/O com o sensor.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Endereço inválido {addr}: {reason}")]
    Address { addr: String, reason: String },

    #[error("Falha ao conectar em {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Conexão encerrada pelo sensor")]
    Closed,

    #[error("Linha sem terminador após {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("Erro de I/O: {0}")]
    Io(#[from] std::io::Error),
}

// ──────────────────────────────────────────────
// Transporte
// ──────────────────────────────────────────────

/// Conexão ativa com o sensor, orientada a linhas.
pub trait Connection {
    /// Envia `line` seguida de quebra de linha.
    fn send_line(&mut self, line: &str) -> Result<(), SessionError>;

    /// Bloqueia até a próxima linha (sem o terminador) ou falha de I/O.
    fn read_line(&mut self) -> Result<String, SessionError>;
}

/// Fábrica de conexões; cada tentativa gera uma [`Connection`] nova.
pub trait Connector {
    type Conn: Connection;

    fn connect(&mut self) -> Result<Self::Conn, SessionError>;

    /// Descrição do destino para logs.
    fn target(&self) -> String;
}

/// Conector TCP real.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    connect_timeout: Duration,
    read_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>, connect_timeout: Duration, read_timeout: Option<Duration>) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
            read_timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.sensor.address(),
            config.sensor.connect_timeout(),
            config.sensor.read_timeout(),
        )
    }
}

impl Connector for TcpConnector {
    type Conn = TcpConnection;

    fn connect(&mut self) -> Result<TcpConnection, SessionError> {
        let addrs: Vec<_> = self
            .address
            .to_socket_addrs()
            .map_err(|e| SessionError::Address {
                addr: self.address.clone(),
                reason: e.to_string(),
            })?
            .collect();

        let mut last_err = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, self.connect_timeout) {
                Ok(stream) => return TcpConnection::new(stream, self.read_timeout),
                Err(e) => last_err = Some(e),
            }
        }

        Err(match last_err {
            Some(source) => SessionError::Connect {
                addr: self.address.clone(),
                source,
            },
            None => SessionError::Address {
                addr: self.address.clone(),
                reason: "nenhum endereço resolvido".into(),
            },
        })
    }

    fn target(&self) -> String {
        self.address.clone()
    }
}

/// Conexão TCP com leitura bufferizada por linha.
pub struct TcpConnection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    buf: Vec<u8>,
}

impl TcpConnection {
    fn new(stream: TcpStream, read_timeout: Option<Duration>) -> Result<Self, SessionError> {
        stream.set_read_timeout(read_timeout)?;
        stream.set_nodelay(true)?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            buf: Vec::with_capacity(128),
        })
    }
}

impl Connection for TcpConnection {
    fn send_line(&mut self, line: &str) -> Result<(), SessionError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, SessionError> {
        self.buf.clear();
        let limit = MAX_LINE_LEN as u64 + 2;
        if (&mut self.reader).take(limit).read_until(b'\n', &mut self.buf)? == 0 {
            return Err(SessionError::Closed);
        }
        if self.buf.len() as u64 == limit && !self.buf.ends_with(b"\n") {
            return Err(SessionError::LineTooLong { limit: MAX_LINE_LEN });
        }
        // Bytes inválidos viram U+FFFD e a linha é rejeitada pelo parser
        let line = String::from_utf8_lossy(&self.buf);
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn tcp_connect_refused_is_an_error_value() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let mut connector = TcpConnector::new(addr.to_string(), Duration::from_millis(500), None);
        assert!(matches!(connector.connect(), Err(SessionError::Connect { .. })));
    }

    #[test]
    fn tcp_invalid_address_is_an_error_value() {
        let mut connector = TcpConnector::new("not an address", Duration::from_millis(100), None);
        assert!(matches!(connector.connect(), Err(SessionError::Address { .. })));
    }

    #[test]
    fn reads_lines_without_terminator_and_detects_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"L1\r\nF={1,2,3,4,5,6},7\n\xFF\xFE\n").unwrap();
            let mut cmd = [0u8; 5];
            stream.read_exact(&mut cmd).unwrap();
            cmd
        });

        let mut connector = TcpConnector::new(addr.to_string(), Duration::from_secs(2), Some(Duration::from_secs(5)));
        let mut conn = connector.connect().unwrap();
        conn.send_line("L0()").unwrap();

        assert_eq!(conn.read_line().unwrap(), "L1");
        assert_eq!(conn.read_line().unwrap(), "F={1,2,3,4,5,6},7");
        assert_eq!(conn.read_line().unwrap(), "\u{FFFD}\u{FFFD}");
        assert_eq!(&server.join().unwrap(), b"L0()\n");
        assert!(matches!(conn.read_line(), Err(SessionError::Closed)));
    }

    #[test]
    fn runaway_line_is_cut_at_the_limit() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut payload = format!("{}\r\n", "A".repeat(MAX_LINE_LEN)).into_bytes();
            payload.extend(std::iter::repeat_n(b'F', MAX_LINE_LEN * 4));
            stream.write_all(&payload).unwrap();
            stream
        });

        let mut connector = TcpConnector::new(addr.to_string(), Duration::from_secs(2), Some(Duration::from_secs(5)));
        let mut conn = connector.connect().unwrap();

        // Exatamente no limite, com \r\n, ainda é uma linha válida
        assert_eq!(conn.read_line().unwrap().len(), MAX_LINE_LEN);
        assert!(matches!(
            conn.read_line(),
            Err(SessionError::LineTooLong { limit: MAX_LINE_LEN })
        ));
        drop(server.join().unwrap());
    }
}
