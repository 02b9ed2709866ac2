//! Sink UDP: republica cada amostra como frame bincode.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use tracing::{debug, info};
use wrench_core::config::PublisherConfig;
use wrench_core::protocol::encode_sample;
use wrench_core::sink::SampleSink;
use wrench_core::types::Sample;

/// Publica amostras via UDP unicast ou broadcast.
pub struct UdpPublisher {
    sock: UdpSocket,
    dest_addr: SocketAddr,
    sent: u64,
    errors: u64,
}

impl UdpPublisher {
    /// Resolve o destino uma única vez; `publish` nunca consulta DNS.
    pub fn bind(cfg: &PublisherConfig) -> io::Result<Self> {
        let dest_addr = (cfg.dest_ip.as_str(), cfg.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("destino sem endereço: {}:{}", cfg.dest_ip, cfg.port),
                )
            })?;

        let sock = UdpSocket::bind(if cfg.bind_ip.is_empty() {
            "0.0.0.0:0".to_string()
        } else {
            format!("{}:0", cfg.bind_ip)
        })?;

        if cfg.is_broadcast() {
            sock.set_broadcast(true)?;
            info!("Modo BROADCAST ativado");
        } else {
            info!("Modo UNICAST → {dest_addr}");
        }

        Ok(Self {
            sock,
            dest_addr,
            sent: 0,
            errors: 0,
        })
    }

    pub fn dest_addr(&self) -> SocketAddr {
        self.dest_addr
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }
}

impl SampleSink for UdpPublisher {
    fn publish(&mut self, sample: &Sample) {
        let frame = match encode_sample(sample) {
            Ok(frame) => frame,
            Err(e) => {
                self.errors += 1;
                debug!("Erro ao serializar amostra: {e}");
                return;
            }
        };

        match self.sock.send_to(&frame, self.dest_addr) {
            Ok(_) => self.sent += 1,
            Err(e) => {
                self.errors += 1;
                debug!("Erro ao enviar UDP para {}: {e}", self.dest_addr);
            }
        }
    }
}
