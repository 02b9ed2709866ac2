//! Thread de rede que escuta UDP e envia amostras para o loop principal via channel.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::net::UdpSocket;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use wrench_core::protocol::decode_sample;
use wrench_core::types::Sample;

/// Mensagem enviada da thread de rede para o loop principal.
#[derive(Debug, Clone)]
pub struct NetMessage {
    pub sample: Sample,
    pub source_addr: String,
    pub raw_size: usize,
}

/// Inicia a thread de rede. Retorna o receiver do channel.
pub fn spawn_receiver_thread(port: u16, sender_ip_filter: String) -> std::io::Result<Receiver<NetMessage>> {
    // ~2 s de amostras a 500 Hz
    let (tx, rx) = bounded::<NetMessage>(1024);

    std::thread::Builder::new()
        .name("udp-receiver".into())
        .spawn(move || {
            receiver_loop(&tx, port, &sender_ip_filter);
        })?;

    Ok(rx)
}

fn receiver_loop(tx: &Sender<NetMessage>, port: u16, sender_ip_filter: &str) {
    loop {
        match UdpSocket::bind(format!("0.0.0.0:{port}")) {
            Ok(sock) => {
                sock.set_read_timeout(Some(Duration::from_secs(1))).ok();

                let mode = if sender_ip_filter.is_empty() {
                    "qualquer origem"
                } else {
                    sender_ip_filter
                };
                info!("Monitor escutando em 0.0.0.0:{port} – Origem: {mode}");

                if !receive(&sock, tx, sender_ip_filter) {
                    return;
                }
            }
            Err(e) => {
                error!("Falha ao bind porta {port}: {e}. Tentando novamente em 2s...");
                std::thread::sleep(Duration::from_secs(2));
            }
        }
    }
}

/// Lê frames até o consumidor sumir. Retorna `false` quando o channel fecha.
fn receive(sock: &UdpSocket, tx: &Sender<NetMessage>, sender_ip_filter: &str) -> bool {
    let mut buf = [0u8; 2048];
    loop {
        match sock.recv_from(&mut buf) {
            Ok((size, addr)) => {
                let source = addr.ip().to_string();

                // Filtro de IP se configurado
                if !sender_ip_filter.is_empty() && source != sender_ip_filter {
                    debug!("Ignorando pacote de {source} (esperado: {sender_ip_filter})");
                    continue;
                }

                match decode_sample(&buf[..size]) {
                    Ok(sample) => {
                        let msg = NetMessage {
                            sample,
                            source_addr: source,
                            raw_size: size,
                        };
                        match tx.try_send(msg) {
                            Ok(()) => {}
                            Err(crossbeam_channel::TrySendError::Full(_)) => {
                                debug!("Channel cheio, descartando pacote");
                            }
                            Err(crossbeam_channel::TrySendError::Disconnected(_)) => return false,
                        }
                    }
                    Err(e) => {
                        debug!("Pacote inválido de {source}: {e}");
                    }
                }
            }
            Err(ref e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                // Timeout normal, continua
            }
            Err(e) => {
                warn!("Erro ao receber UDP: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;
    use wrench_core::protocol::encode_sample;
    use wrench_core::types::Wrench;

    #[test]
    fn forwards_valid_frames_and_drops_garbage() {
        let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
        sock.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
        let addr = sock.local_addr().unwrap();
        let (tx, rx) = bounded(8);

        let handle = std::thread::spawn(move || receive(&sock, &tx, "127.0.0.1"));

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sample = Sample::new(
            Wrench::from_array([0.0, 0.0, 9.8, 0.0, 0.0, 0.0]),
            UNIX_EPOCH,
            "dummyFrame",
        );
        sender.send_to(b"lixo", addr).unwrap();
        sender.send_to(&encode_sample(&sample).unwrap(), addr).unwrap();

        let msg = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(msg.sample, sample);
        assert_eq!(msg.source_addr, "127.0.0.1");
        assert!(rx.try_recv().is_err());

        // Consumidor encerrado: a próxima amostra termina o loop
        drop(rx);
        sender.send_to(&encode_sample(&sample).unwrap(), addr).unwrap();
        assert!(!handle.join().unwrap());
    }
}
