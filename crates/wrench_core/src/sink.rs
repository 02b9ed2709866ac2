//! Destino das amostras publicadas pela sessão de aquisição.

use crate::types::Sample;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::debug;

/// Consumidor de amostras.
///
/// `publish` é fire-and-forget: não retorna erro e não deve bloquear o
/// loop de aquisição de forma perceptível.
pub trait SampleSink {
    fn publish(&mut self, sample: &Sample);
}

impl<S: SampleSink + ?Sized> SampleSink for Box<S> {
    fn publish(&mut self, sample: &Sample) {
        (**self).publish(sample);
    }
}

/// Sink em processo sobre um channel limitado.
///
/// Para consumidores no mesmo processo (integrações e testes que rodam a
/// sessão sobre TCP real); os binários publicam via UDP. Se o consumidor
/// está lento, amostras novas são descartadas e contadas.
pub struct ChannelSink {
    tx: Sender<Sample>,
    dropped: u64,
}

impl ChannelSink {
    /// Cria o sink e o receiver correspondente.
    pub fn bounded(capacity: usize) -> (Self, Receiver<Sample>) {
        let (tx, rx) = bounded(capacity);
        (
            Self {
                tx,
                dropped: 0,
            },
            rx,
        )
    }

    /// Total de amostras descartadas por channel cheio ou desconectado.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl SampleSink for ChannelSink {
    fn publish(&mut self, sample: &Sample) {
        match self.tx.try_send(sample.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                debug!("Channel cheio, descartando amostra");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
                debug!("Consumidor desconectado, descartando amostra");
            }
        }
    }
}
