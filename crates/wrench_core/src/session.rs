//! Sessão de aquisição do KMS40.
//!
//! Máquina de estados explícita:
//!
//! ```text
//! Disconnected → Connecting → Handshaking → Streaming → TearingDown → Disconnected
//!      │              │             │                        │
//!      │              └─ falha ─────┴─ espera retry_interval ─┴─ (falha de I/O) ─→ Disconnected
//!      └─ shutdown → Stopped
//!
//! Dummy → Dummy → ... → Stopped        (modo dummy, sem rede)
//! ```
//!
//! [`AcquisitionSession::step`] é a única função de transição: decide entre
//! reconectar, continuar ou encerrar. Erros de socket chegam como
//! [`SessionError`](crate::transport::SessionError) e nenhum deles encerra
//! o processo.

use crate::config::AppConfig;
use crate::line::{START_COMMAND, STOP_COMMAND, is_acknowledgment, parse_line};
use crate::shutdown::ShutdownToken;
use crate::sink::SampleSink;
use crate::types::{Sample, Wrench};
use crate::transport::{Connection, Connector};
use std::fmt;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

// ──────────────────────────────────────────────
// Relógio
// ──────────────────────────────────────────────

/// Fonte de tempo e espera usada pela sessão.
pub trait Timer {
    fn now(&self) -> Instant;

    /// Dorme até `duration` ou até o cancelamento. Retorna `false` se cancelado.
    fn sleep(&mut self, duration: Duration, shutdown: &ShutdownToken) -> bool;
}

/// Relógio do sistema.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimer;

impl Timer for SystemTimer {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration, shutdown: &ShutdownToken) -> bool {
        shutdown.sleep(duration)
    }
}

// ──────────────────────────────────────────────
// Estados
// ──────────────────────────────────────────────

/// Estado da sessão. Os estados com conexão são donos exclusivos dela.
pub enum SessionState<C> {
    Disconnected,
    Connecting,
    Handshaking(C),
    Streaming(C),
    TearingDown(C, TeardownCause),
    Dummy,
    Stopped,
}

/// Motivo do teardown: decide se a reconexão espera `retry_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownCause {
    Shutdown,
    Fault,
}

/// Fase da sessão, sem a conexão.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    Connecting,
    Handshaking,
    Streaming,
    TearingDown,
    Dummy,
    Stopped,
}

impl<C> SessionState<C> {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Disconnected => Phase::Disconnected,
            Self::Connecting => Phase::Connecting,
            Self::Handshaking(_) => Phase::Handshaking,
            Self::Streaming(_) => Phase::Streaming,
            Self::TearingDown(..) => Phase::TearingDown,
            Self::Dummy => Phase::Dummy,
            Self::Stopped => Phase::Stopped,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Disconnected => "Disconnected",
            Phase::Connecting => "Connecting",
            Phase::Handshaking => "Handshaking",
            Phase::Streaming => "Streaming",
            Phase::TearingDown => "TearingDown",
            Phase::Dummy => "Dummy",
            Phase::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

// ──────────────────────────────────────────────
// Parâmetros e estatísticas
// ──────────────────────────────────────────────

/// Vetor fixo publicado no modo dummy.
#[derive(Debug, Clone)]
pub struct DummySettings {
    pub wrench: Wrench,
    pub frame_id: String,
}

/// Parâmetros da sessão derivados da configuração.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Espera após falha de conexão, de handshake ou de leitura no stream
    pub retry_interval: Duration,
    /// Período mínimo de cada iteração de Streaming/Dummy
    pub period: Duration,
    /// Rótulo das amostras do sensor
    pub frame_id: String,
    /// `Some` ativa o modo dummy
    pub dummy: Option<DummySettings>,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            retry_interval: config.sensor.retry_interval(),
            period: config.sensor.period(),
            frame_id: config.sensor.frame_id.clone(),
            dummy: config.dummy.enabled.then(|| DummySettings {
                wrench: config.dummy.wrench(),
                frame_id: config.dummy.frame_id.clone(),
            }),
        }
    }
}

/// Contadores acumulados desde o início da sessão.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub connect_attempts: u64,
    pub connect_failures: u64,
    pub handshake_failures: u64,
    pub samples_published: u64,
    pub lines_discarded: u64,
    pub teardowns: u64,
}

// ──────────────────────────────────────────────
// Sessão
// ──────────────────────────────────────────────

/// Dona da conexão com o sensor; publica cada amostra válida no sink.
pub struct AcquisitionSession<K: Connector, S: SampleSink, T: Timer> {
    connector: K,
    sink: S,
    timer: T,
    settings: SessionSettings,
    shutdown: ShutdownToken,
    stats: SessionStats,
}

impl<K: Connector, S: SampleSink, T: Timer> AcquisitionSession<K, S, T> {
    pub fn new(
        connector: K,
        sink: S,
        timer: T,
        settings: SessionSettings,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            connector,
            sink,
            timer,
            settings,
            shutdown,
            stats: SessionStats::default(),
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Estado inicial: modo dummy (se configurado) ou desconectado.
    pub fn initial_state(&self) -> SessionState<K::Conn> {
        if self.settings.dummy.is_some() {
            SessionState::Dummy
        } else {
            SessionState::Disconnected
        }
    }

    /// Executa a máquina de estados até o shutdown.
    pub fn run(&mut self) -> SessionStats {
        let mut state = self.initial_state();
        if state.phase() == Phase::Dummy {
            info!("Modo dummy ativo, publicando valores estáticos de teste...");
        }

        loop {
            let from = state.phase();
            state = self.step(state);
            let to = state.phase();
            if from != to {
                debug!("{from} → {to}");
            }
            if to == Phase::Stopped {
                break;
            }
        }

        info!(
            "Sessão encerrada: {} amostras, {} linhas descartadas, {} tentativas de conexão",
            self.stats.samples_published, self.stats.lines_discarded, self.stats.connect_attempts
        );
        self.stats.clone()
    }

    /// Função de transição: consome o estado atual e retorna o próximo.
    pub fn step(&mut self, state: SessionState<K::Conn>) -> SessionState<K::Conn> {
        match state {
            SessionState::Disconnected => {
                if self.shutdown.is_running() {
                    SessionState::Connecting
                } else {
                    SessionState::Stopped
                }
            }
            SessionState::Connecting => self.connect(),
            SessionState::Handshaking(conn) => self.handshake(conn),
            SessionState::Streaming(conn) => self.stream_once(conn),
            SessionState::TearingDown(conn, cause) => self.tear_down(conn, cause),
            SessionState::Dummy => self.dummy_once(),
            SessionState::Stopped => SessionState::Stopped,
        }
    }

    fn connect(&mut self) -> SessionState<K::Conn> {
        if !self.shutdown.is_running() {
            return SessionState::Disconnected;
        }

        self.stats.connect_attempts += 1;
        info!("Conectando ao KMS40 em {}...", self.connector.target());

        match self.connector.connect() {
            Ok(conn) => {
                info!("Conexão estabelecida");
                SessionState::Handshaking(conn)
            }
            Err(e) => {
                self.stats.connect_failures += 1;
                warn!(
                    "{e}. Nova tentativa em {:.1}s...",
                    self.settings.retry_interval.as_secs_f64()
                );
                self.backoff();
                SessionState::Disconnected
            }
        }
    }

    fn handshake(&mut self, mut conn: K::Conn) -> SessionState<K::Conn> {
        info!("Iniciando aquisição de dados");

        let reply = conn
            .send_line(START_COMMAND)
            .and_then(|()| conn.read_line());

        match reply {
            Ok(reply) if is_acknowledgment(&reply) => {
                info!("Modo de aquisição confirmado pelo KMS40");
                SessionState::Streaming(conn)
            }
            Ok(reply) => {
                warn!("Modo de aquisição não confirmado pelo KMS40 (resposta {reply:?}). Reconectando.");
                self.abandon_handshake(conn)
            }
            Err(e) => {
                warn!("Falha no handshake: {e}. Reconectando.");
                self.abandon_handshake(conn)
            }
        }
    }

    fn abandon_handshake(&mut self, conn: K::Conn) -> SessionState<K::Conn> {
        self.stats.handshake_failures += 1;
        drop(conn);
        self.backoff();
        SessionState::Disconnected
    }

    fn stream_once(&mut self, mut conn: K::Conn) -> SessionState<K::Conn> {
        if !self.shutdown.is_running() {
            return SessionState::TearingDown(conn, TeardownCause::Shutdown);
        }

        let started = self.timer.now();
        let line = match conn.read_line() {
            Ok(line) => line,
            Err(e) => {
                warn!("Erro na leitura do stream: {e}");
                return SessionState::TearingDown(conn, TeardownCause::Fault);
            }
        };

        match parse_line(&line, SystemTime::now(), &self.settings.frame_id) {
            Ok(sample) => {
                self.sink.publish(&sample);
                self.stats.samples_published += 1;
            }
            Err(e) => {
                self.stats.lines_discarded += 1;
                warn!("Linha descartada: {e}");
            }
        }

        self.pace(started);
        SessionState::Streaming(conn)
    }

    fn tear_down(&mut self, mut conn: K::Conn, cause: TeardownCause) -> SessionState<K::Conn> {
        self.stats.teardowns += 1;
        match conn.send_line(STOP_COMMAND) {
            Ok(()) => info!("Comando de desligamento enviado ao KMS40"),
            Err(e) => debug!("Comando de desligamento não enviado: {e}"),
        }
        drop(conn);

        if cause == TeardownCause::Fault {
            info!(
                "Reconectando em {:.1}s...",
                self.settings.retry_interval.as_secs_f64()
            );
            self.backoff();
        }
        SessionState::Disconnected
    }

    fn dummy_once(&mut self) -> SessionState<K::Conn> {
        if !self.shutdown.is_running() {
            return SessionState::Stopped;
        }
        let Some(dummy) = &self.settings.dummy else {
            return SessionState::Disconnected;
        };

        let started = self.timer.now();
        let sample = Sample::new(dummy.wrench, SystemTime::now(), dummy.frame_id.as_str());
        self.sink.publish(&sample);
        self.stats.samples_published += 1;

        self.pace(started);
        SessionState::Dummy
    }

    fn backoff(&mut self) {
        self.timer.sleep(self.settings.retry_interval, &self.shutdown);
    }

    /// Dorme o restante do período da iteração iniciada em `started`.
    fn pace(&mut self, started: Instant) {
        let elapsed = self.timer.now().saturating_duration_since(started);
        if elapsed < self.settings.period {
            self.timer.sleep(self.settings.period - elapsed, &self.shutdown);
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
