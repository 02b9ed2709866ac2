//! # Wrench Acquirer
//!
//! Conecta ao sensor de força/torque KMS40 via TCP, inicia a aquisição
//! contínua e republica cada amostra via UDP. Reconecta sozinho quando o
//! sensor é desligado ou a rede cai.
//!
//! ## Uso
//! ```bash
//! wrench_acquirer                        # config.toml ao lado do executável
//! wrench_acquirer --config /etc/kms.toml
//! wrench_acquirer --dummy                # publica dummy.values sem sensor
//! ```

mod publisher;

use publisher::UdpPublisher;
use std::path::PathBuf;
use wrench_core::config::AppConfig;
use wrench_core::session::{AcquisitionSession, SessionSettings, SystemTimer};
use wrench_core::transport::TcpConnector;
use wrench_core::shutdown::ShutdownToken;
use tracing::{error, info, warn};

/// Argumentos de linha de comando.
struct Args {
    config_path: Option<PathBuf>,
    dummy: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config_path: None,
        dummy: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" if i + 1 < args.len() => {
                parsed.config_path = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            "--dummy" => parsed.dummy = true,
            other => warn!("Argumento ignorado: {other}"),
        }
        i += 1;
    }

    parsed
}

fn main() {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args();

    // ── Carregar config ──
    let config_path = args.config_path.unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    if args.dummy {
        config.dummy.enabled = true;
    }

    for problem in config.validate() {
        warn!("Config: {problem}");
    }

    // ── Encerramento ──
    let shutdown = ShutdownToken::new();
    let handler_token = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Sinal de encerramento recebido");
        handler_token.cancel();
    }) {
        warn!("Falha ao registrar handler de Ctrl-C: {e}");
    }

    // ── Socket UDP ──
    let publisher = match UdpPublisher::bind(&config.publisher) {
        Ok(publisher) => publisher,
        Err(e) => {
            error!("Falha ao criar socket UDP: {e}");
            std::process::exit(1);
        }
    };

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚡ WRENCH ACQUIRER – ATIVO");
    println!("══════════════════════════════════════════════");
    if config.dummy.enabled {
        println!("  Fonte:     DUMMY {:?}", config.dummy.wrench().to_array());
    } else {
        println!("  Sensor:    {}", config.sensor.address());
    }
    println!("  Destino:   {}", publisher.dest_addr());
    println!("  Taxa máx.: {:.0} Hz", config.sensor.rate_hz);
    println!("  Protocolo: bincode v{}", wrench_core::PROTOCOL_VERSION);
    println!("══════════════════════════════════════════════");
    println!();

    // ── Loop principal ──
    let mut session = AcquisitionSession::new(
        TcpConnector::from_config(&config),
        publisher,
        SystemTimer,
        SessionSettings::from_config(&config),
        shutdown,
    );
    session.run();

    let publisher = session.sink();
    info!(
        "Frames UDP enviados: {} ({} erros)",
        publisher.sent(),
        publisher.errors()
    );
}
