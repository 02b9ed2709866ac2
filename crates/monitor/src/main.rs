//! # Wrench Monitor
//!
//! Recebe as amostras republicadas pelo acquirer via UDP e imprime, a cada
//! intervalo, taxa de recepção, última amostra e médias da janela.
//!
//! ## Uso
//! ```bash
//! wrench_monitor                        # config.toml ao lado do executável
//! wrench_monitor --config /etc/kms.toml
//! ```

mod net_thread;
mod window;

use crossbeam_channel::RecvTimeoutError;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};
use tracing::{error, info, warn};
use window::{SampleWindow, fmt_vec};
use wrench_core::config::{AppConfig, MonitorConfig};

fn config_path() -> PathBuf {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == "--config" || a == "-c")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_path)
}

fn main() {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Config ──
    let config = AppConfig::load(&config_path());
    let cfg = config.monitor;

    let rx = match net_thread::spawn_receiver_thread(cfg.port, cfg.sender_ip.clone()) {
        Ok(rx) => rx,
        Err(e) => {
            error!("Falha ao criar thread de rede: {e}");
            std::process::exit(1);
        }
    };

    run(&rx, &cfg);
}

fn run(rx: &crossbeam_channel::Receiver<net_thread::NetMessage>, cfg: &MonitorConfig) {
    let interval = Duration::try_from_secs_f64(cfg.print_interval_secs).unwrap_or(Duration::from_secs(1));
    let stale_after = Duration::try_from_secs_f64(cfg.stale_after_secs).unwrap_or(Duration::from_secs(2));

    let mut window = SampleWindow::new(cfg.window);
    let mut last_data: Option<Instant> = None;
    let mut last_report = Instant::now();
    let mut source = String::new();
    let mut bytes = 0usize;
    let mut stale_warned = false;

    loop {
        match rx.recv_timeout(interval) {
            Ok(msg) => {
                if msg.source_addr != source {
                    info!("Recebendo de {}", msg.source_addr);
                    source = msg.source_addr;
                }
                bytes = msg.raw_size;
                window.push(msg.sample);
                last_data = Some(Instant::now());
                stale_warned = false;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Thread de rede encerrada");
                return;
            }
        }

        if last_report.elapsed() < interval {
            continue;
        }
        let elapsed = last_report.elapsed().as_secs_f64();
        last_report = Instant::now();

        match last_data {
            Some(t) if t.elapsed() > stale_after => {
                if !stale_warned {
                    warn!("Sem dados há {:.1}s", t.elapsed().as_secs_f64());
                    stale_warned = true;
                }
                continue;
            }
            None => {
                info!("Aguardando amostras na porta {}...", cfg.port);
                continue;
            }
            Some(_) => {}
        }

        report(&mut window, elapsed, bytes);
    }
}

fn report(window: &mut SampleWindow, elapsed_secs: f64, frame_bytes: usize) {
    let rate = window.take_since_report() as f64 / elapsed_secs.max(f64::EPSILON);
    let (Some(last), Some(mean)) = (window.last(), window.mean()) else {
        return;
    };

    let latency_ms = SystemTime::now()
        .duration_since(last.timestamp)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0);

    println!(
        "[{}] {:6.1} Hz | {} B | atraso {:5.1} ms | total {}",
        last.source_label,
        rate,
        frame_bytes,
        latency_ms,
        window.total()
    );
    println!("  F  {}   média {}", fmt_vec(&last.force()), fmt_vec(&mean.force));
    println!("  T  {}   média {}", fmt_vec(&last.torque()), fmt_vec(&mean.torque));
    println!("  |F| pico na janela: {:.3}", window.peak_force());
}
