//! Configuração unificada via TOML.
//!
//! Um único `config.toml` ao lado do executável atende o acquirer e o monitor.

use crate::types::{DUMMY_FRAME_ID, SENSOR_FRAME_ID, Wrench};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Conexão com o sensor KMS40.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// IP do sensor
    pub ip: String,
    /// Porta TCP
    pub port: u16,
    /// Timeout de conexão (segundos)
    pub connect_timeout_secs: f64,
    /// Timeout de leitura de linha (segundos, 0 = bloqueia indefinidamente)
    pub read_timeout_secs: f64,
    /// Espera entre tentativas de reconexão (segundos)
    pub retry_interval_secs: f64,
    /// Teto de iterações por segundo do loop de leitura
    pub rate_hz: f64,
    /// Rótulo das amostras do sensor
    pub frame_id: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            ip: "192.168.1.30".into(),
            port: 1000,
            connect_timeout_secs: 3.0,
            read_timeout_secs: 5.0,
            retry_interval_secs: 5.0,
            // 500 Hz do sensor + margem
            rate_hz: 550.0,
            frame_id: SENSOR_FRAME_ID.into(),
        }
    }
}

impl SensorConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        secs(self.connect_timeout_secs, Duration::from_secs(3))
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0.0).then(|| secs(self.read_timeout_secs, Duration::from_secs(5)))
    }

    pub fn retry_interval(&self) -> Duration {
        secs(self.retry_interval_secs, Duration::from_secs(5))
    }

    /// Período mínimo de uma iteração do loop.
    pub fn period(&self) -> Duration {
        if self.rate_hz > 0.0 {
            secs(1.0 / self.rate_hz, Duration::ZERO)
        } else {
            Duration::ZERO
        }
    }
}

/// Segundos → [`Duration`], com fallback para valores negativos ou não finitos.
fn secs(value: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(fallback)
}

/// Modo dummy: publica um vetor fixo sem abrir conexão.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DummyConfig {
    pub enabled: bool,
    /// Fx, Fy, Fz, Tx, Ty, Tz (entradas extras são ignoradas, faltantes valem 0)
    pub values: Vec<f64>,
    /// Rótulo das amostras sintéticas
    pub frame_id: String,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            values: vec![0.0; 6],
            frame_id: DUMMY_FRAME_ID.into(),
        }
    }
}

impl DummyConfig {
    /// Vetor efetivo publicado no modo dummy.
    pub fn wrench(&self) -> Wrench {
        let mut v = [0.0; 6];
        for (slot, value) in v.iter_mut().zip(&self.values) {
            *slot = *value;
        }
        Wrench::from_array(v)
    }
}

/// Republicação UDP das amostras.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Modo de envio: "broadcast" ou "unicast"
    pub mode: String,
    /// IP de destino (255.255.255.255 para broadcast)
    pub dest_ip: String,
    /// Porta UDP
    pub port: u16,
    /// IP local para bind (vazio = auto)
    pub bind_ip: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            mode: "unicast".into(),
            dest_ip: "127.0.0.1".into(),
            port: 5010,
            bind_ip: String::new(),
        }
    }
}

impl PublisherConfig {
    pub fn is_broadcast(&self) -> bool {
        self.mode == "broadcast" || self.dest_ip == "255.255.255.255"
    }
}

/// Monitor de console.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Porta UDP para escutar
    pub port: u16,
    /// IP do acquirer (vazio = aceita qualquer origem)
    pub sender_ip: String,
    /// Intervalo entre relatórios (segundos)
    pub print_interval_secs: f64,
    /// Tamanho da janela de médias (amostras)
    pub window: usize,
    /// Sem dados por mais que isso = fonte parada (segundos)
    pub stale_after_secs: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            port: 5010,
            sender_ip: String::new(),
            print_interval_secs: 1.0,
            window: 550,
            stale_after_secs: 2.0,
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sensor: SensorConfig,
    pub dummy: DummyConfig,
    pub publisher: PublisherConfig,
    pub monitor: MonitorConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.sensor.ip.trim().is_empty() {
            errors.push("IP do sensor não pode ser vazio".into());
        }
        if self.sensor.port == 0 {
            errors.push("Porta do sensor não pode ser 0".into());
        }
        if !(self.sensor.rate_hz > 0.0 && self.sensor.rate_hz <= 10_000.0) {
            errors.push(format!(
                "Taxa do loop inválida: {} Hz (0–10000)",
                self.sensor.rate_hz
            ));
        }
        if self.sensor.retry_interval_secs < 0.0 || self.sensor.retry_interval_secs > 600.0 {
            errors.push(format!(
                "Intervalo de reconexão inválido: {} (0–600)",
                self.sensor.retry_interval_secs
            ));
        }
        if self.sensor.connect_timeout_secs <= 0.0 {
            errors.push("Timeout de conexão deve ser positivo".into());
        }
        if self.sensor.read_timeout_secs < 0.0 {
            errors.push("Timeout de leitura não pode ser negativo".into());
        }
        if self.dummy.values.len() > 6 {
            errors.push(format!(
                "dummy.values tem {} entradas, apenas as 6 primeiras são usadas",
                self.dummy.values.len()
            ));
        }
        if self.dummy.values.iter().any(|v| !v.is_finite()) {
            errors.push("dummy.values contém valor não finito".into());
        }
        if self.publisher.port == 0 {
            errors.push("Porta do publisher não pode ser 0".into());
        }
        if self.monitor.port == 0 {
            errors.push("Porta do monitor não pode ser 0".into());
        }
        if self.monitor.window == 0 {
            errors.push("Janela do monitor não pode ser 0".into());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn defaults_match_sensor_factory_settings() {
        let config = AppConfig::default();
        assert_eq!(config.sensor.address(), "192.168.1.30:1000");
        assert_eq!(config.sensor.retry_interval(), Duration::from_secs(5));
        assert!(!config.dummy.enabled);
        assert_eq!(config.dummy.wrench(), Wrench::default());
    }

    #[test]
    fn roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.sensor.port, parsed.sensor.port);
        assert_eq!(config.dummy.values, parsed.dummy.values);
        assert_eq!(config.publisher.dest_ip, parsed.publisher.dest_ip);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[sensor]
ip = "10.0.0.7"

[dummy]
enabled = true
values = [0.0, 0.0, 9.8]
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.sensor.ip, "10.0.0.7");
        // Outros campos devem ter valor padrão
        assert_eq!(config.sensor.port, 1000);
        assert_eq!(config.sensor.rate_hz, 550.0);
        assert!(config.dummy.enabled);
        assert_eq!(
            config.dummy.wrench().to_array(),
            [0.0, 0.0, 9.8, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn extra_dummy_values_are_ignored_but_flagged() {
        let mut config = AppConfig::default();
        config.dummy.values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(config.dummy.wrench().to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn read_timeout_zero_disables() {
        let mut sensor = SensorConfig::default();
        assert_eq!(sensor.read_timeout(), Some(Duration::from_secs(5)));
        sensor.read_timeout_secs = 0.0;
        assert_eq!(sensor.read_timeout(), None);
    }

    #[test]
    fn rejects_bad_rate() {
        let mut config = AppConfig::default();
        config.sensor.rate_hz = 0.0;
        assert_eq!(config.validate().len(), 1);
        assert_eq!(config.sensor.period(), Duration::ZERO);
    }
}
