//! # Configuração da Triagem
//!
//! Três opções controlam o pipeline:
//!
//! - `delimiter`: separador de segmentos (padrão: quebra de linha).
//! - `threshold`: confiança mínima para um veredicto de alta confiança (padrão: 0.80).
//! - `mode`: `batch`, `stream` ou `whole_text`.
//!
//! A configuração é validada antes de qualquer processamento; valores inválidos são
//! erro fatal ([`ScreenError::Configuration`]).
//!
//! ## Exemplo (TOML)
//!
//! ```toml
//! delimiter = "\n"
//! threshold = 0.85
//! mode = "stream"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ScreenError;

/// Confiança mínima padrão para marcar um segmento como sensível.
pub const DEFAULT_THRESHOLD: f64 = 0.80;

/// Separador padrão: uma linha por segmento.
pub const DEFAULT_DELIMITER: &str = "\n";

/// Modo de avaliação do documento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// **Lote**: processa todos os segmentos e reduz a um veredicto de documento.
    #[default]
    Batch,
    /// **Linha a linha**: entrega um veredicto por segmento, sem redução.
    Stream,
    /// **Texto inteiro**: o documento todo é um único segmento.
    WholeText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub delimiter: String,
    pub threshold: f64,
    pub mode: ProcessingMode,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            threshold: DEFAULT_THRESHOLD,
            mode: ProcessingMode::Batch,
        }
    }
}

impl ScreenConfig {
    pub fn validate(&self) -> Result<(), ScreenError> {
        if self.delimiter.is_empty() {
            return Err(ScreenError::configuration("o delimitador não pode ser vazio"));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ScreenError::configuration(format!(
                "threshold deve estar em [0, 1], recebido {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Interpreta e valida uma configuração em TOML. Campos ausentes usam o padrão.
    pub fn from_toml_str(source: &str) -> Result<Self, ScreenError> {
        let config: ScreenConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ScreenError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| ScreenError::io("ler o arquivo de configuração", e))?;
        Self::from_toml_str(&data)
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }
}
