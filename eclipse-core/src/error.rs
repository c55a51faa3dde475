//! Erros fatais da triagem.
//!
//! Falhas do tagger em um segmento não aparecem aqui: elas viram veredictos de erro
//! (ver [`crate::adapter::AdapterError`]). Entrada vazia também não é erro.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("configuração inválida: {message}")]
    Configuration { message: String },
    #[error("erro de E/S ao {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML inválido: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },
}

impl ScreenError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }
}
