//! # Interface do Tagger
//!
//! O modelo de marcação é um colaborador externo: recebe o texto de um segmento e
//! devolve uma predição `(token, rótulo, confiança)` por token, na ordem original.
//! O pipeline só conhece este trait, o que permite trocar o modelo real por um
//! stub determinístico nos testes.

use std::collections::HashMap;

use thiserror::Error;

use crate::label::TokenPrediction;

/// Falha do tagger ao processar um segmento.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error("modelo indisponível: {message}")]
    Unavailable { message: String },
    #[error("falha na inferência: {message}")]
    Inference { message: String },
    #[error("confiança inválida {confidence} no token {token_index}")]
    InvalidConfidence { token_index: usize, confidence: f64 },
}

impl AdapterError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference {
            message: message.into(),
        }
    }
}

/// Capacidade síncrona de marcar os tokens de um segmento.
///
/// A chamada pode ser lenta (modelos grandes); o pipeline não impõe timeout.
pub trait TaggerAdapter {
    fn tag(&self, segment: &str) -> Result<Vec<TokenPrediction>, AdapterError>;

    /// Nome curto usado nos logs
    fn name(&self) -> &str {
        "tagger"
    }
}

impl<A: TaggerAdapter + ?Sized> TaggerAdapter for &A {
    fn tag(&self, segment: &str) -> Result<Vec<TokenPrediction>, AdapterError> {
        (**self).tag(segment)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Verifica que todas as confianças são finitas e estão em `[0, 1]`.
pub(crate) fn check_predictions(predictions: &[TokenPrediction]) -> Result<(), AdapterError> {
    match predictions
        .iter()
        .position(|p| !(0.0..=1.0).contains(&p.confidence))
    {
        Some(token_index) => Err(AdapterError::InvalidConfidence {
            token_index,
            confidence: predictions[token_index].confidence,
        }),
        None => Ok(()),
    }
}

/// Tagger que reproduz respostas previamente gravadas, por texto de segmento.
///
/// Útil para testes e para reprocessar saídas de um modelo já executado.
/// Segmentos sem resposta gravada devolvem `fallback` (lista vazia por padrão).
#[derive(Debug, Clone, Default)]
pub struct ScriptedTagger {
    responses: HashMap<String, Result<Vec<TokenPrediction>, AdapterError>>,
    fallback: Vec<TokenPrediction>,
}

impl ScriptedTagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grava as predições devolvidas para `segment`
    pub fn with_response(mut self, segment: &str, predictions: Vec<TokenPrediction>) -> Self {
        self.responses.insert(segment.to_string(), Ok(predictions));
        self
    }

    /// Grava uma falha para `segment`
    pub fn with_failure(mut self, segment: &str, error: AdapterError) -> Self {
        self.responses.insert(segment.to_string(), Err(error));
        self
    }

    /// Predições devolvidas para segmentos não gravados
    pub fn with_fallback(mut self, predictions: Vec<TokenPrediction>) -> Self {
        self.fallback = predictions;
        self
    }
}

impl TaggerAdapter for ScriptedTagger {
    fn tag(&self, segment: &str) -> Result<Vec<TokenPrediction>, AdapterError> {
        match self.responses.get(segment) {
            Some(response) => response.clone(),
            None => Ok(self.fallback.clone()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
