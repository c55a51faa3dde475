//! # Tagger Heurístico — Padrões Regex e Palavras-Chave
//!
//! Implementação local de [`TaggerAdapter`] que dispensa um modelo treinado. Serve
//! ao servidor web e às demonstrações; um modelo de verdade entra pelo mesmo trait.
//!
//! Cada token recebe um rótulo em três etapas, na ordem:
//!
//! 1. **Padrões** ([`crate::patterns`]): um token que sobrepõe um trecho encontrado
//!    herda o rótulo e a confiança do padrão.
//! 2. **Palavras-chave**: termos como `senha`, `servidor` ou `email` indicam a
//!    categoria com confiança moderada, abaixo do limiar padrão.
//! 3. **Resto**: pontuação vira `O`, qualquer outra palavra vira `BENIGN`.
//!
//! Assim como os modelos de sequência, o tagger tem um limite de tokens por segmento;
//! o excesso é descartado.

use std::collections::HashMap;

use tracing::debug;

use crate::adapter::{AdapterError, TaggerAdapter};
use crate::label::{Label, TokenPrediction};
use crate::patterns::{scan, PatternMatch};
use crate::tokenizer::{tokenize_with_mode, Token, TokenizerMode};

/// Limite de tokens por segmento (mesmo limite de entrada dos modelos BERT).
pub const DEFAULT_MAX_TOKENS: usize = 512;

const BENIGN_CONFIDENCE: f64 = 0.6;
const KEYWORD_CONFIDENCE: f64 = 0.78;
const PUNCTUATION_CONFIDENCE: f64 = 0.9;

/// Tagger baseado em regras.
#[derive(Debug, Clone)]
pub struct HeuristicTagger {
    max_tokens: usize,
    tokenizer_mode: TokenizerMode,
    benign_confidence: f64,
    keyword_confidence: f64,
    /// Palavra-chave (minúscula) → rótulo indicado
    keywords: HashMap<String, Label>,
}

impl HeuristicTagger {
    pub fn new() -> Self {
        let mut keywords = HashMap::new();

        let credentials = [
            "password", "passwd", "senha", "secret", "segredo", "token", "apikey",
            "api_key", "credential", "credentials", "credencial", "login", "privkey",
            "passphrase",
        ];
        let personal = [
            "email", "e-mail", "phone", "telefone", "celular", "ssn", "cpf", "rg",
            "address", "endereço", "birthday", "nascimento", "passport", "passaporte",
        ];
        let network = [
            "ssh", "server", "servidor", "host", "hostname", "ip", "port", "porta",
            "gateway", "subnet", "dns", "vpn", "firewall", "proxy", "router",
        ];

        for (words, label) in [
            (&credentials[..], Label::SecurityCredentials),
            (&personal[..], Label::PersonalData),
            (&network[..], Label::NetworkInformation),
        ] {
            for word in words {
                keywords.insert(word.to_string(), label);
            }
        }

        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            tokenizer_mode: TokenizerMode::Standard,
            benign_confidence: BENIGN_CONFIDENCE,
            keyword_confidence: KEYWORD_CONFIDENCE,
            keywords,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    /// `Whitespace` mantém pontuação colada às palavras (ex: `senha:` vira um token só).
    pub fn with_tokenizer_mode(mut self, mode: TokenizerMode) -> Self {
        self.tokenizer_mode = mode;
        self
    }

    /// Registra uma palavra-chave extra (comparação sem distinção de caixa).
    pub fn with_keyword(mut self, word: &str, label: Label) -> Self {
        self.keywords.insert(word.to_lowercase(), label);
        self
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    fn label_token(&self, token: &Token, matches: &[PatternMatch]) -> (Label, f64) {
        if let Some(m) = matches
            .iter()
            .find(|m| token.start < m.end && m.start < token.end)
        {
            return (m.label, m.confidence);
        }

        if token.is_punctuation() {
            return (Label::Outside, PUNCTUATION_CONFIDENCE);
        }

        match self.keywords.get(&token.text.to_lowercase()) {
            Some(label) => (*label, self.keyword_confidence),
            None => (Label::Benign, self.benign_confidence),
        }
    }
}

impl Default for HeuristicTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl TaggerAdapter for HeuristicTagger {
    fn tag(&self, segment: &str) -> Result<Vec<TokenPrediction>, AdapterError> {
        let mut tokens = tokenize_with_mode(segment, self.tokenizer_mode);
        if tokens.len() > self.max_tokens {
            debug!(
                "Segmento truncado: {} tokens, limite {}",
                tokens.len(),
                self.max_tokens
            );
            tokens.truncate(self.max_tokens);
        }

        let matches = scan(segment);
        let predictions = tokens
            .iter()
            .map(|token| {
                let (label, confidence) = self.label_token(token, &matches);
                TokenPrediction::new(token.text.clone(), label, confidence)
            })
            .collect();

        Ok(predictions)
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}
