//! # Tokenizador
//!
//! Divide o texto de um segmento em tokens, preservando a posição original de cada
//! um (offset em bytes). O tagger heurístico usa os offsets para cruzar tokens com
//! os trechos encontrados pelos padrões regex.
//!
//! ## Esquema de Tokenização
//!
//! - **Standard**: palavras e pontuação separadas, mas sequências "técnicas" ficam
//!   inteiras: `10.0.0.5`, `alice@example.com`, `https://intranet/login`,
//!   `api_key=abc123`. Um conector (`.`, `:`, `@`, `/`, `_`, `-`, `=`, `+`, `%`)
//!   só une dois pedaços quando vem seguido de letra, dígito ou outro conector.
//! - **Whitespace**: cada trecho entre espaços é um token.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use eclipse_core::tokenizer::{tokenize_with_mode, TokenizerMode};
//!
//! let tokens = tokenize_with_mode("Call 10.0.0.5 now.", TokenizerMode::Standard);
//! let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(texts, vec!["Call", "10.0.0.5", "now", "."]);
//! ```

use serde::{Deserialize, Serialize};

/// Um token extraído do texto original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// O texto do token (ex: "Call", "10.0.0.5", ".").
    pub text: String,
    /// Índice de byte inicial no texto original (inclusive).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Índice sequencial do token na lista (0, 1, 2...).
    pub index: usize,
}

impl Token {
    /// Verdadeiro quando o token não contém letras nem dígitos (ex: ",", "--")
    pub fn is_punctuation(&self) -> bool {
        !self.text.chars().any(char::is_alphanumeric)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerMode {
    /// **Padrão**: palavras, pontuação e sequências técnicas inteiras.
    #[default]
    Standard,
    /// **Espaços**: separa apenas por espaços em branco.
    Whitespace,
}

/// Abreviações cujo ponto final pertence ao token
const ABBREVIATIONS: &[&str] = &[
    "Dr", "Dra", "Mr", "Mrs", "Ms", "Sr", "Sra", "Prof", "Inc", "Ltd", "Corp", "St",
    "etc", "vs", "approx", "tel", "ext", "no", "av",
];

/// Caracteres que ligam partes de endereços, e-mails, URLs e atribuições
const CONNECTORS: &[char] = &['.', ':', '@', '/', '_', '-', '=', '+', '%'];

fn is_connector(ch: char) -> bool {
    CONNECTORS.contains(&ch)
}

/// Tokeniza um texto usando o modo padrão.
pub fn tokenize(text: &str) -> Vec<Token> {
    tokenize_with_mode(text, TokenizerMode::Standard)
}

/// Tokeniza um texto com o modo especificado.
pub fn tokenize_with_mode(text: &str, mode: TokenizerMode) -> Vec<Token> {
    let mut tokens = match mode {
        TokenizerMode::Standard => tokenize_standard(text),
        TokenizerMode::Whitespace => tokenize_whitespace(text),
    };

    // Re-indexa os tokens
    for (i, token) in tokens.iter_mut().enumerate() {
        token.index = i;
    }
    tokens
}

fn tokenize_whitespace(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (byte_pos, ch) in text.char_indices() {
        if ch.is_whitespace() {
            flush_token(&mut tokens, &mut current, start, byte_pos);
        } else {
            if current.is_empty() {
                start = byte_pos;
            }
            current.push(ch);
        }
    }
    flush_token(&mut tokens, &mut current, start, text.len());
    tokens
}

fn tokenize_standard(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current_start = 0;
    let mut current_text = String::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    for (i, &(byte_pos, ch)) in chars.iter().enumerate() {
        if ch.is_alphanumeric() || ch == '\'' && !current_text.is_empty() {
            if current_text.is_empty() {
                current_start = byte_pos;
            }
            current_text.push(ch);
            continue;
        }

        if is_connector(ch) && !current_text.is_empty() {
            let next = chars.get(i + 1).map(|(_, c)| *c);
            let joins = next.map(|c| c.is_alphanumeric() || is_connector(c)).unwrap_or(false);
            let is_abbrev = ch == '.' && ABBREVIATIONS.contains(&current_text.as_str());

            if joins || is_abbrev {
                current_text.push(ch);
                continue;
            }
        }

        flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
        if !ch.is_whitespace() {
            push_token(&mut tokens, ch.to_string(), byte_pos, byte_pos + ch.len_utf8());
        }
    }

    flush_token(&mut tokens, &mut current_text, current_start, text.len());
    tokens
}

/// Fecha o token acumulado e adiciona à lista (se não vazio)
fn flush_token(tokens: &mut Vec<Token>, text: &mut String, start: usize, end: usize) {
    if !text.is_empty() {
        tokens.push(Token {
            text: text.clone(),
            start,
            end,
            index: 0, // será atribuído depois
        });
        text.clear();
    }
}

/// Adiciona um token de pontuação diretamente
fn push_token(tokens: &mut Vec<Token>, text: String, start: usize, end: usize) {
    tokens.push(Token {
        text,
        start,
        end,
        index: 0,
    });
}
