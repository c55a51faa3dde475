//! # eclipse-core — Triagem de Informação Sensível em Texto
//!
//! Este crate decide, linha a linha, se um texto carrega informação sensível
//! (credenciais, dados pessoais, detalhes de rede) e com que confiança.
//! O modelo de marcação de tokens é um colaborador externo, acessado pelo trait
//! [`TaggerAdapter`]; o crate cuida de tudo em volta dele.
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Entrada**: Texto bruto e uma [`ScreenConfig`] (delimitador, limiar, modo).
//! 2.  **Segmentação** ([`segment`]): o texto é dividido em segmentos não vazios.
//! 3.  **Marcação** ([`adapter`]): o tagger devolve `(token, rótulo, confiança)` por token.
//!     O [`HeuristicTagger`] ([`heuristic`], [`patterns`], [`tokenizer`]) é a
//!     implementação local baseada em regex e palavras-chave.
//! 4.  **Agregação** ([`aggregator`]): as predições viram um rótulo dominante por segmento.
//! 5.  **Redução** ([`verdict`]): os segmentos viram um veredicto de documento.
//! 6.  **Saída** ([`pipeline`]): lote, linha a linha (iterador) ou eventos por canal.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use eclipse_core::{HeuristicTagger, Label, ScreenConfig, Screener};
//!
//! let screener = Screener::new(HeuristicTagger::new(), ScreenConfig::default()).unwrap();
//!
//! let outcome = screener.screen_document("The sky is blue\nCall 10.0.0.5 now");
//! assert_eq!(outcome.segments.len(), 2);
//! assert_eq!(outcome.document.dominant_label, Label::NetworkInformation);
//! assert!(outcome.document.is_high_confidence);
//!
//! // Linha a linha: cada veredicto é produzido sob demanda
//! for verdict in screener.screen_lines("password=hunter22\nbom dia") {
//!     println!("{} -> {} ({:.2})", verdict.processed_text, verdict.dominant_label, verdict.dominant_confidence);
//! }
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: Orquestrador que conecta segmentação, tagger e agregação.
//! - [`label`]: Vocabulário de rótulos e predições por token.
//! - [`config`]: Opções da triagem e carga a partir de TOML.
//! - [`corpus`]: Textos de demonstração.

pub mod adapter;
pub mod aggregator;
pub mod config;
pub mod corpus;
pub mod error;
pub mod heuristic;
pub mod label;
pub mod patterns;
pub mod pipeline;
pub mod segment;
pub mod tokenizer;
pub mod verdict;

pub use adapter::{AdapterError, ScriptedTagger, TaggerAdapter};
pub use config::{ProcessingMode, ScreenConfig, DEFAULT_THRESHOLD};
pub use error::ScreenError;
pub use heuristic::HeuristicTagger;
pub use label::{Label, TokenPrediction};
pub use pipeline::{
    process, BatchCollector, BatchOutcome, Processed, ScreenEvent, ScreenSummary, Screener,
    Screening, VerdictSink,
};
pub use tokenizer::{Token, TokenizerMode};
pub use verdict::{DocumentReducer, DocumentVerdict, SegmentVerdict};
