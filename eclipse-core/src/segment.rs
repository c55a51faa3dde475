//! # Segmentação do Documento
//!
//! Divide o texto em segmentos que serão enviados, um a um, ao tagger.
//!
//! - O delimitador padrão (`"\n"`) segue fronteiras de linha, aceitando `\r\n`.
//! - Qualquer outro delimitador é usado literalmente.
//! - Cada pedaço é aparado (`trim`); pedaços vazios são descartados.
//! - Os segmentos restantes recebem índices sequenciais (0, 1, 2...) na ordem original.
//!
//! A segmentação é preguiçosa: [`Segments`] é um iterador e não aloca os pedaços.

use std::str::{Lines, Split};

use crate::config::DEFAULT_DELIMITER;

/// Um segmento não vazio do documento.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Posição entre os segmentos não vazios
    pub index: usize,
    pub text: &'a str,
}

enum Pieces<'a> {
    Lines(Lines<'a>),
    Split(Split<'a, &'a str>),
    Whole(Option<&'a str>),
}

impl<'a> Iterator for Pieces<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        match self {
            Pieces::Lines(lines) => lines.next(),
            Pieces::Split(split) => split.next(),
            Pieces::Whole(whole) => whole.take(),
        }
    }
}

/// Iterador preguiçoso sobre os segmentos não vazios de um texto.
pub struct Segments<'a> {
    pieces: Pieces<'a>,
    next_index: usize,
}

impl<'a> Segments<'a> {
    fn new(pieces: Pieces<'a>) -> Self {
        Self {
            pieces,
            next_index: 0,
        }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        for piece in self.pieces.by_ref() {
            let text = piece.trim();
            if text.is_empty() {
                continue;
            }
            let segment = Segment {
                index: self.next_index,
                text,
            };
            self.next_index += 1;
            return Some(segment);
        }
        None
    }
}

/// Divide `text` em segmentos pelo `delimiter`.
///
/// Entrada vazia (ou só espaços) produz uma sequência vazia.
pub fn split<'a>(text: &'a str, delimiter: &'a str) -> Segments<'a> {
    let pieces = if delimiter == DEFAULT_DELIMITER {
        Pieces::Lines(text.lines())
    } else {
        Pieces::Split(text.split(delimiter))
    };
    Segments::new(pieces)
}

/// Trata o texto inteiro como um único segmento, ignorando delimitadores.
pub fn whole(text: &str) -> Segments<'_> {
    Segments::new(Pieces::Whole(Some(text)))
}
