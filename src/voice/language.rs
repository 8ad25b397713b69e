//! Recognition locale heuristic
//!
//! Scores recognized text against small weighted stop-word lexicons. A locale
//! only wins once its raw hit count reaches the confidence floor, so a single
//! borrowed word never flips the recognizer.

/// Default confidence floor (raw lexical hits)
pub const DEFAULT_CONFIDENCE_FLOOR: usize = 8;

/// Lighter floor for short-utterance setups
pub const LIGHT_CONFIDENCE_FLOOR: usize = 3;

/// Word lexicon for one locale; weight 2 marks strongly distinctive words
struct Lexicon {
    locale: &'static str,
    words: &'static [(&'static str, u32)],
}

const LEXICONS: &[Lexicon] = &[
    Lexicon {
        locale: "en-US",
        words: &[
            ("the", 2), ("and", 1), ("is", 1), ("are", 1), ("you", 1), ("what", 2),
            ("this", 1), ("that", 1), ("with", 1), ("have", 1), ("it's", 2), ("i'm", 2),
            ("would", 2), ("could", 1), ("please", 2), ("my", 1), ("your", 1), ("of", 1),
            ("to", 1), ("in", 1), ("how", 1), ("weather", 1), ("today", 1), ("thanks", 2),
        ],
    },
    Lexicon {
        locale: "es-ES",
        words: &[
            ("el", 1), ("la", 1), ("los", 2), ("las", 1), ("que", 1), ("de", 1), ("y", 1),
            ("en", 1), ("un", 1), ("una", 1), ("es", 1), ("por", 1), ("para", 1), ("con", 1),
            ("qué", 2), ("cómo", 2), ("está", 1), ("gracias", 2), ("hola", 2), ("pero", 1),
            ("muy", 2), ("también", 1), ("dónde", 2), ("tengo", 2), ("quiero", 2), ("hoy", 1),
        ],
    },
    Lexicon {
        locale: "fr-FR",
        words: &[
            ("le", 1), ("la", 1), ("les", 1), ("des", 1), ("est", 1), ("et", 1), ("je", 2),
            ("vous", 2), ("nous", 2), ("une", 1), ("pas", 1), ("pour", 1), ("dans", 1),
            ("avec", 2), ("que", 1), ("qui", 1), ("c'est", 2), ("bonjour", 2), ("merci", 2),
            ("très", 2), ("où", 2), ("ça", 2), ("suis", 2), ("oui", 2), ("aujourd'hui", 2),
        ],
    },
    Lexicon {
        locale: "de-DE",
        words: &[
            ("der", 1), ("die", 1), ("das", 1), ("und", 2), ("ist", 1), ("ich", 2),
            ("nicht", 2), ("ein", 1), ("eine", 1), ("mit", 1), ("auf", 1), ("für", 2),
            ("sie", 1), ("wir", 1), ("danke", 2), ("bitte", 2), ("wie", 1), ("was", 1),
            ("ja", 1), ("nein", 2), ("guten", 2), ("haben", 1), ("sehr", 2), ("heute", 2),
        ],
    },
    Lexicon {
        locale: "it-IT",
        words: &[
            ("il", 1), ("lo", 1), ("gli", 2), ("della", 2), ("che", 1), ("è", 1), ("e", 1),
            ("sono", 1), ("non", 1), ("una", 1), ("per", 1), ("con", 1), ("grazie", 2),
            ("ciao", 2), ("come", 1), ("cosa", 1), ("molto", 2), ("anche", 2),
            ("perché", 2), ("questo", 2), ("buongiorno", 2), ("oggi", 2),
        ],
    },
    Lexicon {
        locale: "pt-BR",
        words: &[
            ("o", 1), ("os", 1), ("as", 1), ("não", 2), ("que", 1), ("é", 1), ("um", 1),
            ("uma", 1), ("com", 1), ("para", 1), ("obrigado", 2), ("obrigada", 2),
            ("você", 2), ("está", 1), ("muito", 2), ("também", 1), ("olá", 2), ("eu", 1),
            ("isso", 2), ("como", 1), ("hoje", 2),
        ],
    },
];

/// Score of one locale against a text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleScore {
    pub locale: &'static str,
    /// Raw number of lexicon hits
    pub hits: usize,
    /// Sum of hit weights
    pub score: u32,
}

/// Guesses the spoken locale from recognized text
#[derive(Debug, Clone)]
pub struct LanguageHeuristic {
    floor: usize,
}

impl Default for LanguageHeuristic {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_FLOOR)
    }
}

impl LanguageHeuristic {
    /// Create a heuristic with the given confidence floor (minimum 1)
    #[must_use]
    pub fn new(floor: usize) -> Self {
        Self {
            floor: floor.max(1),
        }
    }

    #[must_use]
    pub const fn floor(&self) -> usize {
        self.floor
    }

    /// Locales the heuristic can recognize
    pub fn locales() -> impl Iterator<Item = &'static str> {
        LEXICONS.iter().map(|l| l.locale)
    }

    /// Score every known locale, highest weighted score first
    #[must_use]
    pub fn scores(&self, text: &str) -> Vec<LocaleScore> {
        let tokens = tokenize(text);
        let mut scores: Vec<LocaleScore> = LEXICONS
            .iter()
            .map(|lexicon| {
                let (hits, score) = tokens
                    .iter()
                    .filter_map(|token| {
                        lexicon
                            .words
                            .iter()
                            .find(|(word, _)| word == token)
                            .map(|(_, weight)| *weight)
                    })
                    .fold((0, 0), |(hits, score), weight| (hits + 1, score + weight));
                LocaleScore {
                    locale: lexicon.locale,
                    hits,
                    score,
                }
            })
            .collect();
        // stable sort keeps lexicon order on ties
        scores.sort_by(|a, b| b.score.cmp(&a.score));
        scores
    }

    /// Best locale whose hit count reaches the confidence floor
    ///
    /// Returns `None` when no locale is confident enough or the top score is tied.
    #[must_use]
    pub fn detect(&self, text: &str) -> Option<LocaleScore> {
        let scores = self.scores(text);
        let best = *scores.first()?;
        if best.hits < self.floor {
            return None;
        }
        if scores.get(1).is_some_and(|runner_up| runner_up.score == best.score) {
            return None;
        }
        Some(best)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphabetic() || c == '\'' || c == '’'))
        .filter(|w| !w.is_empty())
        .map(|w| w.replace('’', "'").to_lowercase())
        .collect()
}
