//! Supported conversation languages

use std::fmt;

use crate::{Error, Result};

/// A language a speaker can talk in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    /// BCP 47 tag used for speech recognition (e.g. "it-IT")
    pub code: &'static str,
    /// English name, used in translation prompts
    pub name: &'static str,
    /// Flag emoji
    pub flag: &'static str,
}

/// Built-in language catalog
pub const LANGUAGES: [Language; 10] = [
    Language {
        code: "it-IT",
        name: "Italian",
        flag: "🇮🇹",
    },
    Language {
        code: "fr-FR",
        name: "French",
        flag: "🇫🇷",
    },
    Language {
        code: "en-US",
        name: "English",
        flag: "🇺🇸",
    },
    Language {
        code: "es-ES",
        name: "Spanish",
        flag: "🇪🇸",
    },
    Language {
        code: "de-DE",
        name: "German",
        flag: "🇩🇪",
    },
    Language {
        code: "pt-PT",
        name: "Portuguese",
        flag: "🇵🇹",
    },
    Language {
        code: "ru-RU",
        name: "Russian",
        flag: "🇷🇺",
    },
    Language {
        code: "ja-JP",
        name: "Japanese",
        flag: "🇯🇵",
    },
    Language {
        code: "ko-KR",
        name: "Korean",
        flag: "🇰🇷",
    },
    Language {
        code: "zh-CN",
        name: "Chinese",
        flag: "🇨🇳",
    },
];

impl Language {
    /// Look up a language by tag ("it-IT"), primary subtag ("it"), or name
    ///
    /// Matching is case-insensitive.
    #[must_use]
    pub fn find(query: &str) -> Option<Self> {
        let query = query.trim();
        LANGUAGES.iter().copied().find(|lang| {
            lang.code.eq_ignore_ascii_case(query)
                || lang.name.eq_ignore_ascii_case(query)
                || lang.primary_subtag().eq_ignore_ascii_case(query)
        })
    }

    /// Like [`Self::find`], but unknown languages are an error
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownLanguage`] if nothing matches
    pub fn parse(query: &str) -> Result<Self> {
        Self::find(query).ok_or_else(|| Error::UnknownLanguage(query.to_string()))
    }

    /// Language part of the tag ("it" for "it-IT")
    #[must_use]
    pub fn primary_subtag(&self) -> &'static str {
        self.code.split('-').next().unwrap_or(self.code)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.flag, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_code_subtag_and_name() {
        assert_eq!(Language::find("it-IT").map(|l| l.name), Some("Italian"));
        assert_eq!(Language::find("FR").map(|l| l.code), Some("fr-FR"));
        assert_eq!(Language::find(" japanese ").map(|l| l.code), Some("ja-JP"));
        assert!(Language::find("klingon").is_none());
    }

    #[test]
    fn test_parse_unknown_is_error() {
        assert!(matches!(
            Language::parse("tlh"),
            Err(Error::UnknownLanguage(q)) if q == "tlh"
        ));
    }

    #[test]
    fn test_catalog_codes_unique() {
        let mut codes: Vec<_> = LANGUAGES.iter().map(|l| l.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), LANGUAGES.len());
    }
}
