//! The caption picker : a fixed locale-prefix -> phrase-list mapping plus one
//! uniform random draw. Picking is pure and offline; an optional override
//! table can be fetched once at startup (captions.json) and simply shadows
//! the built-in buckets.

use once_cell::sync::Lazy;
use std::collections::HashMap;

const DEFAULT_LANG: &str = "en";

// language code -> phrases, same sets the original camera shipped with
static BUILT_IN: Lazy<HashMap<String, Vec<String>>> = Lazy::new(|| {
    let table: &[(&str, &[&str])] = &[
        (
            "zh",
            &["美好的瞬间", "珍贵的回忆", "温馨时光", "快乐时刻", "难忘的一天"],
        ),
        (
            "en",
            &[
                "Beautiful moment",
                "Precious memory",
                "Sweet time",
                "Happy moment",
                "Unforgettable day",
            ],
        ),
        (
            "ja",
            &[
                "素敵な瞬間",
                "大切な思い出",
                "幸せな時間",
                "楽しい瞬間",
                "忘れられない日",
            ],
        ),
        (
            "es",
            &[
                "Momento hermoso",
                "Recuerdo precioso",
                "Tiempo dulce",
                "Momento feliz",
                "Día inolvidable",
            ],
        ),
        (
            "fr",
            &[
                "Beau moment",
                "Souvenir précieux",
                "Moment doux",
                "Instant joyeux",
                "Jour inoubliable",
            ],
        ),
    ];
    table
        .iter()
        .map(|(lang, phrases)| {
            (
                lang.to_string(),
                phrases.iter().map(|phrase| phrase.to_string()).collect(),
            )
        })
        .collect()
});

#[derive(Debug, Clone, Default)]
pub struct CaptionBook {
    overrides: HashMap<String, Vec<String>>,
}

impl CaptionBook {
    pub fn built_in() -> Self {
        CaptionBook::default()
    }

    /// Override table from `captions.json`. Empty phrase lists are dropped
    /// so a bad file can never leave a bucket unpickable.
    pub fn with_overrides(mut overrides: HashMap<String, Vec<String>>) -> Self {
        overrides.retain(|_, phrases| !phrases.is_empty());
        CaptionBook { overrides }
    }

    /// One phrase for `locale`, chosen by `draw` (an index picker handed a
    /// bucket length). The locale prefix before '-' selects the bucket;
    /// unknown prefixes fall back to the default bucket.
    pub fn pick(&self, locale: &str, draw: impl FnOnce(usize) -> usize) -> &str {
        let phrases = self.phrases(locale);
        let index = draw(phrases.len()).min(phrases.len() - 1);
        &phrases[index]
    }

    pub fn phrases(&self, locale: &str) -> &[String] {
        let lang = locale.split('-').next().unwrap_or(DEFAULT_LANG);
        self.bucket(lang)
            .or_else(|| self.bucket(DEFAULT_LANG))
            .expect("default caption bucket is always present")
    }

    fn bucket(&self, lang: &str) -> Option<&[String]> {
        self.overrides
            .get(lang)
            .or_else(|| BUILT_IN.get(lang))
            .map(Vec::as_slice)
    }
}

/// Uniform index in `0..len` from the system entropy source. Falls back to
/// the first phrase if entropy is unavailable; picking must never fail.
pub fn random_draw(len: usize) -> usize {
    let mut buf = [0u8; 4];
    if getrandom::getrandom(&mut buf).is_err() {
        return 0;
    }
    u32::from_le_bytes(buf) as usize % len.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn french_locale_draws_from_the_french_set() {
        let book = CaptionBook::built_in();
        let french = book.phrases("fr");
        for index in 0..french.len() {
            let picked = book.pick("fr-FR", |_| index);
            assert!(french.iter().any(|phrase| phrase == picked));
            // and never from another locale's set
            assert!(!book.phrases("en").iter().any(|phrase| phrase == picked));
        }
    }

    #[test]
    fn unknown_locale_falls_back_to_english() {
        let book = CaptionBook::built_in();
        assert_eq!(book.phrases("de-DE"), book.phrases("en"));
        assert_eq!(book.phrases(""), book.phrases("en"));
    }

    #[test]
    fn pick_is_deterministic_given_a_fixed_draw() {
        let book = CaptionBook::built_in();
        assert_eq!(book.pick("en-US", |_| 0), "Beautiful moment");
        assert_eq!(book.pick("en-US", |_| 4), "Unforgettable day");
        // out-of-range draws clamp instead of panicking
        assert_eq!(book.pick("en-US", |len| len + 10), "Unforgettable day");
    }

    #[test]
    fn overrides_shadow_built_in_buckets() {
        let mut table = HashMap::new();
        table.insert("en".to_string(), vec!["Golden hour".to_string()]);
        table.insert("ja".to_string(), Vec::new()); // dropped
        let book = CaptionBook::with_overrides(table);

        assert_eq!(book.pick("en-GB", |_| 0), "Golden hour");
        // the empty override never shadows the built-in bucket
        assert_eq!(book.phrases("ja"), BUILT_IN.get("ja").unwrap().as_slice());
        // untouched buckets still come from the built-in table
        assert_eq!(book.pick("fr", |_| 0), "Beau moment");
    }

    #[test]
    fn random_draw_stays_in_range() {
        for _ in 0..100 {
            assert!(random_draw(5) < 5);
        }
        assert_eq!(random_draw(0), 0);
    }
}
