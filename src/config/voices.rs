//! Kokoro v1.0 language and voice catalogue.
//!
//! A voice's language is encoded in the first letter of its name (`af_heart` is
//! American English), which is also the Kokoro language code.

/// A Kokoro language and how sherpa-onnx should phonemize it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    /// espeak-ng language for languages without bundled lexicons (empty otherwise).
    pub espeak: &'static str,
    /// Lexicon files bundled with the model, relative to the model directory.
    pub lexicons: &'static [&'static str],
}

const LANGUAGES: &[Language] = &[
    Language { code: "a", name: "American English", espeak: "", lexicons: &["lexicon-us-en.txt"] },
    Language { code: "b", name: "British English", espeak: "", lexicons: &["lexicon-gb-en.txt"] },
    Language { code: "e", name: "Spanish", espeak: "es", lexicons: &[] },
    Language { code: "f", name: "French", espeak: "fr", lexicons: &[] },
    Language { code: "h", name: "Hindi", espeak: "hi", lexicons: &[] },
    Language { code: "i", name: "Italian", espeak: "it", lexicons: &[] },
    Language { code: "j", name: "Japanese", espeak: "ja", lexicons: &[] },
    Language { code: "p", name: "Portuguese BR", espeak: "pt-br", lexicons: &[] },
    // Chinese with English fallback for mixed text
    Language { code: "z", name: "Mandarin Chinese", espeak: "", lexicons: &["lexicon-us-en.txt", "lexicon-zh.txt"] },
];

/// Alternative spellings accepted for language codes.
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("cmn", "z"),
    ("en", "a"),
    ("en-gb", "b"),
    ("en-us", "a"),
    ("es", "e"),
    ("fr", "f"),
    ("fr-fr", "f"),
    ("hi", "h"),
    ("it", "i"),
    ("ja", "j"),
    ("pt", "p"),
    ("pt-br", "p"),
    ("zh", "z"),
];

/// Voice name to speaker id in `voices.bin`, sorted by name for binary search.
const VOICES: &[(&str, i32)] = &[
    ("af_alloy", 0),
    ("af_aoede", 1),
    ("af_bella", 2),
    ("af_heart", 3),
    ("af_jessica", 4),
    ("af_kore", 5),
    ("af_nicole", 6),
    ("af_nova", 7),
    ("af_river", 8),
    ("af_sarah", 9),
    ("af_sky", 10),
    ("am_adam", 11),
    ("am_echo", 12),
    ("am_eric", 13),
    ("am_fenrir", 14),
    ("am_liam", 15),
    ("am_michael", 16),
    ("am_onyx", 17),
    ("am_puck", 18),
    ("am_santa", 19),
    ("bf_alice", 20),
    ("bf_emma", 21),
    ("bf_isabella", 22),
    ("bf_lily", 23),
    ("bm_daniel", 24),
    ("bm_fable", 25),
    ("bm_george", 26),
    ("bm_lewis", 27),
    ("ef_dora", 28),
    ("em_alex", 29),
    ("ff_siwis", 30),
    ("hf_alpha", 31),
    ("hf_beta", 32),
    ("hm_omega", 33),
    ("hm_psi", 34),
    ("if_sara", 35),
    ("im_nicola", 36),
    ("jf_alpha", 37),
    ("jf_gongitsune", 38),
    ("jf_nezumi", 39),
    ("jf_tebukuro", 40),
    ("jm_kumo", 41),
    ("pf_dora", 42),
    ("pm_alex", 43),
    ("pm_santa", 44),
    ("zf_xiaobei", 45),
    ("zf_xiaoni", 46),
    ("zf_xiaoxiao", 47),
    ("zf_xiaoyi", 48),
    ("zm_yunjian", 49),
    ("zm_yunxi", 50),
    ("zm_yunxia", 51),
    ("zm_yunyang", 52),
];

/// A catalogue voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voice {
    pub name: &'static str,
    pub speaker_id: i32,
    pub language: &'static Language,
}

/// Look up a language by its Kokoro code.
pub fn get_language(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|lang| lang.code == code)
}

/// All supported languages in catalogue order.
pub fn languages() -> &'static [Language] {
    LANGUAGES
}

/// Map a requested language code onto its Kokoro code.
///
/// Matching is case-insensitive. Codes that are neither Kokoro codes nor known
/// aliases are returned unchanged so pipeline construction can reject them.
pub fn normalize_language_code(code: &str) -> String {
    let lowered = code.trim().to_ascii_lowercase();
    if get_language(&lowered).is_some() {
        return lowered;
    }
    match LANGUAGE_ALIASES.binary_search_by_key(&lowered.as_str(), |&(alias, _)| alias) {
        Ok(idx) => LANGUAGE_ALIASES[idx].1.to_string(),
        Err(_) => code.trim().to_string(),
    }
}

/// Get voice metadata by name using binary search O(log n).
pub fn get_voice(name: &str) -> Option<Voice> {
    let idx = VOICES.binary_search_by_key(&name, |&(n, _)| n).ok()?;
    let (name, speaker_id) = VOICES[idx];
    let language = get_language(&name[..1])?;
    Some(Voice { name, speaker_id, language })
}

/// All voices belonging to a language, ordered by speaker id.
pub fn voices_for(language: &Language) -> Vec<Voice> {
    VOICES.iter().filter_map(|(name, _)| get_voice(name)).filter(|voice| voice.language.code == language.code).collect()
}

/// Print all available voices grouped by language.
pub fn print_voices() {
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Kokoro TTS v1.0 - {} Voices Across {} Languages", VOICES.len(), LANGUAGES.len());
    println!("═══════════════════════════════════════════════════════════════════");

    for language in LANGUAGES {
        let voices = voices_for(language);

        println!("\n── {} [{}] ({} voices) ──", language.name, language.code, voices.len());
        println!("{:<15} ID", "VOICE");
        println!("{}", "─".repeat(50));

        for voice in voices {
            println!("{:<15} {}", voice.name, voice.speaker_id);
        }
    }

    println!("\n{}\n", "─".repeat(70));
    println!("Default: af_heart (ID 3) - American English");
    println!();
    println!("Request body:");
    println!("  {{\"text\": \"Hello there.\", \"language_code\": \"b\", \"voice\": \"bf_emma\"}}");
}

/// Print detailed information about a specific voice.
pub fn print_voice_info(name: &str) -> anyhow::Result<()> {
    let voice = get_voice(name).ok_or_else(|| anyhow::anyhow!("Voice '{}' not found. Run with --list-voices to see available voices", name))?;

    println!();
    println!("Voice: {}", voice.name);
    println!("{}", "─".repeat(40));
    println!("Speaker ID:    {}", voice.speaker_id);
    println!("Language:      {} [{}]", voice.language.name, voice.language.code);
    if !voice.language.espeak.is_empty() {
        println!("espeak code:   {}", voice.language.espeak);
    }
    println!();

    Ok(())
}
