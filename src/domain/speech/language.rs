use serde::{Deserialize, Serialize};

/// Language tags accepted by the synthesis endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageTag {
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "en-GB")]
    EnGb,
    #[serde(rename = "en-AU")]
    EnAu,
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "fr-FR")]
    FrFr,
    #[serde(rename = "es-ES")]
    EsEs,
    #[serde(rename = "es-MX")]
    EsMx,
    #[serde(rename = "de-DE")]
    DeDe,
    #[serde(rename = "it-IT")]
    ItIt,
    #[serde(rename = "ja-JP")]
    JaJp,
    #[serde(rename = "ko-KR")]
    KoKr,
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "pt-PT")]
    PtPt,
    #[serde(rename = "pl-PL")]
    PlPl,
    #[serde(rename = "ru-RU")]
    RuRu,
    #[serde(rename = "tr-TR")]
    TrTr,
    #[serde(rename = "hi-IN")]
    HiIn,
}

impl LanguageTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageTag::EnUs => "en-US",
            LanguageTag::EnGb => "en-GB",
            LanguageTag::EnAu => "en-AU",
            LanguageTag::ZhCn => "zh-CN",
            LanguageTag::FrFr => "fr-FR",
            LanguageTag::EsEs => "es-ES",
            LanguageTag::EsMx => "es-MX",
            LanguageTag::DeDe => "de-DE",
            LanguageTag::ItIt => "it-IT",
            LanguageTag::JaJp => "ja-JP",
            LanguageTag::KoKr => "ko-KR",
            LanguageTag::PtBr => "pt-BR",
            LanguageTag::PtPt => "pt-PT",
            LanguageTag::PlPl => "pl-PL",
            LanguageTag::RuRu => "ru-RU",
            LanguageTag::TrTr => "tr-TR",
            LanguageTag::HiIn => "hi-IN",
        }
    }

    /// Polly language code; Mandarin uses a different tag there.
    pub fn polly_code(&self) -> &'static str {
        match self {
            LanguageTag::ZhCn => "cmn-CN",
            other => other.as_str(),
        }
    }

    /// Minimax language code, for the languages Minimax can synthesize.
    pub fn minimax_code(&self) -> Option<&'static str> {
        match self {
            LanguageTag::ZhCn => Some("zh"),
            LanguageTag::EnUs => Some("en"),
            LanguageTag::JaJp => Some("ja"),
            LanguageTag::KoKr => Some("ko"),
            LanguageTag::EsEs => Some("es"),
            LanguageTag::FrFr => Some("fr"),
            LanguageTag::RuRu => Some("ru"),
            LanguageTag::ItIt => Some("it"),
            LanguageTag::PtPt => Some("pt"),
            LanguageTag::DeDe => Some("de"),
            _ => None,
        }
    }

    pub fn minimax_supported(&self) -> bool {
        self.minimax_code().is_some()
    }
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Select the Polly voice for a language and gender. Languages with a single
/// voice use it for both genders.
pub fn polly_voice_for(language: LanguageTag, female: bool) -> &'static str {
    let (f, m) = match language {
        LanguageTag::EnUs => ("Salli", "Justin"),
        LanguageTag::EnGb => ("Emma", "Brian"),
        LanguageTag::EnAu => ("Nicole", "Russell"),
        LanguageTag::ZhCn => ("Zhiyu", "Zhiyu"),
        LanguageTag::FrFr => ("Celine", "Mathieu"),
        LanguageTag::EsEs => ("Conchita", "Enrique"),
        LanguageTag::EsMx => ("Mia", "Andres"),
        LanguageTag::DeDe => ("Marlene", "Hans"),
        LanguageTag::ItIt => ("Carla", "Giorgio"),
        LanguageTag::JaJp => ("Mizuki", "Takumi"),
        LanguageTag::KoKr => ("Seoyeon", "Seoyeon"),
        LanguageTag::PtBr => ("Vitoria", "Ricardo"),
        LanguageTag::PtPt => ("Ines", "Cristiano"),
        LanguageTag::PlPl => ("Ewa", "Jacek"),
        LanguageTag::RuRu => ("Tatyana", "Maxim"),
        LanguageTag::TrTr => ("Filiz", "Filiz"),
        LanguageTag::HiIn => ("Aditi", "Aditi"),
    };
    if female {
        f
    } else {
        m
    }
}

/// Select the Minimax voice. Only Chinese offers a male voice; every other
/// language synthesizes with the female voice.
pub fn minimax_voice_for(language: LanguageTag, female: bool) -> &'static str {
    if language == LanguageTag::ZhCn && !female {
        "male-qn-qingse"
    } else {
        "female-chengshu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimax_supports_ten_languages() {
        let supported = [
            LanguageTag::ZhCn,
            LanguageTag::EnUs,
            LanguageTag::JaJp,
            LanguageTag::KoKr,
            LanguageTag::EsEs,
            LanguageTag::FrFr,
            LanguageTag::RuRu,
            LanguageTag::ItIt,
            LanguageTag::PtPt,
            LanguageTag::DeDe,
        ];
        for lang in supported {
            assert!(lang.minimax_supported(), "{} should be supported", lang);
        }
        assert!(!LanguageTag::HiIn.minimax_supported());
        assert!(!LanguageTag::EnGb.minimax_supported());
        assert!(!LanguageTag::PtBr.minimax_supported());
    }

    #[test]
    fn mandarin_maps_to_cmn_for_polly() {
        assert_eq!(LanguageTag::ZhCn.polly_code(), "cmn-CN");
        assert_eq!(LanguageTag::DeDe.polly_code(), "de-DE");
    }

    #[test]
    fn polly_voice_respects_gender() {
        assert_eq!(polly_voice_for(LanguageTag::EnUs, true), "Salli");
        assert_eq!(polly_voice_for(LanguageTag::EnUs, false), "Justin");
        // Single-voice languages ignore gender
        assert_eq!(polly_voice_for(LanguageTag::HiIn, false), "Aditi");
    }

    #[test]
    fn minimax_male_voice_only_for_chinese() {
        assert_eq!(minimax_voice_for(LanguageTag::ZhCn, false), "male-qn-qingse");
        assert_eq!(minimax_voice_for(LanguageTag::ZhCn, true), "female-chengshu");
        assert_eq!(minimax_voice_for(LanguageTag::DeDe, false), "female-chengshu");
    }

    #[test]
    fn language_tags_deserialize_from_region_codes() {
        let lang: LanguageTag = serde_json::from_str("\"de-DE\"").unwrap();
        assert_eq!(lang, LanguageTag::DeDe);
        assert!(serde_json::from_str::<LanguageTag>("\"xx-XX\"").is_err());
    }
}
