use binged_core::types::{ContentType, RECOMMENDATIONS};
use serde::Serialize;

pub const ADDON_ID: &str = "com.binged.latest";
pub const CATALOG_ID: &str = "binged-latest";

/// Language options offered by the catalog filter.
pub const LANGUAGES: &[&str] = &[
    "Hindi", "Telugu", "Tamil", "Malayalam", "Kannada", "Abkhazian", "Afar", "Afrikaans", "Akan",
    "Albanian", "Amharic", "Arabic", "Aragonese", "Armenian", "Assamese", "Avaric", "Avestan",
    "Aymara", "Azerbaijani", "Bambara", "Bashkir", "Basque", "Belarusian", "Bengali", "Bhojpuri",
    "Bislama", "Bosnian", "Breton", "Bulgarian", "Burmese", "Cantonese", "Catalan", "Chamorro",
    "Chechen", "Chichewa", "Chuvash", "Cornish", "Corsican", "Cree", "Croatian", "Czech", "Danish",
    "Divehi", "Dutch", "Dzongkha", "English", "Esperanto", "Estonian", "Ewe", "Faroese", "Fijian",
    "Finnish", "French", "Frisian", "Fulah", "Gaelic", "Galician", "Ganda", "Georgian", "German",
    "Greek", "Guarani", "Gujarati", "Haitian", "Haryanvi", "Hausa", "Hebrew", "Herero",
    "Hiri Motu", "Hungarian", "Icelandic", "Ido", "Igbo", "Indonesian", "Interlingua",
    "Interlingue", "Inuktitut", "Inupiaq", "Irish", "Italian", "Japanese", "Javanese",
    "Kalaallisut", "Kanuri", "Kashmiri", "Kazakh", "Khmer", "Kikuyu", "Kinyarwanda", "Kirghiz",
    "Komi", "Kongo", "Korean", "Kuanyama", "Kurdish", "Lao", "Latin", "Latvian", "Letzeburgesch",
    "Limburgish", "Lingala", "Lithuanian", "Luba-Katanga", "Macedonian", "Malagasy", "Malay",
    "Maltese", "Mandarin", "Manipuri", "Manx", "Maori", "Marathi", "Marshall", "Moldavian",
    "Mongolian", "Nauru", "Navajo", "Ndebele", "Ndonga", "Nepali", "Northern Sami", "Norwegian",
    "Norwegian Bokmål", "Norwegian Nynorsk", "Occitan", "Ojibwa", "Oriya", "Oromo", "Ossetian",
    "Other", "Pali", "Persian", "Polish", "Portuguese", "Punjabi", "Pushto", "Quechua",
    "Raeto-Romance", "Romanian", "Rundi", "Russian", "Samoan", "Sango", "Sanskrit", "Sardinian",
    "Serbian", "Serbo-Croatian", "Shona", "Sindhi", "Sinhalese", "Slavic", "Slovak", "Slovenian",
    "Somali", "Sotho", "Spanish", "Sundanese", "Swahili", "Swati", "Swedish", "Tagalog",
    "Tahitian", "Tajik", "Tatar", "Thai", "Tibetan", "Tigrinya", "Tonga", "Tsonga", "Tswana",
    "Turkish", "Turkmen", "Twi", "Uighur", "Ukrainian", "Urdu", "Uzbek", "Venda", "Vietnamese",
    "Volapük", "Walloon", "Welsh", "Wolof", "Xhosa", "Yi", "Yiddish", "Yoruba", "Zhuang", "Zulu",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: &'static str,
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub resources: Vec<&'static str>,
    pub types: Vec<ContentType>,
    pub id_prefixes: Vec<&'static str>,
    pub catalogs: Vec<CatalogEntry>,
    pub behavior_hints: BehaviorHints,
}

#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    pub id: &'static str,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: &'static str,
    pub extra: Vec<ExtraField>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraField {
    pub name: &'static str,
    pub is_required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct BehaviorHints {
    pub configurable: bool,
}

fn extra(name: &'static str, options: Vec<&'static str>) -> ExtraField {
    ExtraField {
        name,
        is_required: false,
        options,
    }
}

pub fn manifest() -> Manifest {
    let recommendations: Vec<&'static str> = RECOMMENDATIONS.iter().map(|(_, label)| *label).collect();
    let catalogs = ContentType::ALL
        .iter()
        .map(|&content_type| CatalogEntry {
            id: CATALOG_ID,
            content_type,
            name: "Binged - Latest",
            extra: vec![
                extra("language", LANGUAGES.to_vec()),
                extra("recommendation", recommendations.clone()),
                extra("skip", Vec::new()),
            ],
        })
        .collect();

    Manifest {
        id: ADDON_ID,
        version: env!("CARGO_PKG_VERSION"),
        name: "Latest OTT Releases Catalog for Movies and TV Shows",
        description: "Latest movies and TV shows streaming on OTT platforms, from Binged.com",
        resources: vec!["catalog"],
        types: ContentType::ALL.to_vec(),
        id_prefixes: vec!["tt", "binged"],
        catalogs,
        behavior_hints: BehaviorHints { configurable: true },
    }
}
