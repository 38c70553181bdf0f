use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};
use tokio::{
    sync::mpsc::UnboundedSender,
    task::JoinHandle,
};
use tracing::{
    debug,
    info,
    warn,
};

use crate::core::{
    http::{
        get_json,
        http_client,
    },
    StudioError,
};

pub const CUSTOM_LANGUAGE: &str = "custom";
const PAIR_SEPARATOR: &str = "-to-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub in_lang: String,
    pub out_lang: String,
}

impl LanguagePair {
    pub fn new(in_lang: &str, out_lang: &str) -> Self {
        Self { in_lang: in_lang.to_string(), out_lang: out_lang.to_string() }
    }

    pub fn custom() -> Self {
        Self::new(CUSTOM_LANGUAGE, CUSTOM_LANGUAGE)
    }

    /// Reads a combined selector value such as `dan-to-eng-arpabet`. `custom`
    /// (or anything without the separator) names both sides.
    pub fn parse(selected: &str) -> Self {
        match selected.split_once(PAIR_SEPARATOR) {
            Some((in_lang, out_lang)) if selected != CUSTOM_LANGUAGE => {
                Self::new(in_lang, out_lang)
            }
            _ => Self::new(selected, selected),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescendantsLookup {
    Found(Vec<String>),
    NotFound,
}

/// Answer of a metadata lookup, delivered back to whoever started it.
#[derive(Debug)]
pub enum MetadataReply {
    Langs(Result<Vec<String>, StudioError>),
    Descendants { lang: String, result: Result<DescendantsLookup, StudioError> },
}

/// Client for the language metadata endpoints.
#[derive(Clone)]
pub struct LanguageMetadataClient {
    client: Client,
    api_base: String,
}

impl LanguageMetadataClient {
    pub fn new(api_base: &str) -> Result<Self, StudioError> {
        Ok(Self { client: http_client()?, api_base: api_base.trim_end_matches('/').to_string() })
    }

    pub async fn langs(&self) -> Result<Vec<String>, StudioError> {
        let url = format!("{}/api/v1/langs", self.api_base);
        Ok(get_json::<Vec<String>>(&self.client, &url).await?.unwrap_or_default())
    }

    pub async fn descendants(&self, lang: &str) -> Result<DescendantsLookup, StudioError> {
        let url = format!("{}/api/v1/descendants/{}", self.api_base, lang);
        match get_json::<Vec<String>>(&self.client, &url).await? {
            Some(descendants) => Ok(DescendantsLookup::Found(descendants)),
            None => {
                warn!("No descendants for {}, falling back to custom", lang);
                Ok(DescendantsLookup::NotFound)
            }
        }
    }

    /// Fetches the language list in the background; the result arrives on `replies`.
    pub fn spawn_langs(&self, replies: UnboundedSender<MetadataReply>) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let result = client.langs().await;
            if replies.send(MetadataReply::Langs(result)).is_err() {
                debug!("Language list arrived after the session closed");
            }
        })
    }

    pub fn spawn_descendants(
        &self,
        lang: &str,
        replies: UnboundedSender<MetadataReply>,
    ) -> JoinHandle<()> {
        let client = self.clone();
        let lang = lang.to_string();
        tokio::spawn(async move {
            let result = client.descendants(&lang).await;
            if replies.send(MetadataReply::Descendants { lang, result }).is_err() {
                debug!("Descendants lookup finished after the session closed");
            }
        })
    }
}

/// Input/output language dropdown state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSelector {
    input_options: Vec<String>,
    selected_input: String,
    output_options: Vec<String>,
    selected_output: Option<String>,
}

impl Default for LanguageSelector {
    fn default() -> Self {
        Self {
            input_options: vec![CUSTOM_LANGUAGE.to_string()],
            selected_input: CUSTOM_LANGUAGE.to_string(),
            output_options: Vec::new(),
            selected_output: None,
        }
    }
}

impl LanguageSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_options(&self) -> &[String] {
        &self.input_options
    }

    pub fn output_options(&self) -> &[String] {
        &self.output_options
    }

    pub fn selected_input(&self) -> &str {
        &self.selected_input
    }

    pub fn selected_output(&self) -> Option<&str> {
        self.selected_output.as_deref()
    }

    /// Installs the languages reported by the metadata API. `custom` always stays available.
    pub fn set_input_options(&mut self, langs: Vec<String>) {
        let mut options = vec![CUSTOM_LANGUAGE.to_string()];
        options.extend(langs.into_iter().filter(|lang| lang != CUSTOM_LANGUAGE));
        self.input_options = options;
    }

    pub fn select_input(&mut self, lang: &str) {
        self.selected_input = lang.to_string();
    }

    /// Rebuilds the output dropdown from a descendants lookup and returns the
    /// pair to request. A missing (or empty) descendant list switches both
    /// dropdowns to `custom`.
    pub fn apply_descendants(&mut self, lookup: DescendantsLookup) -> LanguagePair {
        match lookup {
            DescendantsLookup::Found(descendants) if !descendants.is_empty() => {
                self.selected_output = descendants.first().cloned();
                self.output_options = descendants;
            }
            _ => {
                self.selected_input = CUSTOM_LANGUAGE.to_string();
                self.output_options = vec![CUSTOM_LANGUAGE.to_string()];
                self.selected_output = Some(CUSTOM_LANGUAGE.to_string());
            }
        }
        info!("Language pair is now {} -> {}", self.selected_input, self.output_or_custom());
        self.current_pair()
    }

    /// Only languages currently offered can be picked.
    pub fn select_output(&mut self, lang: &str) -> Option<LanguagePair> {
        if !self.output_options.iter().any(|option| option == lang) {
            return None;
        }
        self.selected_output = Some(lang.to_string());
        Some(self.current_pair())
    }

    /// Points both dropdowns at `pair` when it is chosen directly (combined
    /// selector, configured default). An output not currently offered becomes
    /// the only option until the next descendants lookup.
    pub fn select_pair(&mut self, pair: &LanguagePair) {
        self.selected_input = pair.in_lang.clone();
        if !self.output_options.contains(&pair.out_lang) {
            self.output_options = vec![pair.out_lang.clone()];
        }
        self.selected_output = Some(pair.out_lang.clone());
    }

    pub fn current_pair(&self) -> LanguagePair {
        LanguagePair::new(&self.selected_input, self.output_or_custom())
    }

    fn output_or_custom(&self) -> &str {
        self.selected_output.as_deref().unwrap_or(CUSTOM_LANGUAGE)
    }
}
