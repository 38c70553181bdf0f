use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
    sync::mpsc::Receiver,
};

use tokio::sync::mpsc::{
    self,
    UnboundedReceiver,
    UnboundedSender,
};
use tracing::{
    debug,
    error,
    info,
    warn,
};

use crate::{
    config::StudioConfig,
    conversion::{
        ConversionRequestBuilder,
        ConversionTrigger,
    },
    core::{
        SettingFlag,
        StudioError,
    },
    csv_io,
    languages::{
        LanguageMetadataClient,
        LanguagePair,
        LanguageSelector,
        MetadataReply,
    },
    protocol::{
        ClientAction,
        OutboundMessage,
        SyncProtocolClient,
        TransportEvent,
    },
    registry::{
        ActivePanelSelector,
        Facet,
        PanelGroup,
        RegistryEvent,
        RuleSetRegistry,
    },
};

/// The presentation side of a session. Implementations only render; all state
/// lives in the session.
pub trait StudioView {
    fn show_output(&mut self, output: &str);
    fn show_status(&mut self, status: &str);
    /// Called whenever the panel labels or the active panels change: after a
    /// bundle replace (new labels, every group back to its first panel) and
    /// after a focus change. The view redraws all three groups from scratch.
    fn rebuild_panels(&mut self, display_names: &[String], selector: &ActivePanelSelector);
    fn show_error(&mut self, error: &StudioError);
}

/// User intents coming from the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    SetInput(String),
    SetRuleCell { row: usize, column: usize, value: String },
    SetAbbreviationCell { row: usize, column: usize, value: String },
    InsertRow(Facet),
    InsertColumn,
    MoveRows { facet: Facet, rows: Vec<usize>, target: usize },
    ToggleSetting { flag: SettingFlag, value: bool },
    Focus { group: PanelGroup, index: usize },
    SelectPair(LanguagePair),
    SelectInputLanguage(String),
    SelectOutputLanguage(String),
    Export { facet: Facet, dir: Option<PathBuf> },
    Import { facet: Facet, path: PathBuf },
    Quit,
}

fn panel_group(facet: Facet) -> PanelGroup {
    match facet {
        Facet::Rules => PanelGroup::Rules,
        Facet::Abbreviations => PanelGroup::Abbreviations,
    }
}

/// Owns every piece of client state for one connection to the engine.
pub struct StudioSession {
    config: StudioConfig,
    registry: RuleSetRegistry,
    registry_events: Receiver<RegistryEvent>,
    selector: ActivePanelSelector,
    builder: ConversionRequestBuilder,
    client: SyncProtocolClient,
    languages: LanguageSelector,
    input: String,
    output: String,
    view: Box<dyn StudioView>,
}

impl StudioSession {
    pub fn new(
        config: StudioConfig,
        outbound: UnboundedSender<OutboundMessage>,
        view: Box<dyn StudioView>,
    ) -> Self {
        let mut registry = RuleSetRegistry::new();
        let registry_events = registry.subscribe();
        let builder = ConversionRequestBuilder::new(config.recompute_on_focus);
        let client = SyncProtocolClient::new(outbound, config.discard_stale_responses);

        let mut session = Self {
            config,
            registry,
            registry_events,
            selector: ActivePanelSelector::default(),
            builder,
            client,
            languages: LanguageSelector::new(),
            input: String::new(),
            output: String::new(),
            view,
        };
        session.registry.seed_default();
        session.selector.reset(session.registry.len());
        session.process_registry_events();
        session.rebuild_view();
        session
    }

    pub fn registry(&self) -> &RuleSetRegistry {
        &self.registry
    }

    pub fn selector(&self) -> &ActivePanelSelector {
        &self.selector
    }

    pub fn client(&self) -> &SyncProtocolClient {
        &self.client
    }

    pub fn languages(&self) -> &LanguageSelector {
        &self.languages
    }

    pub fn languages_mut(&mut self) -> &mut LanguageSelector {
        &mut self.languages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    fn rebuild_view(&mut self) {
        let names = self.registry.display_names();
        self.view.rebuild_panels(&names, &self.selector);
    }

    /// Drains registry notifications; each one that counts as a trigger
    /// produces its own conversion attempt.
    fn process_registry_events(&mut self) {
        let events: Vec<RegistryEvent> = self.registry_events.try_iter().collect();
        for event in events {
            if let Some(trigger) = ConversionTrigger::from_registry_event(&event) {
                self.convert(trigger);
            }
        }
    }

    fn convert(&mut self, trigger: ConversionTrigger) {
        let Some(request) = self.builder.build(trigger, &self.input, &self.registry) else {
            return;
        };
        match self.client.send_conversion(request) {
            Ok(request_id) => debug!("[CONVERT] {:?} -> request_id {}", trigger, request_id),
            Err(e) => {
                error!("[CONVERT] Failed to send conversion request: {}", e);
                self.view.show_error(&e);
            }
        }
    }

    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
        self.convert(ConversionTrigger::InputChanged);
    }

    pub fn set_rule_cell(&mut self, row: usize, column: usize, value: &str) -> Result<(), StudioError> {
        let index = self.selector.active(PanelGroup::Rules);
        self.registry.set_rule_cell(index, row, column, value)?;
        self.process_registry_events();
        Ok(())
    }

    pub fn set_abbreviation_cell(
        &mut self,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<(), StudioError> {
        let index = self.selector.active(PanelGroup::Abbreviations);
        self.registry.set_abbreviation_cell(index, row, column, value)?;
        self.process_registry_events();
        Ok(())
    }

    /// Appends a row to the grid shown in the facet's panel group.
    pub fn insert_row(&mut self, facet: Facet) -> Result<(), StudioError> {
        let index = self.selector.active(panel_group(facet));
        self.registry.insert_row(index, facet)?;
        self.process_registry_events();
        Ok(())
    }

    pub fn insert_column(&mut self) -> Result<(), StudioError> {
        let index = self.selector.active(PanelGroup::Abbreviations);
        self.registry.insert_column(index, Facet::Abbreviations)?;
        self.process_registry_events();
        Ok(())
    }

    pub fn move_rows(&mut self, facet: Facet, rows: &[usize], target: usize) -> Result<(), StudioError> {
        let index = self.selector.active(panel_group(facet));
        self.registry.move_rows(index, facet, rows, target)?;
        self.process_registry_events();
        Ok(())
    }

    pub fn toggle_setting(&mut self, flag: SettingFlag, value: bool) -> Result<(), StudioError> {
        let index = self.selector.active(PanelGroup::Settings);
        self.registry.set_flag(index, flag, value)?;
        self.process_registry_events();
        Ok(())
    }

    pub fn focus(&mut self, group: PanelGroup, index: usize) -> Result<(), StudioError> {
        let trigger = self.selector.set_active(group, index)?;
        self.view.rebuild_panels(&self.registry.display_names(), &self.selector);
        self.convert(trigger);
        Ok(())
    }

    /// Picks both languages at once and asks for their bundle.
    pub fn select_language_pair(&mut self, pair: &LanguagePair) -> Result<(), StudioError> {
        self.languages.select_pair(pair);
        self.client.request_bundle(pair)?;
        Ok(())
    }

    /// Input language change. The descendants lookup runs in the background;
    /// its answer comes back through `replies` and is applied by
    /// [`StudioSession::handle_metadata_reply`].
    pub fn select_input_language(
        &mut self,
        metadata: &LanguageMetadataClient,
        lang: &str,
        replies: &UnboundedSender<MetadataReply>,
    ) {
        self.languages.select_input(lang);
        metadata.spawn_descendants(lang, replies.clone());
    }

    pub fn select_output_language(&mut self, lang: &str) -> Result<(), StudioError> {
        match self.languages.select_output(lang) {
            Some(pair) => {
                self.client.request_bundle(&pair)?;
                Ok(())
            }
            None => Err(StudioError::Custom(format!("{} is not an available output language", lang))),
        }
    }

    /// Applies a finished metadata lookup. A descendants answer for a language
    /// that is no longer selected is dropped; otherwise the output dropdown is
    /// rebuilt and the matching bundle requested.
    pub fn handle_metadata_reply(&mut self, reply: MetadataReply) -> Result<(), StudioError> {
        match reply {
            MetadataReply::Langs(result) => {
                self.languages.set_input_options(result?);
                Ok(())
            }
            MetadataReply::Descendants { lang, result } => {
                if lang != self.languages.selected_input() {
                    debug!("Ignoring descendants of {}: input language changed since", lang);
                    return Ok(());
                }
                let pair = self.languages.apply_descendants(result?);
                self.client.request_bundle(&pair)?;
                Ok(())
            }
        }
    }

    pub fn export_csv(&self, facet: Facet, dir: Option<&Path>) -> Result<PathBuf, StudioError> {
        let index = self.selector.active(panel_group(facet));
        let len = self.registry.len();
        let rule_set =
            self.registry.get(index).ok_or(StudioError::IndexOutOfRange { index, len })?;

        let contents = match facet {
            Facet::Rules => csv_io::rules_to_csv(&rule_set.rules),
            Facet::Abbreviations => csv_io::abbreviations_to_csv(&rule_set.abbreviations),
        };
        let dir = dir.map(Path::to_path_buf).unwrap_or_else(|| self.config.export_dir());
        let path = csv_io::write_export(&dir, facet, &contents)?;
        info!("Exported {} of {} to {}", facet, rule_set.display_name(), path.display());
        Ok(path)
    }

    pub fn import_csv(&mut self, facet: Facet, path: &Path) -> Result<(), StudioError> {
        let text = fs::read_to_string(path)?;
        let index = self.selector.active(panel_group(facet));
        match facet {
            Facet::Rules => self.registry.set_rules(index, csv_io::rules_from_csv(&text)?)?,
            Facet::Abbreviations => {
                self.registry.set_abbreviations(index, csv_io::abbreviations_from_csv(&text)?)?
            }
        }
        self.process_registry_events();
        Ok(())
    }

    /// Applies one report from the transport task.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                self.client.on_transport_connected();
                if let Some(pair) = self.config.default_language_pair.clone() {
                    if let Err(e) = self.select_language_pair(&pair) {
                        self.view.show_error(&e);
                    }
                }
            }
            TransportEvent::Disconnected(reason) => {
                if let ClientAction::StatusChanged(status) =
                    self.client.on_transport_disconnected(reason.as_deref())
                {
                    self.view.show_status(&status);
                }
            }
            TransportEvent::Message(message) => match self.client.handle_inbound(message) {
                ClientAction::StatusChanged(status) => self.view.show_status(&status),
                ClientAction::ReplaceRegistry(bundle) => {
                    self.registry.replace_all(bundle);
                    self.selector.reset(self.registry.len());
                    self.rebuild_view();
                    self.process_registry_events();
                }
                ClientAction::ShowOutput(output) => {
                    self.output = output;
                    self.view.show_output(&self.output);
                }
                ClientAction::Discarded => {}
            },
        }
    }

    /// Runs one front-end command. Returns `false` once the user asked to quit.
    pub fn handle_command(
        &mut self,
        command: UiCommand,
        metadata: &LanguageMetadataClient,
        replies: &UnboundedSender<MetadataReply>,
    ) -> bool {
        let result = match command {
            UiCommand::Quit => return false,
            UiCommand::SetInput(text) => {
                self.set_input(&text);
                Ok(())
            }
            UiCommand::SetRuleCell { row, column, value } => self.set_rule_cell(row, column, &value),
            UiCommand::SetAbbreviationCell { row, column, value } => {
                self.set_abbreviation_cell(row, column, &value)
            }
            UiCommand::InsertRow(facet) => self.insert_row(facet),
            UiCommand::InsertColumn => self.insert_column(),
            UiCommand::MoveRows { facet, rows, target } => self.move_rows(facet, &rows, target),
            UiCommand::ToggleSetting { flag, value } => self.toggle_setting(flag, value),
            UiCommand::Focus { group, index } => self.focus(group, index),
            UiCommand::SelectPair(pair) => self.select_language_pair(&pair),
            UiCommand::SelectInputLanguage(lang) => {
                self.select_input_language(metadata, &lang, replies);
                Ok(())
            }
            UiCommand::SelectOutputLanguage(lang) => self.select_output_language(&lang),
            UiCommand::Export { facet, dir } => {
                self.export_csv(facet, dir.as_deref()).map(|path| {
                    self.view.show_status(&format!("(Exported {})", path.display()));
                })
            }
            UiCommand::Import { facet, path } => self.import_csv(facet, &path),
        };

        if let Err(e) = result {
            warn!("Command failed: {}", e);
            self.view.show_error(&e);
        }
        true
    }

    /// Dispatches front-end commands, transport reports and metadata answers
    /// one at a time until the user quits or the front end goes away. Network
    /// lookups run in their own tasks, so no handler here waits on the network.
    pub async fn run(
        mut self,
        metadata: LanguageMetadataClient,
        mut commands: UnboundedReceiver<UiCommand>,
        mut transport: UnboundedReceiver<TransportEvent>,
    ) {
        let (replies_tx, mut replies_rx) = mpsc::unbounded_channel();
        metadata.spawn_langs(replies_tx.clone());

        let mut transport_open = true;
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command, &metadata, &replies_tx) {
                            break;
                        }
                    }
                    None => break,
                },
                event = transport.recv(), if transport_open => match event {
                    Some(event) => self.handle_transport_event(event),
                    None => transport_open = false,
                },
                Some(reply) = replies_rx.recv() => {
                    if let Err(e) = self.handle_metadata_reply(reply) {
                        warn!("Language lookup failed: {}", e);
                        self.view.show_error(&e);
                    }
                }
            }
        }
        info!("Session closed");
    }
}
