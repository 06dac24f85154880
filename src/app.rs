use crate::analysis::{self, SkinReport};
use crate::assistant;
use crate::backend::InteractionStore;
use crate::client::VisumClient;
use crate::config::Config;
use crate::lookup::{self, Direction, InteractionBrowser, SearchTicket};
use crate::models::{InteractionRecord, Item};
use crate::registry::{filter_devices, SightedDevice};
use crate::service::ServiceCommand;
use crate::signal::{classify, proximity, signal_bar_percent, time_since, DeviceKind, DeviceStatistics};
use crate::status::{self, SystemStatus};
use crate::tracker::TrackerUpdate;
use crate::ui::styles;
use chrono::Utc;
use iced::widget::{
    button, column, container, horizontal_space, mouse_area, progress_bar, row, scrollable, text,
    text_input,
};
use iced::{Alignment, Element, Length, Subscription, Task};
use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

const STATUS_REFRESH: Duration = Duration::from_secs(30);
const ITEMS_SHOWN: usize = 5;

// Iced Application State
pub struct VisumKiosk {
    receiver: Receiver<TrackerUpdate>,
    command_sender: Sender<ServiceCommand>,
    client: VisumClient,
    hold_interval: Duration,
    devices: Vec<SightedDevice>,
    search_query: String,
    expanded: Option<String>,
    scanning: bool,
    manual_progress: Option<u8>,
    error: Option<String>,
    notice: Option<String>,
    browser: InteractionBrowser,
    system_status: SystemStatus,
    prompt: String,
    answer: Option<String>,
    asking: bool,
    image_path: String,
    report: Option<SkinReport>,
    analyzing: bool,
}

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    ManualScan,
    SearchChanged(String),
    ToggleDetails(String),
    ViewLog(SightedDevice),
    InteractionsLoaded(SearchTicket, Result<Vec<InteractionRecord>, String>),
    PreviousInteraction,
    NextInteraction,
    SelectInteraction(usize),
    HoldNavigation(Direction),
    ReleaseNavigation,
    HoldTick,
    CloseInteractions,
    CheckSystem,
    SystemChecked(SystemStatus),
    DismissError,
    PromptChanged(String),
    Ask,
    Answered(String),
    ImagePathChanged(String),
    Analyze,
    Analyzed(Result<SkinReport, String>),
    SaveInteraction(SightedDevice),
    Saved(Result<String, String>),
}

impl VisumKiosk {
    pub fn new(
        receiver: Receiver<TrackerUpdate>,
        command_sender: Sender<ServiceCommand>,
        client: VisumClient,
        config: &Config,
    ) -> (Self, Task<Message>) {
        let kiosk = VisumKiosk {
            receiver,
            command_sender,
            client,
            hold_interval: config.hold_navigation_interval(),
            devices: Vec::new(),
            search_query: String::new(),
            expanded: None,
            scanning: false,
            manual_progress: None,
            error: None,
            notice: None,
            browser: InteractionBrowser::new(),
            system_status: SystemStatus::default(),
            prompt: String::new(),
            answer: None,
            asking: false,
            image_path: String::new(),
            report: None,
            analyzing: false,
        };
        let startup = kiosk.check_system();
        (kiosk, startup)
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                // Drain everything the tracker sent since the last frame
                while let Ok(update) = self.receiver.try_recv() {
                    self.apply(update);
                }
                Task::none()
            }
            Message::ManualScan => {
                if self.manual_progress.is_some() {
                    return Task::none();
                }
                match self.command_sender.send(ServiceCommand::ManualScan) {
                    Ok(()) => self.manual_progress = Some(0),
                    Err(e) => {
                        log::error!("Failed to send manual scan request: {}", e);
                        self.error = Some("Device tracking is not running".to_string());
                    }
                }
                Task::none()
            }
            Message::SearchChanged(query) => {
                self.search_query = query;
                Task::none()
            }
            Message::ToggleDetails(address) => {
                if self.expanded.as_deref() == Some(address.as_str()) {
                    self.expanded = None;
                } else {
                    self.expanded = Some(address);
                }
                Task::none()
            }
            Message::ViewLog(device) => {
                let address = device.address.clone();
                log::info!("Looking up interactions for {}", address);
                let ticket = self.browser.begin_search(device);
                let client = self.client.clone();
                Task::perform(
                    async move { lookup::search(&client, address, ticket).await },
                    |(ticket, result)| Message::InteractionsLoaded(ticket, result),
                )
            }
            Message::InteractionsLoaded(ticket, result) => {
                self.browser.complete(ticket, result);
                Task::none()
            }
            Message::PreviousInteraction => {
                self.browser.prev();
                Task::none()
            }
            Message::NextInteraction => {
                self.browser.next();
                Task::none()
            }
            Message::SelectInteraction(index) => {
                self.browser.select(index);
                Task::none()
            }
            Message::HoldNavigation(direction) => {
                self.browser.hold(direction);
                Task::none()
            }
            Message::ReleaseNavigation => {
                self.browser.release();
                Task::none()
            }
            Message::HoldTick => {
                self.browser.hold_tick();
                Task::none()
            }
            Message::CloseInteractions => {
                self.browser.close();
                Task::none()
            }
            Message::CheckSystem => self.check_system(),
            Message::SystemChecked(status) => {
                self.system_status = status;
                Task::none()
            }
            Message::DismissError => {
                self.error = None;
                self.notice = None;
                Task::none()
            }
            Message::PromptChanged(prompt) => {
                self.prompt = prompt;
                Task::none()
            }
            Message::Ask => {
                if self.asking || self.prompt.trim().is_empty() {
                    return Task::none();
                }
                self.asking = true;
                let client = self.client.clone();
                let prompt = std::mem::take(&mut self.prompt);
                Task::perform(assistant::ask(client, prompt), Message::Answered)
            }
            Message::Answered(answer) => {
                self.asking = false;
                self.answer = Some(answer);
                Task::none()
            }
            Message::ImagePathChanged(path) => {
                self.image_path = path;
                Task::none()
            }
            Message::Analyze => {
                let path = self.image_path.trim().to_string();
                if self.analyzing || path.is_empty() {
                    return Task::none();
                }
                self.analyzing = true;
                let client = self.client.clone();
                Task::perform(analyze_file(client, path), Message::Analyzed)
            }
            Message::Analyzed(result) => {
                self.analyzing = false;
                match result {
                    Ok(report) => self.report = Some(report),
                    Err(e) => {
                        log::error!("Skin analysis failed: {}", e);
                        self.error = Some(format!("Skin analysis failed: {}", e));
                    }
                }
                Task::none()
            }
            Message::SaveInteraction(device) => {
                let Some(report) = &self.report else {
                    return Task::none();
                };
                let draft = report.to_draft(&device, Utc::now());
                let client = self.client.clone();
                Task::perform(
                    async move {
                        InteractionStore::save(&client, &draft)
                            .await
                            .map(|_| draft.device.address.clone())
                            .map_err(|e| e.to_string())
                    },
                    Message::Saved,
                )
            }
            Message::Saved(result) => {
                match result {
                    Ok(address) => {
                        log::info!("Interaction saved for {}", address);
                        self.notice = Some(format!("Interaction saved for {}", address));
                    }
                    Err(e) => {
                        log::error!("Failed to save interaction: {}", e);
                        self.error = Some(format!("Failed to save interaction: {}", e));
                    }
                }
                Task::none()
            }
        }
    }

    fn apply(&mut self, update: TrackerUpdate) {
        match update {
            TrackerUpdate::Devices(devices) => self.devices = devices,
            TrackerUpdate::Scanning(scanning) => {
                self.scanning = scanning;
                if scanning {
                    self.error = None;
                }
            }
            TrackerUpdate::ScanError(message) => self.error = Some(message),
            TrackerUpdate::ManualProgress(percent) => self.manual_progress = Some(percent),
            TrackerUpdate::ManualFinished => self.manual_progress = None,
        }
    }

    fn check_system(&self) -> Task<Message> {
        let client = self.client.clone();
        Task::perform(
            async move { status::check_system(&client).await },
            Message::SystemChecked,
        )
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![
            iced::time::every(Duration::from_millis(16)).map(|_| Message::Tick),
            iced::time::every(STATUS_REFRESH).map(|_| Message::CheckSystem),
        ];
        if self.browser.held().is_some() {
            subscriptions.push(iced::time::every(self.hold_interval).map(|_| Message::HoldTick));
        }
        Subscription::batch(subscriptions)
    }

    pub fn view(&'_ self) -> Element<'_, Message> {
        let mut page = column![self.create_header()].spacing(12);

        if let Some(banner) = self.create_banner() {
            page = page.push(banner);
        }

        let side_panel = if self.browser.is_open() {
            self.create_interaction_panel()
        } else {
            self.create_assistant_panel()
        };

        page = page
            .push(
                row![
                    container(self.create_device_list()).width(Length::FillPortion(3)),
                    container(side_panel).width(Length::FillPortion(2)),
                ]
                .spacing(12)
                .height(Length::Fill),
            )
            .push(self.create_status_strip());

        container(page)
            .padding(16)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn create_header(&self) -> Element<'_, Message> {
        let stats = DeviceStatistics::from_devices(&self.devices);
        let stats_text = text(format!(
            "{} devices  |  {} strong  |  {} medium  |  {} weak",
            stats.total, stats.strong, stats.medium, stats.weak
        ))
        .size(14);

        let scan_label = match self.manual_progress {
            Some(_) => "Scanning...",
            None if self.scanning => "Auto-scanning",
            None => "Manual Scan",
        };
        let scan_button = button(text(scan_label))
            .on_press_maybe(self.manual_progress.is_none().then_some(Message::ManualScan))
            .padding(10)
            .style(styles::action_button_style());

        let progress = progress_bar(0.0..=100.0, self.manual_progress.unwrap_or(0) as f32)
            .height(8.0)
            .width(Length::Fixed(160.0));

        let search = text_input("Search by name or address", &self.search_query)
            .on_input(Message::SearchChanged)
            .padding(8)
            .width(Length::Fixed(280.0));

        column![
            row![
                text("VISUM").size(28),
                horizontal_space(),
                stats_text,
            ]
            .align_y(Alignment::Center),
            row![scan_button, progress, horizontal_space(), search]
                .spacing(12)
                .align_y(Alignment::Center),
        ]
        .spacing(8)
        .into()
    }

    fn create_banner(&self) -> Option<Element<'_, Message>> {
        let message = self.error.as_deref().or(self.notice.as_deref())?;
        let banner = row![
            text(message).size(14),
            horizontal_space(),
            button(text("Dismiss").size(12))
                .on_press(Message::DismissError)
                .padding(4)
                .style(styles::close_button_style()),
        ]
        .align_y(Alignment::Center);

        Some(
            container(banner)
                .padding(10)
                .width(Length::Fill)
                .style(styles::error_banner_style)
                .into(),
        )
    }

    fn create_device_list(&self) -> Element<'_, Message> {
        let visible = filter_devices(&self.devices, &self.search_query);

        if visible.is_empty() {
            let hint = if self.devices.is_empty() {
                "No devices nearby. Waiting for the next scan..."
            } else {
                "No devices match your search."
            };
            return container(text(hint).size(16))
                .padding(20)
                .width(Length::Fill)
                .into();
        }

        let now = Utc::now();
        let cards = visible.into_iter().map(|device| self.create_device_card(device, now));
        scrollable(column(cards).spacing(8)).into()
    }

    fn create_device_card(
        &self,
        device: &SightedDevice,
        now: chrono::DateTime<Utc>,
    ) -> Element<'_, Message> {
        let quality = classify(device.rssi);
        let is_expanded = self.expanded.as_deref() == Some(device.address.as_str());

        let mut body = column![
            row![
                text(device.display_name().to_string()).size(18),
                horizontal_space(),
                text(format!("{} ({} dBm)", quality.label, device.rssi))
                    .size(14)
                    .color(styles::signal_color(quality.label)),
            ]
            .align_y(Alignment::Center),
            text(device.address.clone()).size(12),
            progress_bar(0.0..=100.0, signal_bar_percent(device.rssi)).height(6.0),
            text(format!("Last seen: {}", time_since(device.last_seen, now))).size(12),
        ]
        .spacing(4);

        if is_expanded {
            let kind = DeviceKind::from_name(device.name.as_deref());
            body = body
                .push(text(format!("Type: {}", kind)).size(12))
                .push(text(format!("Proximity: {}", proximity(device.rssi))).size(12));

            let mut actions = row![button(text("View Log").size(14))
                .on_press(Message::ViewLog(device.clone()))
                .padding(6)
                .style(styles::action_button_style())]
            .spacing(8);
            if self.report.is_some() {
                actions = actions.push(
                    button(text("Save Analysis").size(14))
                        .on_press(Message::SaveInteraction(device.clone()))
                        .padding(6)
                        .style(styles::save_button_style()),
                );
            }
            body = body.push(actions);
        }

        button(body)
            .on_press(Message::ToggleDetails(device.address.clone()))
            .width(Length::Fill)
            .padding(12)
            .style(styles::device_card_style(is_expanded))
            .into()
    }

    fn create_interaction_panel(&self) -> Element<'_, Message> {
        let device_label = self
            .browser
            .device()
            .map(|d| format!("{} ({})", d.display_name(), d.address))
            .unwrap_or_default();

        let header = row![
            column![text("Interaction History").size(20), text(device_label).size(12)],
            horizontal_space(),
            button(text("Close"))
                .on_press(Message::CloseInteractions)
                .padding(6)
                .style(styles::close_button_style()),
        ]
        .align_y(Alignment::Center);

        let content: Element<'_, Message> = if self.browser.is_loading() {
            text("Loading interactions...").into()
        } else if let Some(error) = self.browser.error() {
            text(error.to_string()).into()
        } else if let Some(record) = self.browser.current() {
            column![
                self.create_record_view(record),
                self.create_navigation(),
            ]
            .spacing(12)
            .into()
        } else {
            text("No interactions recorded for this device.").into()
        };

        container(column![header, scrollable(content)].spacing(12))
            .padding(16)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(styles::panel_style)
            .into()
    }

    fn create_record_view<'a>(&self, record: &'a InteractionRecord) -> Element<'a, Message> {
        let mut view = column![text(record.display_timestamp()).size(14)].spacing(8);

        if let Some(analysis) = &record.analysis {
            view = view.push(
                text(format!(
                    "Skin: {}  |  Texture: {}",
                    analysis.color.as_deref().unwrap_or("Unknown"),
                    analysis.texture.as_deref().unwrap_or("Unknown"),
                ))
                .size(14),
            );
        }
        if let Some(ingredients) = &record.ingredients {
            view = view.push(item_list("Ingredients", ingredients));
        }
        if let Some(products) = &record.products {
            view = view.push(item_list("Products", products));
        }
        if let Some(recommendations) = &record.recommendations {
            view = view.push(text(recommendations.clone()).size(13));
        }
        view.into()
    }

    fn create_navigation(&self) -> Element<'_, Message> {
        let total = self.browser.records().len();
        let current = self.browser.cursor();

        // hovering an arrow keeps stepping until the pointer leaves
        let previous = mouse_area(
            button(text("<"))
                .on_press(Message::PreviousInteraction)
                .padding(8)
                .style(styles::action_button_style()),
        )
        .on_enter(Message::HoldNavigation(Direction::Previous))
        .on_exit(Message::ReleaseNavigation);

        let next = mouse_area(
            button(text(">"))
                .on_press(Message::NextInteraction)
                .padding(8)
                .style(styles::action_button_style()),
        )
        .on_enter(Message::HoldNavigation(Direction::Next))
        .on_exit(Message::ReleaseNavigation);

        let dots = (0..total).map(|index| {
            button(horizontal_space().width(Length::Fixed(6.0)))
                .on_press(Message::SelectInteraction(index))
                .height(Length::Fixed(10.0))
                .style(styles::dot_style(index == current))
                .into()
        });

        row![
            previous,
            row(dots).spacing(4),
            text(format!("{} of {}", current + 1, total)).size(12),
            next,
        ]
        .spacing(10)
        .align_y(Alignment::Center)
        .into()
    }

    fn create_assistant_panel(&self) -> Element<'_, Message> {
        let ask_button = button(text(if self.asking { "Thinking..." } else { "Ask" }))
            .on_press_maybe((!self.asking).then_some(Message::Ask))
            .padding(8)
            .style(styles::action_button_style());

        let prompt = row![
            text_input("Ask about your skin care...", &self.prompt)
                .on_input(Message::PromptChanged)
                .on_submit(Message::Ask)
                .padding(8),
            ask_button,
        ]
        .spacing(8);

        let mut panel = column![text("Assistant").size(20), prompt].spacing(10);
        if let Some(answer) = &self.answer {
            panel = panel.push(text(answer.clone()).size(14));
        }

        let analyze_button = button(text(if self.analyzing { "Analyzing..." } else { "Analyze" }))
            .on_press_maybe((!self.analyzing).then_some(Message::Analyze))
            .padding(8)
            .style(styles::action_button_style());

        panel = panel.push(text("Skin Analysis").size(20)).push(
            row![
                text_input("Path to captured image", &self.image_path)
                    .on_input(Message::ImagePathChanged)
                    .on_submit(Message::Analyze)
                    .padding(8),
                analyze_button,
            ]
            .spacing(8),
        );

        if let Some(report) = &self.report {
            let recommendation = &report.recommendation;
            let mut summary = column![text(format!(
                "Skin: {}  |  Texture: {}",
                report.profile.skin_color, report.profile.texture
            ))
            .size(14)]
            .spacing(6);
            if !recommendation.ingredients.is_empty() {
                summary = summary.push(item_list("Ingredients", &recommendation.ingredients));
            }
            if !recommendation.products.is_empty() {
                summary = summary.push(item_list("Products", &recommendation.products));
            }
            if let Some(description) = &recommendation.description {
                summary = summary.push(text(description.clone()).size(13));
            }
            for link in &recommendation.links {
                summary = summary.push(text(link.clone()).size(12));
            }
            summary = summary.push(
                text("Open a device card and press \"Save Analysis\" to store this visit.")
                    .size(12),
            );
            panel = panel.push(summary);
        }

        container(scrollable(panel))
            .padding(16)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(styles::panel_style)
            .into()
    }

    fn create_status_strip(&self) -> Element<'_, Message> {
        let modules = self.system_status.modules.iter().map(|(module, state)| {
            text(format!("{}: {}", module.display_name(), state))
                .size(12)
                .color(styles::subsystem_color(*state))
                .into()
        });
        row(modules).spacing(20).into()
    }
}

impl Drop for VisumKiosk {
    fn drop(&mut self) {
        // window closed; stop polling before the process exits
        let _ = self.command_sender.send(ServiceCommand::Stop);
    }
}

async fn analyze_file(client: VisumClient, path: String) -> Result<SkinReport, String> {
    let image = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("Could not read {}: {}", path, e))?;
    analysis::analyze(&client, image)
        .await
        .map_err(|e| e.to_string())
}

fn item_list<'a>(title: &str, items: &'a [Item]) -> Element<'a, Message> {
    let mut list = column![text(title.to_string()).size(15)].spacing(2);
    for item in items.iter().take(ITEMS_SHOWN) {
        let line = match &item.description {
            Some(description) => format!("- {}: {}", item.name, description),
            None => format!("- {}", item.name),
        };
        list = list.push(text(line).size(13));
    }
    if items.len() > ITEMS_SHOWN {
        list = list.push(text(format!("+{} more", items.len() - ITEMS_SHOWN)).size(12));
    }
    list.into()
}
