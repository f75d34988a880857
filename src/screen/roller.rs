use crate::pokedex::index::{self, Index};
use crate::pokedex::selector::MAX_TEAM_SIZE;
use crate::pokedex::team::{self, Event, Phase, Request, Slot, Token, Tracker};
use crate::pokedex::{Criteria, Generation, Locale, Session, creature, criteria, prefetch};
use crate::sprite;
use crate::widget::{badge, pokeball};

use iced::futures::channel::mpsc;
use iced::futures::{SinkExt, Stream, StreamExt, future};
use iced::keyboard;
use iced::task;
use iced::time;
use iced::widget::{
    button, center, column, container, horizontal_space, image, pick_list, row, scrollable, text,
    text_input,
};
use iced::{Center, Element, Fill, Subscription, Task, Theme};

use function::Binary;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

const PREFETCH_INTERVAL: Duration = Duration::from_secs(5);

pub struct Roller {
    generations: BTreeSet<Generation>,
    unique_types: bool,
    fully_evolved: bool,
    exclude_legendary: bool,
    manual: [Option<index::Name>; MAX_TEAM_SIZE],
    index: Option<Index>,
    search: String,
    matches: Vec<index::Name>,
    slots: Vec<Slot>,
    sprites: HashMap<(creature::Id, bool), Sprite>,
    warnings: Vec<String>,
    exhausted: Option<String>,
    phase: Phase,
    sampled: usize,
    tracker: Tracker,
    task: Option<task::Handle>,
    is_prefetching: bool,
}

enum Sprite {
    Loading,
    Loaded(image::Handle),
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    UniqueTypes,
    FullyEvolved,
    ExcludeLegendary,
}

#[derive(Debug, Clone)]
pub enum Message {
    GenerationToggled(Generation),
    AllGenerations,
    FilterToggled(Filter),
    SearchChanged(String),
    ManualSelected(usize, index::Name),
    ManualCleared(usize),
    Generate,
    Progressed(Token, Event),
    SpriteFetched((creature::Id, bool), Result<sprite::Image, anywho::Error>),
    Prefetch,
    Prefetched(usize),
}

impl Roller {
    pub fn new() -> Self {
        Self {
            generations: BTreeSet::from(Generation::ALL),
            unique_types: false,
            fully_evolved: false,
            exclude_legendary: false,
            manual: Default::default(),
            index: None,
            search: String::new(),
            matches: Vec::new(),
            slots: Vec::new(),
            sprites: HashMap::new(),
            warnings: Vec::new(),
            exhausted: None,
            phase: Phase::Idle,
            sampled: 0,
            tracker: Tracker::new(),
            task: None,
            is_prefetching: false,
        }
    }

    pub fn load_index(&mut self, index: Index) {
        self.index = Some(index);
        self.refresh_matches();
    }

    pub fn update(&mut self, message: Message, session: &Session) -> Task<Message> {
        match message {
            Message::GenerationToggled(generation) => {
                if !self.generations.remove(&generation) {
                    let _ = self.generations.insert(generation);
                }

                Task::none()
            }
            Message::AllGenerations => {
                self.generations = BTreeSet::from(Generation::ALL);

                Task::none()
            }
            Message::FilterToggled(filter) => {
                let flag = match filter {
                    Filter::UniqueTypes => &mut self.unique_types,
                    Filter::FullyEvolved => &mut self.fully_evolved,
                    Filter::ExcludeLegendary => &mut self.exclude_legendary,
                };

                *flag = !*flag;

                Task::none()
            }
            Message::SearchChanged(search) => {
                self.search = search;
                self.refresh_matches();

                Task::none()
            }
            Message::ManualSelected(slot, name) => {
                if let Some(manual) = self.manual.get_mut(slot) {
                    *manual = Some(name);
                }

                Task::none()
            }
            Message::ManualCleared(slot) => {
                if let Some(manual) = self.manual.get_mut(slot) {
                    *manual = None;
                }

                Task::none()
            }
            Message::Generate => {
                let Ok(criteria) = self.criteria() else {
                    return Task::none();
                };

                let request = Request::new(criteria)
                    .manual(self.manual.iter().flatten().map(|name| name.id));

                let token = self.tracker.next();

                log::info!("Generating team {token:?}: {request:?}");

                self.slots.clear();
                self.warnings.clear();
                self.exhausted = None;
                self.phase = Phase::Sampling;
                self.sampled = 0;

                let (task, handle) =
                    Task::run(generate(session, request), Message::Progressed.with(token))
                        .abortable();

                // Replacing the handle aborts the previous run
                self.task = Some(handle.abort_on_drop());

                task
            }
            Message::Progressed(token, event) => {
                if !self.tracker.is_current(token) {
                    return Task::none();
                }

                self.phase = self.phase.advance(&event);

                match event {
                    Event::Sampled(_) => {
                        self.sampled += 1;

                        Task::none()
                    }
                    Event::Rejected(id, reason) => {
                        log::debug!("{id} rejected: {reason}");

                        Task::none()
                    }
                    Event::Filled { slot, .. } => {
                        let key = (slot.id(), slot.shiny);

                        self.slots.push(slot);
                        self.fetch_sprite(key, session)
                    }
                    Event::Warning(warning) => {
                        self.warnings.push(warning.to_string());

                        Task::none()
                    }
                    Event::Finished(outcome) => {
                        self.exhausted = outcome.exhausted.map(|exhausted| exhausted.to_string());
                        self.task = None;

                        Task::none()
                    }
                }
            }
            Message::SpriteFetched(key, Ok(image)) => {
                let _ = self.sprites.insert(
                    key,
                    Sprite::Loaded(image::Handle::from_rgba(
                        image.width,
                        image.height,
                        image.rgba,
                    )),
                );

                Task::none()
            }
            Message::SpriteFetched(key, Err(error)) => {
                log::error!("{error}");

                let _ = self.sprites.insert(key, Sprite::Errored);

                Task::none()
            }
            Message::Prefetch => {
                if self.is_prefetching || self.phase.is_running() {
                    return Task::none();
                }

                self.is_prefetching = true;

                let session = session.clone();
                let generations = self.generations.clone();

                Task::perform(
                    async move {
                        prefetch::warm(&session, &generations, session.config().prefetch_batch)
                            .await
                    },
                    Message::Prefetched,
                )
            }
            Message::Prefetched(warmed) => {
                self.is_prefetching = false;

                if warmed > 0 {
                    log::info!("Prefetched {warmed} creatures");
                }

                Task::none()
            }
        }
    }

    fn refresh_matches(&mut self) {
        self.matches = self
            .index
            .iter()
            .flat_map(|index| index.search(&self.search))
            .cloned()
            .collect();
    }

    fn criteria(&self) -> Result<Criteria, criteria::Error> {
        Ok(Criteria::new(self.generations.iter().copied())?
            .unique_types(self.unique_types)
            .fully_evolved(self.fully_evolved)
            .exclude_legendary(self.exclude_legendary))
    }

    fn fetch_sprite(&mut self, key: (creature::Id, bool), session: &Session) -> Task<Message> {
        if let Some(Sprite::Loading | Sprite::Loaded(_)) = self.sprites.get(&key) {
            return Task::none();
        }

        let _ = self.sprites.insert(key, Sprite::Loading);

        let (id, shiny) = key;

        Task::perform(
            sprite::Image::fetch(session, id, shiny),
            Message::SpriteFetched.with(key),
        )
    }

    pub fn view<'a>(&'a self, locale: &Locale) -> Element<'a, Message> {
        let criteria = self.criteria();

        let generate = button(text("Roll team").size(14))
            .padding([8, 20])
            .on_press_maybe(criteria.is_ok().then_some(Message::Generate));

        let generations = {
            let toggles = Generation::ALL.into_iter().map(|generation| {
                toggle(
                    generation.to_string(),
                    self.generations.contains(&generation),
                    Message::GenerationToggled(generation),
                )
            });

            row![
                row(toggles).spacing(5).wrap(),
                toggle("All".to_owned(), false, Message::AllGenerations),
            ]
            .spacing(10)
            .align_y(Center)
        };

        let filters = row![
            toggle(
                "Unique types".to_owned(),
                self.unique_types,
                Message::FilterToggled(Filter::UniqueTypes),
            ),
            toggle(
                "Fully evolved".to_owned(),
                self.fully_evolved,
                Message::FilterToggled(Filter::FullyEvolved),
            ),
            toggle(
                "No legendaries".to_owned(),
                self.exclude_legendary,
                Message::FilterToggled(Filter::ExcludeLegendary),
            ),
            horizontal_space(),
            generate,
        ]
        .spacing(5)
        .align_y(Center);

        let manual: Element<'_, Message> = match &self.index {
            Some(_) => {
                let search = text_input("Search names...", &self.search)
                    .on_input(Message::SearchChanged)
                    .size(12)
                    .padding([4, 8])
                    .width(200);

                let pickers = row(self.manual.iter().enumerate().map(|(slot, selected)| {
                    let picker = pick_list(
                        self.matches.as_slice(),
                        selected.clone(),
                        Message::ManualSelected.with(slot),
                    )
                    .placeholder("Random")
                    .text_size(12)
                    .width(Fill);

                    let clear = button(text("×").size(12))
                        .style(button::text)
                        .padding([4, 6])
                        .on_press_maybe(
                            selected.is_some().then_some(Message::ManualCleared(slot)),
                        );

                    row![picker, clear].align_y(Center).width(Fill).into()
                }))
                .spacing(5);

                column![search, pickers].spacing(5).into()
            }
            None => text("Loading names...").size(12).into(),
        };

        let status = {
            let summary = match (&criteria, self.phase) {
                (Err(error), _) => error.to_string(),
                (Ok(_), Phase::Idle) => "Choose your filters and roll a team!".to_owned(),
                (Ok(_), Phase::Sampling | Phase::Validating) => {
                    format!("Rolling... ({} candidates checked)", self.sampled)
                }
                (Ok(_), Phase::Done) => {
                    format!("Team ready ({} candidates checked)", self.sampled)
                }
                (Ok(_), Phase::Exhausted) => self
                    .exhausted
                    .clone()
                    .unwrap_or_else(|| "No matching creature found".to_owned()),
            };

            column![text(summary).size(14)]
                .extend(
                    self.warnings
                        .iter()
                        .map(|warning| text(warning).size(12).style(text::danger).into()),
                )
                .spacing(5)
        };

        let team: Element<'_, Message> = if self.slots.is_empty() {
            center(pokeball(80)).into()
        } else {
            scrollable(
                row(self
                    .slots
                    .iter()
                    .map(|slot| card(slot, self.sprites.get(&(slot.id(), slot.shiny)), locale)))
                .spacing(10)
                .wrap(),
            )
            .height(Fill)
            .into()
        };

        column![generations, filters, manual, status, team]
            .spacing(15)
            .padding(20)
            .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let hotkeys = keyboard::on_key_press(|key, modifiers| {
            use keyboard::key::{Key, Named};

            match key.as_ref() {
                Key::Named(Named::Enter) if modifiers.is_empty() => Some(Message::Generate),
                _ => None,
            }
        });

        let prefetch = if self.is_prefetching || self.phase.is_running() {
            Subscription::none()
        } else {
            time::every(PREFETCH_INTERVAL).map(|_| Message::Prefetch)
        };

        Subscription::batch([hotkeys, prefetch])
    }
}

fn generate(session: &Session, request: Request) -> impl Stream<Item = Event> + 'static {
    let session = session.clone();

    iced::stream::channel(100, async move |mut output| {
        let (sender, mut receiver) = mpsc::unbounded();
        let mut rng = StdRng::from_os_rng();

        let generation = async {
            let _ = team::generate(&session, &request, &mut rng, move |event| {
                let _ = sender.unbounded_send(event);
            })
            .await;
        };

        let forward = async {
            while let Some(event) = receiver.next().await {
                let _ = output.send(event).await;
            }
        };

        let _ = future::join(generation, forward).await;
    })
}

fn toggle<'a>(label: String, is_active: bool, on_press: Message) -> Element<'a, Message> {
    button(text(label).size(12))
        .style(move |theme: &Theme, status| {
            if is_active {
                button::primary(theme, status)
            } else {
                button::text(theme, status)
            }
        })
        .padding([6, 12])
        .on_press(on_press)
        .into()
}

fn card<'a>(slot: &'a Slot, sprite: Option<&'a Sprite>, locale: &Locale) -> Element<'a, Message> {
    let sprite: Element<'_, Message> = match sprite {
        Some(Sprite::Loaded(handle)) => image(handle.clone())
            .width(96)
            .height(96)
            .filter_method(image::FilterMethod::Nearest)
            .into(),
        Some(Sprite::Loading) | None => center(pokeball(32)).width(96).height(96).into(),
        Some(Sprite::Errored) => center(text("?").size(32)).width(96).height(96).into(),
    };

    let name = text(slot.name(locale)).size(16);
    let number = text!("{}  ·  {}", slot.id(), slot.entry.creature.generation()).size(12);
    let types = row(slot.types().iter().copied().map(badge)).spacing(5);
    let stats = text!("{}  ·  {}", slot.height(), slot.weight()).size(12);

    let origin = if slot.manual { "Picked" } else { "Rolled" };

    container(
        column![
            sprite,
            name,
            row![number, horizontal_space(), text(origin).size(10)].align_y(Center),
            types,
            stats,
        ]
        .spacing(5)
        .align_x(Center),
    )
    .padding(10)
    .width(180)
    .style(container::bordered_box)
    .into()
}
