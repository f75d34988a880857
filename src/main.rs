use pokedex;

mod screen;
mod sprite;
mod widget;

use crate::pokedex::{Config, Index, Session};
use crate::screen::Roller;
use crate::screen::roller;
use crate::widget::logo;

use iced::widget::{center, column, container, row, text};
use iced::{Center, Element, Fill, Font, Subscription, Task, Theme};
use std::path::PathBuf;

pub fn main() -> iced::Result {
    tracing_subscriber::fmt::init();

    iced::application(Pokeroll::new, Pokeroll::update, Pokeroll::view)
        .subscription(Pokeroll::subscription)
        .theme(Pokeroll::theme)
        .default_font(Font::MONOSPACE)
        .window_size((1200.0, 800.0))
        .run()
}

struct Pokeroll {
    state: State,
}

enum State {
    Loading,
    Ready {
        session: Session,
        roller: Roller,
    },
    Errored(anywho::Error),
}

#[derive(Debug, Clone)]
enum Message {
    Loaded(Result<Session, anywho::Error>),
    IndexFetched(Result<Index, pokedex::Error>),
    Roller(roller::Message),
}

impl Pokeroll {
    fn new() -> (Self, Task<Message>) {
        (
            Self {
                state: State::Loading,
            },
            Task::perform(load(), Message::Loaded),
        )
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Loaded(Ok(session)) => {
                let fetch_index = Task::perform(
                    {
                        let session = session.clone();

                        async move { session.fetch_index().await }
                    },
                    Message::IndexFetched,
                );

                self.state = State::Ready {
                    session,
                    roller: Roller::new(),
                };

                fetch_index
            }
            Message::Loaded(Err(error)) => {
                log::error!("{error}");

                self.state = State::Errored(error);

                Task::none()
            }
            Message::IndexFetched(Ok(index)) => {
                let State::Ready { roller, .. } = &mut self.state else {
                    return Task::none();
                };

                log::info!("Loaded {} names", index.len());

                roller.load_index(index);

                Task::none()
            }
            Message::IndexFetched(Err(error)) => {
                // Manual picks stay unavailable; random rolls still work
                log::error!("{error}");

                Task::none()
            }
            Message::Roller(message) => {
                let State::Ready {
                    session, roller, ..
                } = &mut self.state
                else {
                    return Task::none();
                };

                roller.update(message, session).map(Message::Roller)
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        match &self.state {
            State::Loading => center(column![logo(40), text("Loading...")].spacing(20).align_x(Center))
                .into(),
            State::Errored(error) => center(
                column![logo(40), text!("Could not start: {error}")]
                    .spacing(20)
                    .align_x(Center),
            )
            .into(),
            State::Ready { session, roller } => {
                let navbar = container(
                    row![logo(14), text(session.config().api_url.as_str()).size(10)]
                        .spacing(20)
                        .width(Fill)
                        .align_y(Center),
                )
                .padding([5, 10])
                .style(container::dark);

                let roller = roller
                    .view(&session.config().locale)
                    .map(Message::Roller);

                column![container(roller).height(Fill), navbar].into()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let State::Ready { roller, .. } = &self.state else {
            return Subscription::none();
        };

        roller.subscription().map(Message::Roller)
    }

    fn theme(&self) -> Theme {
        Theme::CatppuccinMocha
    }
}

async fn load() -> Result<Session, anywho::Error> {
    let config = Config::load(config_path()).await?;

    Ok(Session::open(config).await?)
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_default()
        .join(env!("CARGO_PKG_NAME"))
        .join("config.ron")
}
