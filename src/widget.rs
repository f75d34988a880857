use crate::pokedex::Type;

use iced::border;
use iced::widget::{canvas, container, row, text};
use iced::{Center, Color, Element, Pixels};

pub fn logo<'a, Message: 'a>(size: impl Into<Pixels>) -> Element<'a, Message> {
    const PKG_NAME: &str = env!("CARGO_PKG_NAME");

    let size = size.into();

    let mut name = String::with_capacity(PKG_NAME.len());
    name.extend(PKG_NAME.chars().take(1).map(|c| c.to_ascii_uppercase()));
    name.push_str(PKG_NAME.get(1..).unwrap_or_default());

    row![pokeball(size), text(name).size(size)]
        .spacing(size.0 / 2.0)
        .align_y(Center)
        .into()
}

pub fn pokeball<'a, Message: 'a>(size: impl Into<Pixels>) -> Element<'a, Message> {
    use iced::mouse;
    use iced::{Point, Rectangle, Renderer, Size, Theme};

    struct Pokeball;

    impl<Message> canvas::Program<Message> for Pokeball {
        type State = canvas::Cache;

        fn draw(
            &self,
            cache: &Self::State,
            renderer: &Renderer,
            theme: &Theme,
            bounds: Rectangle,
            _cursor: mouse::Cursor,
        ) -> Vec<canvas::Geometry> {
            let pokeball = cache.draw(renderer, bounds.size(), |frame| {
                const RADIUS: f32 = 100.0;
                const LINE: f32 = 30.0;

                let palette = theme.palette();

                let center = Point::new(RADIUS, RADIUS);
                let outer_circle = canvas::Path::circle(center, RADIUS);
                let inner_circle = canvas::Path::circle(center, RADIUS / 2.0);
                let button = canvas::Path::circle(center, RADIUS / 4.0);

                let line = Rectangle::new(
                    Point::new(0.0, RADIUS - LINE / 2.0),
                    Size::new(2.0 * RADIUS, LINE),
                );

                frame.scale((bounds.width - 0.5) / (2.0 * RADIUS));

                frame.fill(&outer_circle, palette.danger);
                frame.fill(&inner_circle, palette.background);
                frame.fill_rectangle(line.position(), line.size(), palette.background);
                frame.fill(&button, palette.text);
            });

            vec![pokeball]
        }
    }

    let size = size.into();

    canvas(Pokeball).width(size).height(size).into()
}

/// A small colored label for a [`Type`].
pub fn badge<'a, Message: 'a>(type_: Type) -> Element<'a, Message> {
    let background = color(type_);

    container(text(type_.as_str()).size(11))
        .padding([2, 8])
        .style(move |_theme| container::Style {
            background: Some(background.into()),
            text_color: Some(Color::WHITE),
            border: border::rounded(8),
            ..container::Style::default()
        })
        .into()
}

fn color(type_: Type) -> Color {
    let rgb = match type_ {
        Type::Normal => 0xA8A77A,
        Type::Fire => 0xEE8130,
        Type::Water => 0x6390F0,
        Type::Grass => 0x7AC74C,
        Type::Electric => 0xD9B92B,
        Type::Ice => 0x74C6C2,
        Type::Fighting => 0xC22E28,
        Type::Poison => 0xA33EA1,
        Type::Ground => 0xC9A94F,
        Type::Flying => 0x8F7BD8,
        Type::Psychic => 0xF95587,
        Type::Bug => 0x96A81A,
        Type::Rock => 0xA89536,
        Type::Ghost => 0x735797,
        Type::Dragon => 0x6F35FC,
        Type::Dark => 0x705746,
        Type::Steel => 0x8E8EAB,
        Type::Fairy => 0xD685AD,
    };

    Color::from_rgb8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}
