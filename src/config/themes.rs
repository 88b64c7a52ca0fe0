use ratatui::style::{Color, Style};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                background: Color::Rgb(0xff, 0xff, 0xff),
                sidebar: Color::Rgb(0xf5, 0xf6, 0xfa),
                border: Color::Rgb(0xe3, 0xe5, 0xea),
                primary: Color::Rgb(0x19, 0x76, 0xd2),
                accent: Color::Rgb(0xff, 0x40, 0x81),
                text: Color::Rgb(0x42, 0x42, 0x42),
                muted: Color::Rgb(0x99, 0x99, 0x99),
                selection: Color::Rgb(0xdd, 0xe9, 0xf7),
            },
            Theme::Dark => Palette {
                background: Color::Rgb(0x1b, 0x1d, 0x22),
                sidebar: Color::Rgb(0x23, 0x26, 0x2d),
                border: Color::Rgb(0x3a, 0x3e, 0x47),
                primary: Color::Rgb(0x64, 0xb5, 0xf6),
                accent: Color::Rgb(0xff, 0x80, 0xab),
                text: Color::Rgb(0xe4, 0xe6, 0xeb),
                muted: Color::Rgb(0x8a, 0x8f, 0x98),
                selection: Color::Rgb(0x2c, 0x3e, 0x55),
            },
        }
    }
}

/// Colours the UI keys off for the active theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub sidebar: Color,
    pub border: Color,
    pub primary: Color,
    pub accent: Color,
    pub text: Color,
    pub muted: Color,
    pub selection: Color,
}

impl Palette {
    pub fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    pub fn sidebar_base(&self) -> Style {
        Style::default().fg(self.text).bg(self.sidebar)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.border)
    }
}
