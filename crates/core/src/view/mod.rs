use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::PortfolioError;

/// The five mutually exclusive content sections of the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewId {
    #[default]
    Home,
    About,
    Projects,
    Skills,
    Contact,
}

impl ViewId {
    pub const ALL: [ViewId; 5] = [
        ViewId::Home,
        ViewId::About,
        ViewId::Projects,
        ViewId::Skills,
        ViewId::Contact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewId::Home => "home",
            ViewId::About => "about",
            ViewId::Projects => "projects",
            ViewId::Skills => "skills",
            ViewId::Contact => "contact",
        }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewId {
    type Err = PortfolioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ViewId::ALL
            .into_iter()
            .find(|view| view.as_str() == value)
            .ok_or_else(|| PortfolioError::UnknownView(value.to_string()))
    }
}

/// What the full-screen menu does when one of its entries is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Navigate(ViewId),
    /// Opens a document outside the page; the view state is left alone.
    Download { href: &'static str },
}

/// A single entry of the full-screen menu. Labels are dictionary keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuEntry {
    pub id: &'static str,
    pub label_key: &'static str,
    pub subtitle_key: &'static str,
    pub action: MenuAction,
}

impl MenuEntry {
    /// Whether the entry should be highlighted while `current` is selected.
    pub fn is_active(&self, current: ViewId) -> bool {
        self.action == MenuAction::Navigate(current)
    }
}

/// Menu entries in display order.
pub const MENU_ENTRIES: [MenuEntry; 6] = [
    MenuEntry {
        id: "home",
        label_key: "menu.home",
        subtitle_key: "menu.home.sub",
        action: MenuAction::Navigate(ViewId::Home),
    },
    MenuEntry {
        id: "about",
        label_key: "menu.about",
        subtitle_key: "menu.about.sub",
        action: MenuAction::Navigate(ViewId::About),
    },
    MenuEntry {
        id: "projects",
        label_key: "menu.projects",
        subtitle_key: "menu.projects.sub",
        action: MenuAction::Navigate(ViewId::Projects),
    },
    MenuEntry {
        id: "skills",
        label_key: "menu.skills",
        subtitle_key: "menu.skills.sub",
        action: MenuAction::Navigate(ViewId::Skills),
    },
    MenuEntry {
        id: "download-cv",
        label_key: "menu.cv",
        subtitle_key: "menu.cv.sub",
        action: MenuAction::Download { href: "/cv.pdf" },
    },
    MenuEntry {
        id: "contact",
        label_key: "menu.contact",
        subtitle_key: "menu.contact.sub",
        action: MenuAction::Navigate(ViewId::Contact),
    },
];

pub fn menu_entry(id: &str) -> Option<&'static MenuEntry> {
    MENU_ENTRIES.iter().find(|entry| entry.id == id)
}

/// Calls to action on the home view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeroAction {
    Services,
    Contact,
}

impl HeroAction {
    pub fn target(self) -> ViewId {
        match self {
            HeroAction::Services => ViewId::Skills,
            HeroAction::Contact => ViewId::Contact,
        }
    }

    pub fn label_key(self) -> &'static str {
        match self {
            HeroAction::Services => "hero.cta1",
            HeroAction::Contact => "hero.cta2",
        }
    }
}

/// The single piece of foreground content selected for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Loading,
    Menu { active: ViewId },
    Content(ViewId),
}

impl Screen {
    pub fn key(&self) -> ScreenKey {
        match self {
            Screen::Loading => ScreenKey::Loading,
            Screen::Menu { .. } => ScreenKey::Menu,
            Screen::Content(view) => ScreenKey::View(*view),
        }
    }
}

/// Identity of a screen for transition purposes. Changing the highlighted
/// entry of the menu does not change its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenKey {
    Loading,
    Menu,
    View(ViewId),
}

impl fmt::Display for ScreenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenKey::Loading => f.write_str("loading"),
            ScreenKey::Menu => f.write_str("menu"),
            ScreenKey::View(view) => write!(f, "{view}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_view_name() {
        for view in ViewId::ALL {
            assert_eq!(view.as_str().parse::<ViewId>().unwrap(), view);
        }
        let err = "blog".parse::<ViewId>().unwrap_err();
        assert!(format!("{err}").contains("blog"));
    }

    #[test]
    fn menu_highlights_only_the_current_view() {
        let active: Vec<_> = MENU_ENTRIES
            .iter()
            .filter(|entry| entry.is_active(ViewId::Skills))
            .map(|entry| entry.id)
            .collect();
        assert_eq!(active, vec!["skills"]);

        let cv = menu_entry("download-cv").unwrap();
        assert!(ViewId::ALL.iter().all(|view| !cv.is_active(*view)));
    }

    #[test]
    fn every_view_is_reachable_from_the_menu() {
        for view in ViewId::ALL {
            assert!(MENU_ENTRIES
                .iter()
                .any(|entry| entry.action == MenuAction::Navigate(view)));
        }
    }
}
