use std::{cell::Cell, rc::Rc};

use serde::{Deserialize, Serialize};

/// Colour scheme of the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
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
}

/// Owner side of the process-wide theme indicator.
///
/// Components never get the signal itself, only a [`ThemeReader`], so the
/// theme can change under them but not through them.
#[derive(Debug, Clone, Default)]
pub struct ThemeSignal {
    current: Rc<Cell<Theme>>,
}

impl ThemeSignal {
    pub fn new(theme: Theme) -> Self {
        Self {
            current: Rc::new(Cell::new(theme)),
        }
    }

    pub fn get(&self) -> Theme {
        self.current.get()
    }

    pub fn set(&self, theme: Theme) {
        tracing::debug!(?theme, "theme changed");
        self.current.set(theme);
    }

    pub fn toggle(&self) -> Theme {
        let next = self.get().toggled();
        self.set(next);
        next
    }

    pub fn reader(&self) -> ThemeReader {
        ThemeReader {
            current: self.current.clone(),
        }
    }
}

/// Read-only view over a [`ThemeSignal`].
#[derive(Debug, Clone)]
pub struct ThemeReader {
    current: Rc<Cell<Theme>>,
}

impl ThemeReader {
    /// Reader pinned to a theme nobody can change.
    pub fn fixed(theme: Theme) -> Self {
        ThemeSignal::new(theme).reader()
    }

    pub fn get(&self) -> Theme {
        self.current.get()
    }

    pub fn is_dark(&self) -> bool {
        self.get() == Theme::Dark
    }
}
