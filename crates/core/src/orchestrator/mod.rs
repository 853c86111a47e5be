//! Top-level application state: which screen is on display and how the
//! page moves between them.

use std::{cell::RefCell, rc::Rc, time::Duration};

use crate::{
    config::{OrchestratorConfig, TransitionTiming},
    timeline::{LoopHandle, Registration},
    transition::{Layer, TransitionTracker},
    view::{HeroAction, MenuAction, MenuEntry, Screen, ScreenKey, ViewId},
};

/// What is on screen. Created with the loading splash up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub current_view: ViewId,
    pub is_menu_open: bool,
    pub is_loading: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            current_view: ViewId::Home,
            is_menu_open: false,
            is_loading: true,
        }
    }
}

impl ViewState {
    /// Selects the one screen to show: the splash while loading, then the
    /// menu while it is open, then the current view.
    pub fn screen(&self) -> Screen {
        if self.is_loading {
            Screen::Loading
        } else if self.is_menu_open {
            Screen::Menu {
                active: self.current_view,
            }
        } else {
            Screen::Content(self.current_view)
        }
    }
}

/// Result of picking a menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    Navigated(ViewId),
    /// The caller should open `href`; the view state has not changed.
    OpenExternal(&'static str),
}

#[derive(Debug)]
struct Session {
    state: ViewState,
    transitions: TransitionTracker,
    config: OrchestratorConfig,
}

impl Session {
    fn new(config: OrchestratorConfig) -> Self {
        let state = ViewState::default();
        Self {
            transitions: TransitionTracker::new(state.screen().key()),
            state,
            config,
        }
    }

    fn timing_from(&self, key: ScreenKey) -> (TransitionTiming, TransitionTiming) {
        match key {
            ScreenKey::Loading => (self.config.loading_exit, self.config.content_reveal),
            _ => (self.config.page, self.config.page),
        }
    }

    /// Applies `change` and starts a transition when the selected screen
    /// changes, or when `replay` is set and the same content stays selected.
    fn update(&mut self, now: Duration, replay: bool, change: impl FnOnce(&mut ViewState)) {
        let before = self.state.screen();
        change(&mut self.state);
        let after = self.state.screen();

        let replayed = replay && before == after && matches!(after, Screen::Content(_));
        if before.key() != after.key() || replayed {
            let (exit, enter) = self.timing_from(before.key());
            self.transitions.begin(after.key(), now, exit, enter);
        }
    }

    fn complete_loading(&mut self, now: Duration) -> bool {
        if !self.state.is_loading {
            return false;
        }
        self.update(now, false, |state| state.is_loading = false);
        true
    }
}

/// Single owner of [`ViewState`]. Views and the menu only ever ask it to
/// navigate or toggle the menu.
pub struct ViewOrchestrator {
    session: Rc<RefCell<Session>>,
    handle: LoopHandle,
    loading_timer: Option<Registration>,
}

impl ViewOrchestrator {
    /// Creates the orchestrator and schedules the end of the loading splash
    /// `config.loading_delay_ms` from now.
    pub fn mount(handle: &LoopHandle, config: OrchestratorConfig) -> Self {
        let delay = config.loading_delay();
        let session = Rc::new(RefCell::new(Session::new(config)));

        let loading_timer = {
            let weak = Rc::downgrade(&session);
            handle.set_timeout(delay, move |now| {
                if let Some(session) = weak.upgrade() {
                    if session.borrow_mut().complete_loading(now) {
                        tracing::debug!("loading finished");
                    }
                }
            })
        };
        tracing::debug!(?delay, "view orchestrator mounted");

        Self {
            session,
            handle: handle.clone(),
            loading_timer: Some(loading_timer),
        }
    }

    pub fn state(&self) -> ViewState {
        self.session.borrow().state
    }

    pub fn screen(&self) -> Screen {
        self.state().screen()
    }

    /// Shows `view` and closes the menu. Navigating to the view already on
    /// display replays its entrance.
    pub fn navigate(&mut self, view: ViewId) {
        tracing::debug!(%view, "navigate");
        let now = self.handle.now();
        self.session.borrow_mut().update(now, true, |state| {
            state.current_view = view;
            state.is_menu_open = false;
        });
    }

    pub fn toggle_menu(&mut self) {
        let now = self.handle.now();
        let mut session = self.session.borrow_mut();
        session.update(now, false, |state| state.is_menu_open = !state.is_menu_open);
        tracing::debug!(open = session.state.is_menu_open, "menu toggled");
    }

    /// Ends the loading splash. Later calls do nothing.
    pub fn complete_loading(&mut self) {
        let now = self.handle.now();
        if self.session.borrow_mut().complete_loading(now) {
            tracing::debug!("loading finished early");
        }
        self.loading_timer = None;
    }

    /// Navigation bar logo.
    pub fn go_home(&mut self) {
        self.navigate(ViewId::Home);
    }

    pub fn hero_action(&mut self, action: HeroAction) {
        self.navigate(action.target());
    }

    pub fn select_menu_entry(&mut self, entry: &MenuEntry) -> MenuOutcome {
        match entry.action {
            MenuAction::Navigate(view) => {
                self.navigate(view);
                MenuOutcome::Navigated(view)
            }
            MenuAction::Download { href } => {
                tracing::debug!(href, "external menu entry");
                MenuOutcome::OpenExternal(href)
            }
        }
    }

    /// Screens visible right now with their opacity.
    pub fn layers(&self) -> Vec<Layer> {
        self.session.borrow().transitions.layers(self.handle.now())
    }

    /// Whether every transition has finished.
    pub fn is_settled(&self) -> bool {
        self.session.borrow().transitions.is_settled(self.handle.now())
    }

    /// Consumes the orchestrator. Dropping it releases the loading timer if
    /// it has not fired yet, so this is the same as letting it go out of
    /// scope.
    pub fn teardown(self) {}
}

impl Drop for ViewOrchestrator {
    fn drop(&mut self) {
        if let Some(timer) = self.loading_timer.take() {
            if timer.cancel() {
                tracing::debug!("pending loading timer released");
            }
        }
    }
}

impl std::fmt::Debug for ViewOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewOrchestrator")
            .field("state", &self.state())
            .finish()
    }
}
