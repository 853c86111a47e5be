//! Core library for Portfolio Stage.
//!
//! Two pieces drive the page: [`ViewOrchestrator`] owns the view state and
//! picks the single screen on display, and [`AnimatedFieldRenderer`] paints
//! the animated dot field behind the home view. Both run on an
//! [`EventLoop`], a single-threaded host whose timers, frame requests and
//! resize listeners are released as soon as their owner goes away.

pub mod config;
pub mod error;
pub mod i18n;
pub mod orchestrator;
pub mod render;
pub mod theme;
pub mod timeline;
pub mod transition;
pub mod view;
pub mod wave;

pub use config::{AppConfig, OrchestratorConfig, TransitionTiming, Viewport, WaveFieldConfig};
pub use error::{PortfolioError, Result};
pub use i18n::{Catalog, Language, PassThrough, Translate};
pub use orchestrator::{MenuOutcome, ViewOrchestrator, ViewState};
pub use render::{DrawLog, DrawSurface, PixmapSurface, RecordingSurface, Rgba};
pub use theme::{Theme, ThemeReader, ThemeSignal};
pub use timeline::{EventLoop, LoopHandle, Registration, WeakLoopHandle};
pub use transition::{Easing, Layer, LayerPhase, TransitionTracker};
pub use view::{HeroAction, MenuAction, MenuEntry, Screen, ScreenKey, ViewId, MENU_ENTRIES};
pub use wave::{AnimatedFieldRenderer, FrameStats, GridLayout, WaveField, WavePhase};
