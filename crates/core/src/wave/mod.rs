//! Animated dot-grid background.
//!
//! A grid of dots is displaced by a travelling sine wave. Only the dots near
//! a slowly sweeping vertical band are drawn; their size, opacity and wave
//! amplitude fall off linearly with distance from the band centre.

use std::{
    cell::RefCell,
    f32::consts::TAU,
    rc::{Rc, Weak},
};

use crate::{
    config::WaveFieldConfig,
    render::{DrawSurface, Rgba},
    theme::{Theme, ThemeReader},
    timeline::{LoopHandle, Registration, WeakLoopHandle},
    Viewport,
};

const DARK_DOT: (u8, u8, u8, f32) = (255, 255, 255, 0.8);
const LIGHT_DOT: (u8, u8, u8, f32) = (129, 79, 49, 0.7);

/// Dot grid fitted to a viewport, centred by splitting the leftover space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub cols: u32,
    pub rows: u32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl GridLayout {
    pub fn for_viewport(viewport: Viewport, spacing: f32) -> Self {
        if spacing <= 0.0 {
            return Self {
                cols: 0,
                rows: 0,
                offset_x: 0.0,
                offset_y: 0.0,
            };
        }

        let width = viewport.width as f32;
        let height = viewport.height as f32;
        Self {
            cols: (width / spacing).ceil() as u32,
            rows: (height / spacing).ceil() as u32,
            offset_x: (width % spacing) / 2.0,
            offset_y: (height % spacing) / 2.0,
        }
    }

    pub fn len(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Phases advanced once per frame. Both start at zero on every mount.
///
/// They only ever feed `sin`, so they are kept within one turn to hold the
/// per-frame step size on long-lived pages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WavePhase {
    pub time: f32,
    pub sweep: f32,
}

impl WavePhase {
    pub fn advance(&mut self, config: &WaveFieldConfig) {
        self.time = (self.time + config.wave_speed).rem_euclid(TAU);
        self.sweep = (self.sweep + config.sweep_speed).rem_euclid(TAU);
    }
}

/// Horizontal position of the sweep centre. The travel spans `range` times
/// the width, centred on the viewport, so the band leaves the screen at both
/// edges before turning around.
pub fn sweep_x(sweep: f32, width: f32, range: f32) -> f32 {
    let center = (sweep.sin() + 1.0) / 2.0;
    (center * range - (range - 1.0) / 2.0) * width
}

/// 1 at the sweep centre, falling linearly to 0 at `falloff * width` away.
pub fn sweep_factor(distance: f32, width: f32, falloff: f32) -> f32 {
    let reach = width * falloff;
    if reach <= 0.0 {
        return 0.0;
    }
    (1.0 - distance.abs() / reach).max(0.0)
}

pub fn dot_color(theme: Theme, factor: f32) -> Rgba {
    let (r, g, b, scale) = match theme {
        Theme::Dark => DARK_DOT,
        Theme::Light => LIGHT_DOT,
    };
    Rgba::new(r, g, b, factor * scale)
}

/// A dot that will be drawn this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub factor: f32,
    pub color: Rgba,
}

/// Computes the dots of one frame. Dots with a zero sweep factor are left
/// out entirely.
pub fn plan_frame(
    config: &WaveFieldConfig,
    phase: WavePhase,
    viewport: Viewport,
    theme: Theme,
) -> (GridLayout, Vec<Dot>) {
    let grid = GridLayout::for_viewport(viewport, config.dot_spacing);
    let width = viewport.width as f32;
    let center = sweep_x(phase.sweep, width, config.sweep_range);

    let mut dots = Vec::new();
    for col in 0..grid.cols {
        let x = col as f32 * config.dot_spacing + grid.offset_x;
        let factor = sweep_factor(x - center, width, config.sweep_falloff);
        if factor <= 0.0 {
            continue;
        }

        let wave = (x * config.wave_frequency + phase.time).sin() * config.wave_amplitude * factor;
        let radius = config.dot_radius * (0.5 + factor * 1.5);
        let color = dot_color(theme, factor);
        for row in 0..grid.rows {
            let base_y = row as f32 * config.dot_spacing + grid.offset_y;
            dots.push(Dot {
                x,
                y: base_y + wave,
                radius,
                factor,
                color,
            });
        }
    }

    (grid, dots)
}

/// Extent of the dot centres drawn in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl DotBounds {
    fn of(dots: &[Dot]) -> Option<Self> {
        let first = dots.first()?;
        let seed = Self {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        Some(dots.iter().fold(seed, |bounds, dot| Self {
            min_x: bounds.min_x.min(dot.x),
            max_x: bounds.max_x.max(dot.x),
            min_y: bounds.min_y.min(dot.y),
            max_y: bounds.max_y.max(dot.y),
        }))
    }
}

/// Summary of a drawn frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub index: u64,
    pub viewport: Viewport,
    pub grid: GridLayout,
    pub dots_drawn: usize,
    pub bounds: Option<DotBounds>,
}

/// Draws successive frames of the field onto a surface it owns.
#[derive(Debug)]
pub struct WaveField<S> {
    config: WaveFieldConfig,
    phase: WavePhase,
    theme: ThemeReader,
    surface: S,
    viewport: Viewport,
    frames_drawn: u64,
    last_frame: Option<FrameStats>,
}

impl<S: DrawSurface> WaveField<S> {
    pub fn new(surface: S, config: WaveFieldConfig, theme: ThemeReader) -> Self {
        Self {
            config,
            phase: WavePhase::default(),
            theme,
            viewport: surface.size(),
            surface,
            frames_drawn: 0,
            last_frame: None,
        }
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn last_frame(&self) -> Option<FrameStats> {
        self.last_frame
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Err(err) = self.surface.resize(viewport) {
            tracing::warn!(?viewport, %err, "keeping previous surface size");
        }
    }

    /// Clears the surface, draws the current phase and advances it. A
    /// zero-sized viewport draws no dots, whatever size the surface kept.
    pub fn draw_frame(&mut self) -> FrameStats {
        let viewport = if self.viewport.is_empty() {
            self.viewport
        } else {
            self.surface.size()
        };
        // Theme is read per frame.
        let theme = self.theme.get();
        let (grid, dots) = plan_frame(&self.config, self.phase, viewport, theme);

        self.surface.clear();
        for dot in &dots {
            self.surface.fill_circle(dot.x, dot.y, dot.radius, dot.color);
        }
        self.phase.advance(&self.config);

        let stats = FrameStats {
            index: self.frames_drawn,
            viewport,
            grid,
            dots_drawn: dots.len(),
            bounds: DotBounds::of(&dots),
        };
        self.frames_drawn += 1;
        self.last_frame = Some(stats);
        tracing::trace!(index = stats.index, dots = stats.dots_drawn, "field frame drawn");
        stats
    }
}

struct Mounted<S> {
    field: WaveField<S>,
    pending_frame: Option<Registration>,
}

/// A [`WaveField`] mounted on an event loop: it redraws on every animation
/// frame and follows viewport resizes until it is dropped.
pub struct AnimatedFieldRenderer<S: DrawSurface + 'static> {
    shared: Rc<RefCell<Mounted<S>>>,
    _resize: Registration,
}

impl<S: DrawSurface + 'static> AnimatedFieldRenderer<S> {
    /// Mounts the field on `surface`. Without a surface nothing is
    /// registered and nothing is drawn.
    pub fn mount(
        handle: &LoopHandle,
        surface: Option<S>,
        config: WaveFieldConfig,
        theme: ThemeReader,
    ) -> Option<Self> {
        let Some(surface) = surface else {
            tracing::debug!("no drawing surface, animated field not mounted");
            return None;
        };

        let mut field = WaveField::new(surface, config, theme);
        field.resize(handle.viewport());

        let shared = Rc::new(RefCell::new(Mounted {
            field,
            pending_frame: None,
        }));

        let resize = {
            let weak = Rc::downgrade(&shared);
            handle.on_resize(move |viewport| {
                if let Some(mounted) = weak.upgrade() {
                    mounted.borrow_mut().field.resize(viewport);
                }
            })
        };

        shared.borrow_mut().field.draw_frame();
        schedule_frame(handle, handle.downgrade(), Rc::downgrade(&shared));
        tracing::debug!(viewport = ?handle.viewport(), "animated field mounted");

        Some(Self {
            shared,
            _resize: resize,
        })
    }

    pub fn last_frame(&self) -> Option<FrameStats> {
        self.shared.borrow().field.last_frame()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.shared.borrow().field.frames_drawn
    }

    pub fn phase(&self) -> WavePhase {
        self.shared.borrow().field.phase()
    }

    /// Whether a next frame is queued on the loop.
    pub fn is_running(&self) -> bool {
        self.shared
            .borrow()
            .pending_frame
            .as_ref()
            .map(Registration::is_pending)
            .unwrap_or(false)
    }

    pub fn with_surface<R>(&self, inspect: impl FnOnce(&S) -> R) -> R {
        inspect(self.shared.borrow().field.surface())
    }

    /// Consumes the renderer. Dropping it cancels the queued frame and
    /// releases the resize listener, so this is the same as letting it go
    /// out of scope.
    pub fn unmount(self) {}
}

impl<S: DrawSurface + 'static> Drop for AnimatedFieldRenderer<S> {
    fn drop(&mut self) {
        let pending = self.shared.borrow_mut().pending_frame.take();
        if let Some(pending) = pending {
            pending.cancel();
        }
        tracing::debug!("animated field unmounted");
    }
}

fn schedule_frame<S: DrawSurface + 'static>(
    handle: &LoopHandle,
    weak_handle: WeakLoopHandle,
    weak: Weak<RefCell<Mounted<S>>>,
) {
    let Some(mounted) = weak.upgrade() else {
        return;
    };

    let target = weak.clone();
    let registration = handle.request_frame(move |_| {
        let (Some(mounted), Some(handle)) = (target.upgrade(), weak_handle.upgrade()) else {
            return;
        };
        mounted.borrow_mut().field.draw_frame();
        schedule_frame(&handle, weak_handle, target);
    });

    // Replaces the registration of the frame that just ran.
    let previous = mounted.borrow_mut().pending_frame.replace(registration);
    drop(previous);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        render::{PixmapSurface, RecordingSurface},
        theme::ThemeSignal,
        timeline::EventLoop,
    };

    fn mount_recording(
        event_loop: &EventLoop,
        theme: ThemeReader,
    ) -> (AnimatedFieldRenderer<RecordingSurface>, crate::render::DrawLog) {
        let surface = RecordingSurface::new(Viewport::new(1, 1));
        let log = surface.log();
        let renderer = AnimatedFieldRenderer::mount(
            &event_loop.handle(),
            Some(surface),
            WaveFieldConfig::default(),
            theme,
        )
        .expect("surface is present");
        (renderer, log)
    }

    #[test]
    fn grid_is_centred_on_the_viewport() {
        let small = GridLayout::for_viewport(Viewport::new(800, 600), 35.0);
        assert_eq!((small.cols, small.rows), (23, 18));
        assert_eq!((small.offset_x, small.offset_y), (15.0, 2.5));

        let large = GridLayout::for_viewport(Viewport::new(1600, 900), 35.0);
        assert_eq!((large.cols, large.rows), (46, 26));
        assert_eq!((large.offset_x, large.offset_y), (12.5, 12.5));
    }

    #[test]
    fn sweep_factor_falls_off_linearly() {
        let width = 1000.0;
        assert_eq!(sweep_factor(0.0, width, 0.3), 1.0);
        assert!((sweep_factor(150.0, width, 0.3) - 0.5).abs() < 1e-6);
        assert!((sweep_factor(-75.0, width, 0.3) - 0.75).abs() < 1e-6);
        assert_eq!(sweep_factor(300.0, width, 0.3), 0.0);
        assert_eq!(sweep_factor(900.0, width, 0.3), 0.0);
        assert_eq!(sweep_factor(0.0, 0.0, 0.3), 0.0);
    }

    #[test]
    fn sweep_travels_past_both_edges() {
        let width = 1000.0;
        let half_pi = std::f32::consts::FRAC_PI_2;
        assert!((sweep_x(0.0, width, 1.4) - 500.0).abs() < 1e-3);
        assert!((sweep_x(half_pi, width, 1.4) - 1200.0).abs() < 1e-2);
        assert!((sweep_x(-half_pi, width, 1.4) + 200.0).abs() < 1e-2);
    }

    #[test]
    fn far_dots_are_never_drawn() {
        let event_loop = EventLoop::new(Viewport::new(800, 600));
        let (renderer, log) = mount_recording(&event_loop, ThemeReader::fixed(Theme::Light));

        // Sweep centre at x = 400 and reach of 240 px: columns x = 190..=610.
        assert_eq!(log.draw_calls(), 13 * 18);
        let frame = renderer.last_frame().unwrap();
        assert_eq!(frame.dots_drawn, 13 * 18);
        assert!(frame.dots_drawn < frame.grid.len());
        assert!(log
            .current_frame()
            .iter()
            .all(|circle| circle.radius > 1.0 && circle.color.a > 0.0));
    }

    #[test]
    fn dots_grow_and_brighten_towards_the_sweep() {
        let config = WaveFieldConfig::default();
        let (_, dots) = plan_frame(
            &config,
            WavePhase::default(),
            Viewport::new(800, 600),
            Theme::Dark,
        );

        let nearest = dots
            .iter()
            .max_by(|a, b| a.factor.total_cmp(&b.factor))
            .unwrap();
        let farthest = dots
            .iter()
            .min_by(|a, b| a.factor.total_cmp(&b.factor))
            .unwrap();
        assert!(nearest.radius > farthest.radius);
        assert!(nearest.color.a > farthest.color.a);
        assert_eq!((nearest.color.r, nearest.color.g, nearest.color.b), (255, 255, 255));
        assert!(nearest.color.a <= 0.8);
    }

    #[test]
    fn advances_one_phase_step_per_frame() {
        let event_loop = EventLoop::new(Viewport::new(800, 600));
        let (renderer, _log) = mount_recording(&event_loop, ThemeReader::fixed(Theme::Light));
        assert_eq!(renderer.frames_drawn(), 1);

        for _ in 0..9 {
            assert_eq!(event_loop.tick_frame(), 1);
        }
        assert_eq!(renderer.frames_drawn(), 10);
        let phase = renderer.phase();
        assert!((phase.time - 0.3).abs() < 1e-4);
        assert!((phase.sweep - 0.05).abs() < 1e-5);
        assert!(renderer.is_running());
    }

    #[test]
    fn phase_steps_stay_exact_after_long_runs() {
        let config = WaveFieldConfig::default();
        // About 70 hours of frames at 60 fps.
        let mut phase = WavePhase {
            time: 453_600.0,
            sweep: 75_600.0,
        };
        phase.advance(&config);

        for _ in 0..10_000 {
            let before = phase;
            phase.advance(&config);
            assert!(phase.time >= 0.0 && phase.time < TAU);
            assert!(phase.sweep >= 0.0 && phase.sweep < TAU);

            let time_step = (phase.time - before.time).rem_euclid(TAU);
            let sweep_step = (phase.sweep - before.sweep).rem_euclid(TAU);
            assert!((time_step - config.wave_speed).abs() < 1e-5, "{time_step}");
            assert!((sweep_step - config.sweep_speed).abs() < 1e-5, "{sweep_step}");
        }
    }

    #[test]
    fn theme_changes_apply_on_the_next_frame() {
        let event_loop = EventLoop::new(Viewport::new(800, 600));
        let signal = ThemeSignal::new(Theme::Light);
        let (_renderer, log) = mount_recording(&event_loop, signal.reader());

        let light = log.current_frame()[0].color;
        assert_eq!((light.r, light.g, light.b), (129, 79, 49));

        signal.set(Theme::Dark);
        event_loop.tick_frame();
        let dark = log.current_frame()[0].color;
        assert_eq!((dark.r, dark.g, dark.b), (255, 255, 255));
    }

    #[test]
    fn resize_recomputes_the_grid_on_the_next_frame() {
        let event_loop = EventLoop::new(Viewport::new(800, 600));
        let (renderer, log) = mount_recording(&event_loop, ThemeReader::fixed(Theme::Dark));

        let before = renderer.last_frame().unwrap();
        assert_eq!(before.viewport, Viewport::new(800, 600));
        assert!(before.bounds.unwrap().max_x < 800.0);

        event_loop.resize(Viewport::new(1600, 900));
        event_loop.tick_frame();

        let after = renderer.last_frame().unwrap();
        assert_eq!(after.viewport, Viewport::new(1600, 900));
        assert_eq!(after.grid, GridLayout::for_viewport(Viewport::new(1600, 900), 35.0));

        let bounds = after.bounds.unwrap();
        assert!(bounds.max_x > 800.0 && bounds.max_x < 1600.0);
        assert!(bounds.max_y > 600.0);
        for circle in log.current_frame() {
            let column = (circle.x - after.grid.offset_x) / 35.0;
            assert!((column - column.round()).abs() < 1e-3);
        }
        assert_eq!(
            log.resizes(),
            vec![Viewport::new(800, 600), Viewport::new(1600, 900)]
        );
    }

    #[test]
    fn zero_sized_viewport_draws_nothing() {
        let event_loop = EventLoop::new(Viewport::new(200, 100));
        let surface = PixmapSurface::new(Viewport::new(200, 100)).unwrap();
        let renderer = AnimatedFieldRenderer::mount(
            &event_loop.handle(),
            Some(surface),
            WaveFieldConfig::default(),
            ThemeReader::fixed(Theme::Dark),
        )
        .unwrap();
        assert!(renderer.last_frame().unwrap().dots_drawn > 0);

        event_loop.resize(Viewport::new(0, 100));
        event_loop.tick_frame();
        let frame = renderer.last_frame().unwrap();
        assert_eq!(frame.viewport, Viewport::new(0, 100));
        assert_eq!(frame.dots_drawn, 0);
        assert!(frame.bounds.is_none());
        let blank = renderer.with_surface(|surface| {
            assert_eq!(surface.size(), Viewport::new(200, 100));
            surface.pixmap().pixels().iter().all(|pixel| pixel.alpha() == 0)
        });
        assert!(blank);
        assert!(renderer.is_running());

        event_loop.resize(Viewport::new(200, 100));
        event_loop.tick_frame();
        assert!(renderer.last_frame().unwrap().dots_drawn > 0);
    }

    #[test]
    fn nothing_runs_after_unmount() {
        let event_loop = EventLoop::new(Viewport::new(800, 600));
        let (renderer, log) = mount_recording(&event_loop, ThemeReader::fixed(Theme::Light));
        event_loop.tick_frame();
        event_loop.tick_frame();

        let draws = log.draw_calls();
        let clears = log.clears();
        renderer.unmount();

        assert_eq!(event_loop.pending_frames(), 0);
        assert_eq!(event_loop.resize_listeners(), 0);

        event_loop.resize(Viewport::new(1024, 768));
        assert_eq!(event_loop.tick_frame(), 0);
        assert_eq!(log.draw_calls(), draws);
        assert_eq!(log.clears(), clears);
        assert_eq!(log.resizes().len(), 1);
    }

    #[test]
    fn missing_surface_is_a_silent_no_op() {
        let event_loop = EventLoop::new(Viewport::new(800, 600));
        let renderer = AnimatedFieldRenderer::<RecordingSurface>::mount(
            &event_loop.handle(),
            None,
            WaveFieldConfig::default(),
            ThemeReader::fixed(Theme::Light),
        );

        assert!(renderer.is_none());
        assert_eq!(event_loop.pending_frames(), 0);
        assert_eq!(event_loop.resize_listeners(), 0);
    }

    #[test]
    fn rasterises_onto_a_pixmap() {
        let event_loop = EventLoop::new(Viewport::new(200, 100));
        let surface = PixmapSurface::new(Viewport::new(10, 10)).unwrap();
        let renderer = AnimatedFieldRenderer::mount(
            &event_loop.handle(),
            Some(surface),
            WaveFieldConfig::default(),
            ThemeReader::fixed(Theme::Dark),
        )
        .unwrap();

        let frame = renderer.last_frame().unwrap();
        assert!(frame.dots_drawn > 0);
        let painted = renderer.with_surface(|surface| {
            assert_eq!(surface.size(), Viewport::new(200, 100));
            surface.pixmap().pixels().iter().any(|pixel| pixel.alpha() > 0)
        });
        assert!(painted);
    }
}
