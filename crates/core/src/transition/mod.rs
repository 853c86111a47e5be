use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{config::TransitionTiming, view::ScreenKey};

const NEWTON_ITERATIONS: usize = 8;
const BISECTION_ITERATIONS: usize = 32;
const SOLVE_EPSILON: f32 = 1e-5;

/// Timing curve mapping linear progress in `[0, 1]` to eased progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    /// CSS `ease-out`.
    EaseOut,
    /// CSS `cubic-bezier(x1, y1, x2, y2)`.
    CubicBezier { x1: f32, y1: f32, x2: f32, y2: f32 },
}

impl Easing {
    pub const fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Easing::CubicBezier { x1, y1, x2, y2 }
    }

    pub fn apply(&self, progress: f32) -> f32 {
        let progress = progress.clamp(0.0, 1.0);
        match *self {
            Easing::Linear => progress,
            Easing::EaseOut => bezier_ease(0.0, 0.0, 0.58, 1.0, progress),
            Easing::CubicBezier { x1, y1, x2, y2 } => bezier_ease(x1, y1, x2, y2, progress),
        }
    }
}

fn bezier_axis(p1: f32, p2: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t
}

fn bezier_axis_slope(p1: f32, p2: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    3.0 * u * u * p1 + 6.0 * u * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}

/// Finds the curve parameter whose x equals `x`, then returns its y.
fn bezier_ease(x1: f32, y1: f32, x2: f32, y2: f32, x: f32) -> f32 {
    if x <= 0.0 || x >= 1.0 {
        return x;
    }

    let mut t = x;
    for _ in 0..NEWTON_ITERATIONS {
        let error = bezier_axis(x1, x2, t) - x;
        if error.abs() < SOLVE_EPSILON {
            return bezier_axis(y1, y2, t);
        }
        let slope = bezier_axis_slope(x1, x2, t);
        if slope.abs() < 1e-6 {
            break;
        }
        t = (t - error / slope).clamp(0.0, 1.0);
    }

    let (mut low, mut high) = (0.0_f32, 1.0_f32);
    t = x;
    for _ in 0..BISECTION_ITERATIONS {
        let value = bezier_axis(x1, x2, t);
        if (value - x).abs() < SOLVE_EPSILON {
            break;
        }
        if value < x {
            low = t;
        } else {
            high = t;
        }
        t = (low + high) * 0.5;
    }
    bezier_axis(y1, y2, t)
}

/// Stage a visible screen is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerPhase {
    Exiting,
    Entering,
    Shown,
}

/// A screen visible at some instant together with its opacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    pub key: ScreenKey,
    pub opacity: f32,
    pub phase: LayerPhase,
}

#[derive(Debug, Clone, Copy)]
struct Crossfade {
    from: ScreenKey,
    from_opacity: f32,
    to: ScreenKey,
    started: Duration,
    exit: TransitionTiming,
    enter: TransitionTiming,
}

impl Crossfade {
    fn enter_starts(&self) -> Duration {
        self.started + self.exit.duration()
    }

    fn settles(&self) -> Duration {
        self.enter_starts() + self.enter.duration()
    }
}

/// Sequences screen changes so the outgoing screen has fully exited before
/// the incoming one starts to enter. Exactly one layer is visible at any
/// instant.
#[derive(Debug, Clone)]
pub struct TransitionTracker {
    current: ScreenKey,
    active: Option<Crossfade>,
}

impl TransitionTracker {
    /// Starts with `initial` fully shown.
    pub fn new(initial: ScreenKey) -> Self {
        Self {
            current: initial,
            active: None,
        }
    }

    /// The screen the tracker is heading to (or showing).
    pub fn target(&self) -> ScreenKey {
        self.current
    }

    /// Begins replacing whatever is visible at `now` with `to`. Passing the
    /// current key replays its exit and enter.
    pub fn begin(
        &mut self,
        to: ScreenKey,
        now: Duration,
        exit: TransitionTiming,
        enter: TransitionTiming,
    ) {
        let visible = self.layer(now);
        tracing::debug!(from = %visible.key, %to, "screen transition");
        self.active = Some(Crossfade {
            from: visible.key,
            from_opacity: visible.opacity,
            to,
            started: now,
            exit,
            enter,
        });
        self.current = to;
    }

    pub fn is_settled(&self, now: Duration) -> bool {
        self.active
            .as_ref()
            .map(|fade| now >= fade.settles())
            .unwrap_or(true)
    }

    /// Layers visible at `now`, back to front. Never empty.
    pub fn layers(&self, now: Duration) -> Vec<Layer> {
        vec![self.layer(now)]
    }

    fn layer(&self, now: Duration) -> Layer {
        let shown = Layer {
            key: self.current,
            opacity: 1.0,
            phase: LayerPhase::Shown,
        };
        let Some(fade) = self.active else {
            return shown;
        };

        if now < fade.enter_starts() {
            let progress = progress(now, fade.started, fade.exit.duration());
            return Layer {
                key: fade.from,
                opacity: fade.from_opacity * (1.0 - fade.exit.easing.apply(progress)),
                phase: LayerPhase::Exiting,
            };
        }

        if now < fade.settles() {
            let progress = progress(now, fade.enter_starts(), fade.enter.duration());
            return Layer {
                key: fade.to,
                opacity: fade.enter.easing.apply(progress),
                phase: LayerPhase::Entering,
            };
        }

        shown
    }
}

fn progress(now: Duration, start: Duration, length: Duration) -> f32 {
    if length.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_sub(start);
    (elapsed.as_secs_f32() / length.as_secs_f32()).clamp(0.0, 1.0)
}
