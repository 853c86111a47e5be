//! Drawing surfaces the animated field paints onto.
//!
//! [`PixmapSurface`] rasterises with tiny-skia and can be written out as PNG.
//! [`RecordingSurface`] keeps a log of the calls it receives instead of
//! producing pixels, which is what tests and dry runs use.

use std::{cell::RefCell, path::Path, rc::Rc};

use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Transform};

use crate::{PortfolioError, Result, Viewport};

/// Straight (non-premultiplied) colour with a fractional alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn to_skia(self) -> Color {
        let alpha = (self.a.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color::from_rgba8(self.r, self.g, self.b, alpha)
    }
}

/// Something a frame can be drawn on.
pub trait DrawSurface {
    fn size(&self) -> Viewport;

    /// Matches the pixel dimensions to `viewport`. Content may be discarded.
    fn resize(&mut self, viewport: Viewport) -> Result<()>;

    fn clear(&mut self);

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba);
}

/// Raster surface backed by a tiny-skia [`Pixmap`].
#[derive(Debug, Clone)]
pub struct PixmapSurface {
    pixmap: Pixmap,
}

impl PixmapSurface {
    pub fn new(viewport: Viewport) -> Result<Self> {
        Ok(Self {
            pixmap: allocate(viewport)?,
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Alpha of the pixel at `(x, y)`, or `None` outside the surface.
    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.pixmap.pixel(x, y).map(|pixel| pixel.alpha())
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|err| PortfolioError::Surface(err.to_string()))
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

fn allocate(viewport: Viewport) -> Result<Pixmap> {
    Pixmap::new(viewport.width, viewport.height).ok_or_else(|| {
        PortfolioError::Surface(format!(
            "cannot allocate a {}x{} pixmap",
            viewport.width, viewport.height
        ))
    })
}

impl DrawSurface for PixmapSurface {
    fn size(&self) -> Viewport {
        Viewport::new(self.pixmap.width(), self.pixmap.height())
    }

    fn resize(&mut self, viewport: Viewport) -> Result<()> {
        if self.size() != viewport {
            self.pixmap = allocate(viewport)?;
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba) {
        let Some(path) = PathBuilder::from_circle(x, y, radius) else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(color.to_skia());
        paint.anti_alias = true;

        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

/// A circle as received by a [`RecordingSurface`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Rgba,
}

#[derive(Debug, Default)]
struct DrawLogInner {
    clears: usize,
    draw_calls: usize,
    resizes: Vec<Viewport>,
    since_clear: Vec<Circle>,
}

/// Shared record of everything a [`RecordingSurface`] was asked to do.
/// Clones observe the same log, so it stays readable after the surface has
/// been handed over to a renderer.
#[derive(Debug, Clone, Default)]
pub struct DrawLog {
    inner: Rc<RefCell<DrawLogInner>>,
}

impl DrawLog {
    pub fn clears(&self) -> usize {
        self.inner.borrow().clears
    }

    /// Total number of `fill_circle` calls.
    pub fn draw_calls(&self) -> usize {
        self.inner.borrow().draw_calls
    }

    pub fn resizes(&self) -> Vec<Viewport> {
        self.inner.borrow().resizes.clone()
    }

    /// Circles drawn since the most recent clear.
    pub fn current_frame(&self) -> Vec<Circle> {
        self.inner.borrow().since_clear.clone()
    }
}

/// Surface that draws nothing and logs every call.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: Viewport,
    log: DrawLog,
}

impl RecordingSurface {
    pub fn new(size: Viewport) -> Self {
        Self {
            size,
            log: DrawLog::default(),
        }
    }

    pub fn log(&self) -> DrawLog {
        self.log.clone()
    }
}

impl DrawSurface for RecordingSurface {
    fn size(&self) -> Viewport {
        self.size
    }

    fn resize(&mut self, viewport: Viewport) -> Result<()> {
        self.size = viewport;
        self.log.inner.borrow_mut().resizes.push(viewport);
        Ok(())
    }

    fn clear(&mut self) {
        let mut log = self.log.inner.borrow_mut();
        log.clears += 1;
        log.since_clear.clear();
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba) {
        let mut log = self.log.inner.borrow_mut();
        log.draw_calls += 1;
        log.since_clear.push(Circle {
            x,
            y,
            radius,
            color,
        });
    }
}
