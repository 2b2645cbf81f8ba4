//! Headless ticket renderer built on the `image` crate.
//!
//! Presenting a view paints it on a blocking thread and fires the painted
//! signal when the canvas is ready. Capturing encodes that canvas as PNG and
//! unmounts the view.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use super::error::CaptureError;
use super::traits::{ImageCapture, TicketPresenter};
use super::types::{PresentedView, ViewHandle};
use crate::media::ImageRef;
use crate::ticket::{TemplatePalette, TicketViewDescriptor};

/// Rendered ticket width in pixels.
pub const TICKET_WIDTH: u32 = 600;

/// Rendered ticket height in pixels.
pub const TICKET_HEIGHT: u32 = 900;

const BORDER: u32 = 16;
const MARGIN: u32 = 48;
const PHOTO_FRAME: u32 = 4;

const DIGIT_WIDTH: u32 = 48;
const DIGIT_HEIGHT: u32 = 88;
const DIGIT_STROKE: u32 = 10;
const DIGIT_GAP: u32 = 20;

/// Segment masks for 0-9, bit order `a b c d e f g` from the low bit.
const SEGMENTS: [u8; 10] = [0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, 0x7F, 0x6F];

#[derive(Debug)]
struct MountedView {
    descriptor: TicketViewDescriptor,
    canvas: Option<RgbaImage>,
    paint_error: Option<String>,
}

/// Presenter and capture for hosts without a screen.
#[derive(Clone)]
pub struct RasterTicketRenderer {
    output_dir: PathBuf,
    views: Arc<Mutex<HashMap<ViewHandle, MountedView>>>,
}

impl RasterTicketRenderer {
    /// Captured tickets are written to `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            views: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of views currently mounted.
    pub async fn mounted(&self) -> usize {
        self.views.lock().await.len()
    }

    async fn paint_async(descriptor: TicketViewDescriptor) -> Result<RgbaImage, CaptureError> {
        tokio::task::spawn_blocking(move || paint(&descriptor))
            .await
            .map_err(|e| CaptureError::Render(e.to_string()))?
    }
}

#[async_trait]
impl TicketPresenter for RasterTicketRenderer {
    async fn present(
        &self,
        descriptor: &TicketViewDescriptor,
    ) -> Result<PresentedView, CaptureError> {
        let handle = ViewHandle::new();
        self.views.lock().await.insert(
            handle.clone(),
            MountedView {
                descriptor: descriptor.clone(),
                canvas: None,
                paint_error: None,
            },
        );

        debug!(view = %handle, template = %descriptor.template, "Presented ticket view");

        let (tx, rx) = oneshot::channel();
        let views = Arc::clone(&self.views);
        let painting = handle.clone();
        let descriptor = descriptor.clone();
        tokio::spawn(async move {
            let painted = Self::paint_async(descriptor).await;
            let mut views = views.lock().await;
            let Some(view) = views.get_mut(&painting) else {
                debug!(view = %painting, "View discarded before paint finished");
                return;
            };
            match painted {
                Ok(canvas) => {
                    view.canvas = Some(canvas);
                    let _ = tx.send(());
                }
                Err(e) => {
                    warn!(view = %painting, error = %e, "Failed to paint ticket view");
                    view.paint_error = Some(e.to_string());
                }
            }
        });

        Ok(PresentedView {
            handle,
            painted: Some(rx),
        })
    }

    async fn discard(&self, handle: &ViewHandle) {
        self.views.lock().await.remove(handle);
    }
}

#[async_trait]
impl ImageCapture for RasterTicketRenderer {
    async fn capture(&self, handle: &ViewHandle) -> Result<ImageRef, CaptureError> {
        let view = self
            .views
            .lock()
            .await
            .remove(handle)
            .ok_or_else(|| CaptureError::NotMounted(handle.to_string()))?;

        if let Some(reason) = view.paint_error {
            return Err(CaptureError::Render(reason));
        }
        let canvas = match view.canvas {
            Some(canvas) => canvas,
            None => Self::paint_async(view.descriptor).await?,
        };

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let dest = self.output_dir.join(format!("{}.png", handle));
        let path = dest.clone();
        tokio::task::spawn_blocking(move || canvas.save_with_format(&path, ImageFormat::Png))
            .await
            .map_err(|e| CaptureError::Render(e.to_string()))??;

        info!(view = %handle, path = %dest.display(), "Captured ticket");
        Ok(ImageRef::Local(dest))
    }
}

fn paint(descriptor: &TicketViewDescriptor) -> Result<RgbaImage, CaptureError> {
    let palette = descriptor.template.palette();
    let mut canvas = RgbaImage::from_pixel(TICKET_WIDTH, TICKET_HEIGHT, rgba(palette.background));

    draw_frame(&mut canvas, 0, 0, TICKET_WIDTH, TICKET_HEIGHT, BORDER, rgba(palette.border));

    let window = TICKET_WIDTH - 2 * MARGIN;
    let photo = load_photo(&descriptor.photo)?;
    let photo = photo.resize_to_fill(window, window, FilterType::Triangle).to_rgba8();
    imageops::overlay(&mut canvas, &photo, i64::from(MARGIN), i64::from(MARGIN));
    draw_frame(
        &mut canvas,
        MARGIN - PHOTO_FRAME,
        MARGIN - PHOTO_FRAME,
        window + 2 * PHOTO_FRAME,
        window + 2 * PHOTO_FRAME,
        PHOTO_FRAME,
        rgba(palette.ink),
    );

    let digits: Vec<u8> = descriptor.lucky_number.digits().collect();
    let row_width = digits.len() as u32 * DIGIT_WIDTH + (digits.len() as u32 - 1) * DIGIT_GAP;
    let x0 = (TICKET_WIDTH - row_width) / 2;
    let y0 = MARGIN + window + MARGIN;
    for (i, digit) in digits.iter().enumerate() {
        let x = x0 + i as u32 * (DIGIT_WIDTH + DIGIT_GAP);
        draw_digit(&mut canvas, *digit, x, y0, palette);
    }

    // Rule between the number and the footer.
    let rule_y = y0 + DIGIT_HEIGHT + MARGIN / 2;
    fill_rect(&mut canvas, MARGIN, rule_y, window, 4, rgba(palette.border));

    Ok(canvas)
}

fn load_photo(photo: &ImageRef) -> Result<image::DynamicImage, CaptureError> {
    let path: &Path = photo
        .as_local()
        .ok_or_else(|| CaptureError::Render(format!("photo {} is not a local file", photo)))?;
    Ok(image::open(path)?)
}

fn draw_digit(canvas: &mut RgbaImage, digit: u8, x: u32, y: u32, palette: TemplatePalette) {
    let mask = SEGMENTS[usize::from(digit % 10)];
    let (w, h, t) = (DIGIT_WIDTH, DIGIT_HEIGHT, DIGIT_STROKE);
    let half = h / 2;
    let segments = [
        (x, y, w, t),                   // a
        (x + w - t, y, t, half),        // b
        (x + w - t, y + half, t, half), // c
        (x, y + h - t, w, t),           // d
        (x, y + half, t, half),         // e
        (x, y, t, half),                // f
        (x, y + half - t / 2, w, t),    // g
    ];
    for (bit, (sx, sy, sw, sh)) in segments.into_iter().enumerate() {
        if mask & (1 << bit) != 0 {
            fill_rect(canvas, sx, sy, sw, sh, rgba(palette.ink));
        }
    }
}

fn draw_frame(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, t: u32, color: Rgba<u8>) {
    fill_rect(canvas, x, y, w, t, color);
    fill_rect(canvas, x, y + h.saturating_sub(t), w, t, color);
    fill_rect(canvas, x, y, t, h, color);
    fill_rect(canvas, x + w.saturating_sub(t), y, t, h, color);
}

/// Fill a rectangle, clipped to the canvas.
fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    let x_end = x.saturating_add(w).min(canvas.width());
    let y_end = y.saturating_add(h).min(canvas.height());
    for py in y..y_end {
        for px in x..x_end {
            canvas.put_pixel(px, py, color);
        }
    }
}

fn rgba([r, g, b]: [u8; 3]) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}
