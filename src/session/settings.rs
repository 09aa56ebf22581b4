//! Typography and layout settings, and how they reach the rendition.

use std::fmt;

use log::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::engine::{RenderingEngine, RenditionHandle, Spread};

use super::ReadingSession;

/// Font size in CSS pixels: 10..=36 in steps of 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontSize(u8);

impl FontSize {
    pub const MIN: FontSize = FontSize(10);
    pub const MAX: FontSize = FontSize(36);
    pub const DEFAULT: FontSize = FontSize(18);
    const STEP: u32 = 2;

    /// Clamp into range and snap down onto the step grid.
    pub fn new(px: u32) -> Self {
        let min = Self::MIN.0 as u32;
        let px = px.clamp(min, Self::MAX.0 as u32);
        FontSize((px - (px - min) % Self::STEP) as u8)
    }

    pub fn px(self) -> u32 {
        self.0 as u32
    }

    pub fn larger(self) -> Self {
        Self::new(self.px() + Self::STEP)
    }

    pub fn smaller(self) -> Self {
        Self::new(self.px().saturating_sub(Self::STEP))
    }

    pub fn css_value(self) -> String {
        format!("{}px", self.0)
    }
}

impl Default for FontSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Line height multiplier 1.2..=2.4 in steps of 0.1, stored in tenths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LineHeight(u8);

impl LineHeight {
    pub const MIN: LineHeight = LineHeight(12);
    pub const MAX: LineHeight = LineHeight(24);
    pub const DEFAULT: LineHeight = LineHeight(16);

    pub fn from_tenths(tenths: u32) -> Self {
        LineHeight(tenths.clamp(Self::MIN.0 as u32, Self::MAX.0 as u32) as u8)
    }

    /// Round to the nearest tenth, then clamp. NaN and negatives land on MIN.
    pub fn from_f64(value: f64) -> Self {
        Self::from_tenths((value * 10.0).round() as u32)
    }

    pub fn tenths(self) -> u32 {
        self.0 as u32
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 10.0
    }

    pub fn taller(self) -> Self {
        Self::from_tenths(self.tenths() + 1)
    }

    pub fn shorter(self) -> Self {
        Self::from_tenths(self.tenths().saturating_sub(1))
    }
}

impl Default for LineHeight {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for LineHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

/// Presentation settings owned by the session. Reset on every new load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderSettings {
    pub font_size: FontSize,
    pub line_height: LineHeight,
    pub spread: Spread,
}

impl ReaderSettings {
    pub(super) fn initial(config: &ReaderConfig, is_mobile: bool) -> Self {
        Self {
            font_size: config.font_size,
            line_height: config.line_height,
            spread: if is_mobile { Spread::None } else { config.spread },
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub(super) struct Viewport {
    pub width_px: Option<u32>,
    pub is_mobile: bool,
}

impl<E: RenderingEngine> ReadingSession<E> {
    pub fn settings(&self) -> ReaderSettings {
        self.settings
    }

    pub fn set_font_size(&mut self, size: FontSize) {
        if size == self.settings.font_size {
            return;
        }
        debug!("settings: font size {} -> {}", self.settings.font_size.px(), size.px());
        self.settings.font_size = size;
        if let Some(rendition) = self.rendition() {
            self.override_style(rendition, "font-size", &size.css_value());
        }
    }

    pub fn set_line_height(&mut self, height: LineHeight) {
        if height == self.settings.line_height {
            return;
        }
        debug!("settings: line height {} -> {}", self.settings.line_height, height);
        self.settings.line_height = height;
        if let Some(rendition) = self.rendition() {
            self.override_style(rendition, "line-height", &height.to_string());
        }
    }

    /// Switch spread mode. Returns false when the spread control is disabled
    /// (mobile viewport) and `auto` was requested.
    pub fn set_spread(&mut self, spread: Spread) -> bool {
        if self.viewport.is_mobile && spread == Spread::Auto {
            debug!("settings: spread control disabled on mobile viewport");
            return false;
        }
        if spread != self.settings.spread {
            self.apply_spread(spread);
        }
        true
    }

    pub fn is_mobile(&self) -> bool {
        self.viewport.is_mobile
    }

    pub fn spread_control_enabled(&self) -> bool {
        !self.viewport.is_mobile
    }

    /// Report the viewport width. Dropping below the mobile breakpoint forces
    /// single-page spread; growing back does not restore `auto`.
    pub fn set_viewport_width(&mut self, width_px: u32) {
        let is_mobile = width_px < self.config.mobile_breakpoint_px;
        if is_mobile != self.viewport.is_mobile {
            info!("settings: viewport {width_px}px, mobile={is_mobile}");
        }
        self.viewport = Viewport {
            width_px: Some(width_px),
            is_mobile,
        };
        if is_mobile && self.settings.spread == Spread::Auto {
            self.apply_spread(Spread::None);
        }
    }

    pub fn viewport_width(&self) -> Option<u32> {
        self.viewport.width_px
    }

    /// Spread is layout-affecting: after switching, re-display the retained
    /// position so the reader does not jump back to the start of the book.
    fn apply_spread(&mut self, spread: Spread) {
        debug!("settings: spread {} -> {}", self.settings.spread, spread);
        self.settings.spread = spread;
        let Some(rendition) = self.rendition() else {
            return;
        };
        if let Err(e) = self.engine.set_spread(rendition, spread) {
            warn!("settings: set_spread failed: {e}");
            return;
        }
        let retained = self.last_cfi().cloned();
        if let Some(cfi) = retained
            && let Err(e) = self.engine.display(rendition, Some(cfi.as_str()))
        {
            warn!("settings: re-display at {cfi} failed: {e}");
        }
    }

    /// Push the current font size and line height to a freshly attached rendition.
    pub(super) fn apply_typography(&mut self, rendition: RenditionHandle) {
        let font = self.settings.font_size.css_value();
        let line = self.settings.line_height.to_string();
        self.override_style(rendition, "font-size", &font);
        self.override_style(rendition, "line-height", &line);
    }

    fn override_style(&mut self, rendition: RenditionHandle, property: &str, value: &str) {
        if let Err(e) = self.engine.override_style(rendition, property, value) {
            warn!("settings: override {property}={value} failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_size_clamps_and_snaps() {
        assert_eq!(FontSize::new(4), FontSize::MIN);
        assert_eq!(FontSize::new(99), FontSize::MAX);
        assert_eq!(FontSize::new(19).px(), 18);
        assert_eq!(FontSize::MAX.larger(), FontSize::MAX);
        assert_eq!(FontSize::MIN.smaller(), FontSize::MIN);
    }

    #[test]
    fn font_size_steps_from_default_to_max() {
        let mut size = FontSize::default();
        for _ in 0..9 {
            size = size.larger();
        }
        assert_eq!(size, FontSize::MAX);
        assert_eq!(size.css_value(), "36px");
    }

    #[test]
    fn line_height_steps_without_drift() {
        let mut lh = LineHeight::default();
        for _ in 0..4 {
            lh = lh.shorter();
        }
        assert_eq!(lh, LineHeight::MIN);
        assert_eq!(lh.to_string(), "1.2");
        assert_eq!(lh.shorter(), LineHeight::MIN);

        let mut lh = LineHeight::default();
        for _ in 0..20 {
            lh = lh.taller();
        }
        assert_eq!(lh.to_string(), "2.4");
    }

    #[test]
    fn line_height_from_float() {
        assert_eq!(LineHeight::from_f64(1.6), LineHeight::DEFAULT);
        assert_eq!(LineHeight::from_f64(1.849).to_string(), "1.8");
        assert_eq!(LineHeight::from_f64(9.0), LineHeight::MAX);
        assert_eq!(LineHeight::from_f64(-1.0), LineHeight::MIN);
        assert_eq!(LineHeight::from_f64(f64::NAN), LineHeight::MIN);
    }

    #[test]
    fn mobile_forces_single_spread() {
        let config = ReaderConfig::default();
        assert_eq!(ReaderSettings::initial(&config, false).spread, Spread::Auto);
        assert_eq!(ReaderSettings::initial(&config, true).spread, Spread::None);
    }
}
