//! Server-side PNG charts for the schedule.
//!
//! Two charts are drawn straight onto an [`RgbaImage`]:
//!
//! * **Cumulative weight**: a line with point markers, week on the x axis,
//!   running total of `weight_pct` on the y axis.
//! * **Assignments**: one bar per schedule row at its week. Rows sharing a
//!   week overlap, so duplicates are not merged visually either.
//!
//! Titles, axis labels and tick labels use a 3×5 bitmap font scaled up. It
//! has uppercase letters, digits and the few symbols the labels need; text
//! is drawn uppercase. An empty schedule gets a 1×1 transparent PNG so the
//! `<img>` tags on the page stay valid.
//!
//! Any schedule the extractor accepts must render: weeks up to `u32::MAX`
//! and running totals that overflow to infinity included. Data coordinates
//! are clamped to the canvas before anything is rasterised.

use crate::error::DashboardError;
use crate::pipeline::encode::png_bytes;
use crate::schedule::{assignments_by_week, cumulative_weights, ScheduleEntry};
use image::{DynamicImage, Rgba, RgbaImage};
use tracing::debug;

pub const WIDTH: u32 = 1120;
pub const HEIGHT: u32 = 576;

const MARGIN_LEFT: u32 = 110;
const MARGIN_RIGHT: u32 = 30;
const MARGIN_TOP: u32 = 50;
const MARGIN_BOTTOM: u32 = 75;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const AXIS: Rgba<u8> = Rgba([60, 60, 60, 255]);
const GRID: Rgba<u8> = Rgba([210, 210, 210, 255]);
const SERIES: Rgba<u8> = Rgba([31, 119, 180, 255]);
const LABEL: Rgba<u8> = Rgba([40, 40, 40, 255]);

const GLYPH_SCALE: u32 = 3;
const MARKER_RADIUS: i64 = 5;
const BAR_WIDTH_WEEKS: f64 = 0.6;
const MAX_X_TICKS: u64 = 20;

/// How far past the plot area (as a fraction of it) a point may be drawn.
const OVERSHOOT: f64 = 0.02;

/// Title and axis captions of one chart.
struct Labels {
    title: &'static str,
    x: &'static str,
    y: &'static str,
}

const WEIGHTS_LABELS: Labels = Labels {
    title: "Cumulative Grade Allocation by Week",
    x: "Week",
    y: "Cumulative % of Final Grade",
};

const ASSIGNMENTS_LABELS: Labels = Labels {
    title: "Assignments per Week",
    x: "Week",
    y: "# Assignments",
};

/// PNG line chart of cumulative grade weight by week.
///
/// Points whose running total is not finite are left out; the line is
/// broken around them.
pub fn weights_chart(entries: &[ScheduleEntry]) -> Result<Vec<u8>, DashboardError> {
    if entries.is_empty() {
        return placeholder_png();
    }
    let (weeks, cumulative) = cumulative_weights(entries);
    let peak = cumulative
        .iter()
        .copied()
        .filter(|c| c.is_finite())
        .fold(0.0, f64::max);
    let mut canvas = Canvas::new(&weeks, peak, &WEIGHTS_LABELS);

    let points: Vec<Option<(i64, i64)>> = weeks
        .iter()
        .zip(&cumulative)
        .map(|(&w, &c)| c.is_finite().then(|| (canvas.x_px(f64::from(w)), canvas.y_px(c))))
        .collect();
    for pair in points.windows(2) {
        if let (Some(from), Some(to)) = (pair[0], pair[1]) {
            canvas.thick_line(from, to, SERIES);
        }
    }
    for &(x, y) in points.iter().flatten() {
        canvas.disc(x, y, MARKER_RADIUS, SERIES);
    }

    debug!("Drew weights chart with {} points", points.len());
    canvas.into_png()
}

/// PNG bar chart of assignment counts by week.
pub fn assignments_chart(entries: &[ScheduleEntry]) -> Result<Vec<u8>, DashboardError> {
    if entries.is_empty() {
        return placeholder_png();
    }
    let (weeks, counts) = assignments_by_week(entries);
    let max_count = counts.iter().copied().max().unwrap_or(0);
    let mut canvas = Canvas::new(&weeks, f64::from(max_count), &ASSIGNMENTS_LABELS);

    let baseline = canvas.y_px(0.0);
    for (&week, &count) in weeks.iter().zip(&counts) {
        let center = f64::from(week);
        let left = canvas.x_px(center - BAR_WIDTH_WEEKS / 2.0);
        let right = canvas.x_px(center + BAR_WIDTH_WEEKS / 2.0);
        let top = canvas.y_px(f64::from(count));
        canvas.fill_rect(left, top, right, baseline, SERIES);
    }

    debug!("Drew assignments chart with {} bars", weeks.len());
    canvas.into_png()
}

/// A 1×1 fully transparent PNG.
pub fn placeholder_png() -> Result<Vec<u8>, DashboardError> {
    let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
    Ok(png_bytes(&DynamicImage::ImageRgba8(img))?)
}

// ── Canvas ───────────────────────────────────────────────────────────────

/// Plot area plus the data → pixel mapping.
struct Canvas {
    img: RgbaImage,
    x_min: f64,
    x_max: f64,
    y_max: f64,
}

impl Canvas {
    /// White canvas with title, axes, grid and labels for the given weeks
    /// and largest y value. The y axis always starts at 0.
    fn new(weeks: &[u32], y_peak: f64, labels: &Labels) -> Self {
        let first = weeks.iter().copied().min().unwrap_or(1);
        let last = weeks.iter().copied().max().unwrap_or(1);
        let (step, y_max) = nice_axis(y_peak);

        let mut canvas = Self {
            img: RgbaImage::from_pixel(WIDTH, HEIGHT, BACKGROUND),
            x_min: f64::from(first) - 0.5,
            x_max: f64::from(last) + 0.5,
            y_max,
        };
        canvas.draw_y_axis(step);
        canvas.draw_x_axis(first, last);
        canvas.draw_labels(labels);
        canvas
    }

    fn plot_left(&self) -> i64 {
        i64::from(MARGIN_LEFT)
    }

    fn plot_right(&self) -> i64 {
        i64::from(WIDTH - MARGIN_RIGHT)
    }

    fn plot_top(&self) -> i64 {
        i64::from(MARGIN_TOP)
    }

    fn plot_bottom(&self) -> i64 {
        i64::from(HEIGHT - MARGIN_BOTTOM)
    }

    fn x_px(&self, x: f64) -> i64 {
        let span = (self.plot_right() - self.plot_left()) as f64;
        let t = ((x - self.x_min) / (self.x_max - self.x_min)).clamp(-OVERSHOOT, 1.0 + OVERSHOOT);
        self.plot_left() + (t * span).round() as i64
    }

    fn y_px(&self, y: f64) -> i64 {
        let span = (self.plot_bottom() - self.plot_top()) as f64;
        let t = (y / self.y_max).clamp(-OVERSHOOT, 1.0 + OVERSHOOT);
        self.plot_bottom() - (t * span).round() as i64
    }

    fn draw_y_axis(&mut self, step: f64) {
        let ticks = (self.y_max / step).round() as u32;
        for i in 0..=ticks {
            let value = step * f64::from(i);
            let y = self.y_px(value);
            if i > 0 {
                self.dashed_hline(self.plot_left() + 1, self.plot_right(), y, GRID);
            }
            self.hline(self.plot_left() - 6, self.plot_left(), y, AXIS);
            let label = format_tick(value);
            let w = text_width(&label);
            let glyph_h = i64::from(5 * GLYPH_SCALE);
            self.text(self.plot_left() - 12 - w, y - glyph_h / 2, &label, LABEL);
        }
        self.vline(self.plot_left(), self.plot_top(), self.plot_bottom(), AXIS);
    }

    fn draw_x_axis(&mut self, first: u32, last: u32) {
        self.hline(self.plot_left(), self.plot_right(), self.plot_bottom(), AXIS);
        let (first, last) = (u64::from(first), u64::from(last));
        let step = (last - first) / MAX_X_TICKS + 1;
        let mut week = first;
        while week <= last {
            let x = self.x_px(week as f64);
            self.vline(x, self.plot_bottom(), self.plot_bottom() + 6, AXIS);
            let label = week.to_string();
            self.text(x - text_width(&label) / 2, self.plot_bottom() + 14, &label, LABEL);
            week += step;
        }
    }

    fn draw_labels(&mut self, labels: &Labels) {
        let glyph_h = i64::from(5 * GLYPH_SCALE);
        let width = i64::from(WIDTH);

        let title_x = (width - text_width(labels.title)) / 2;
        self.text(title_x, (self.plot_top() - glyph_h) / 2, labels.title, LABEL);

        let plot_mid_x = (self.plot_left() + self.plot_right()) / 2;
        self.text(
            plot_mid_x - text_width(labels.x) / 2,
            self.plot_bottom() + 14 + glyph_h + 12,
            labels.x,
            LABEL,
        );

        let plot_mid_y = (self.plot_top() + self.plot_bottom()) / 2;
        self.text_upward(12, plot_mid_y + text_width(labels.y) / 2, labels.y, LABEL);
    }

    fn into_png(self) -> Result<Vec<u8>, DashboardError> {
        Ok(png_bytes(&DynamicImage::ImageRgba8(self.img))?)
    }

    // ── Primitives ───────────────────────────────────────────────────────

    fn put(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x >= 0 && y >= 0 && x < i64::from(WIDTH) && y < i64::from(HEIGHT) {
            self.img.put_pixel(x as u32, y as u32, color);
        }
    }

    fn hline(&mut self, x0: i64, x1: i64, y: i64, color: Rgba<u8>) {
        for x in x0.min(x1)..=x0.max(x1) {
            self.put(x, y, color);
        }
    }

    fn vline(&mut self, x: i64, y0: i64, y1: i64, color: Rgba<u8>) {
        for y in y0.min(y1)..=y0.max(y1) {
            self.put(x, y, color);
        }
    }

    fn dashed_hline(&mut self, x0: i64, x1: i64, y: i64, color: Rgba<u8>) {
        for x in x0..=x1 {
            if (x - x0) % 10 < 6 {
                self.put(x, y, color);
            }
        }
    }

    fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
        for y in y0.min(y1)..=y0.max(y1) {
            self.hline(x0, x1, y, color);
        }
    }

    fn disc(&mut self, cx: i64, cy: i64, r: i64, color: Rgba<u8>) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Bresenham line, stamped with a radius-1 disc for a 3 px stroke.
    /// Endpoints come from `x_px`/`y_px`, so they lie near the canvas.
    fn thick_line(&mut self, from: (i64, i64), to: (i64, i64), color: Rgba<u8>) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.disc(x, y, 1, color);
            if (x, y) == to {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Left-to-right text with its top-left corner at `(x, y)`.
    fn text(&mut self, x: i64, y: i64, s: &str, color: Rgba<u8>) {
        let scale = i64::from(GLYPH_SCALE);
        for (i, ch) in s.chars().enumerate() {
            let cursor = x + i as i64 * 4 * scale;
            for (row, col) in glyph_cells(ch) {
                let px = cursor + col * scale;
                let py = y + row * scale;
                self.fill_rect(px, py, px + scale - 1, py + scale - 1, color);
            }
        }
    }

    /// Text rotated a quarter turn counter-clockwise, read bottom to top,
    /// with its bottom-left corner at `(x, y)`.
    fn text_upward(&mut self, x: i64, y: i64, s: &str, color: Rgba<u8>) {
        let scale = i64::from(GLYPH_SCALE);
        for (i, ch) in s.chars().enumerate() {
            let cursor = y - i as i64 * 4 * scale;
            for (row, col) in glyph_cells(ch) {
                let px = x + row * scale;
                let py = cursor - col * scale;
                self.fill_rect(px, py - scale + 1, px + scale - 1, py, color);
            }
        }
    }
}

// ── Axis maths ───────────────────────────────────────────────────────────

/// Tick step and axis top for a y range starting at 0.
///
/// The step is 1, 2 or 5 times a power of ten, aiming for about five ticks.
fn nice_axis(peak: f64) -> (f64, f64) {
    if !peak.is_finite() || peak <= 0.0 {
        return (1.0, 1.0);
    }
    let raw = peak / 5.0;
    let magnitude = 10f64.powi(raw.log10().floor() as i32);
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);
    let top = (peak / step).ceil() * step;
    if !top.is_finite() {
        return (peak, peak);
    }
    (step, top)
}

fn format_tick(value: f64) -> String {
    if value.abs() >= 1e9 {
        format!("{value:.1e}")
    } else if (value - value.round()).abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        let s = format!("{value:.2}");
        s.trim_end_matches('0').to_string()
    }
}

fn text_width(s: &str) -> i64 {
    let n = s.chars().count() as i64;
    if n == 0 {
        0
    } else {
        (4 * n - 1) * i64::from(GLYPH_SCALE)
    }
}

/// Lit `(row, col)` cells of a glyph.
fn glyph_cells(ch: char) -> impl Iterator<Item = (i64, i64)> {
    let rows = glyph(ch).unwrap_or([0; 5]);
    (0..5i64).flat_map(move |row| {
        (0..3i64)
            .filter(move |col| rows[row as usize] & (0b100 >> col) != 0)
            .map(move |col| (row, col))
    })
}

/// 3×5 glyph rows, most significant bit on the left. Letters are matched
/// case-insensitively.
fn glyph(ch: char) -> Option<[u8; 5]> {
    let rows = match ch.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::parse_extraction;

    fn entry(week: u32, assignments: u32, weight_pct: f64) -> ScheduleEntry {
        ScheduleEntry {
            week,
            assignments,
            weight_pct,
            notes: String::new(),
        }
    }

    fn decode(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().to_rgba8()
    }

    fn has_label_pixel(img: &RgbaImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> bool {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .any(|(x, y)| *img.get_pixel(x, y) == LABEL)
    }

    #[test]
    fn empty_schedule_gives_transparent_pixel() {
        for png in [weights_chart(&[]).unwrap(), assignments_chart(&[]).unwrap()] {
            let img = decode(&png);
            assert_eq!(img.dimensions(), (1, 1));
            assert_eq!(img.get_pixel(0, 0)[3], 0);
        }
    }

    #[test]
    fn weights_chart_draws_series() {
        let entries = vec![entry(1, 1, 10.0), entry(2, 1, 40.0), entry(3, 1, 50.0)];
        let img = decode(&weights_chart(&entries).unwrap());
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
        assert!(img.pixels().any(|p| *p == SERIES));
        assert_eq!(*img.get_pixel(WIDTH - 1, 0), BACKGROUND);
    }

    #[test]
    fn charts_carry_title_and_axis_labels() {
        let entries = vec![entry(1, 1, 10.0), entry(2, 3, 40.0)];
        for png in [weights_chart(&entries).unwrap(), assignments_chart(&entries).unwrap()] {
            let img = decode(&png);
            // title band above the plot
            assert!(has_label_pixel(&img, 0..WIDTH, 0..MARGIN_TOP));
            // x caption below the tick labels
            assert!(has_label_pixel(&img, 0..WIDTH, HEIGHT - 30..HEIGHT));
            // rotated y caption left of the tick labels
            assert!(has_label_pixel(&img, 0..40, MARGIN_TOP..HEIGHT - MARGIN_BOTTOM));
        }
    }

    #[test]
    fn assignments_chart_bar_reaches_top_of_axis() {
        let entries = vec![entry(1, 2, 0.0), entry(2, 4, 0.0)];
        let img = decode(&assignments_chart(&entries).unwrap());
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));

        // the tallest bar's top edge sits on the axis top (4 is a tick value)
        let canvas = Canvas::new(&[1, 2], 4.0, &ASSIGNMENTS_LABELS);
        let x = canvas.x_px(2.0) as u32;
        assert_eq!(*img.get_pixel(x, MARGIN_TOP + 1), SERIES);
    }

    #[test]
    fn single_week_schedule_renders() {
        let img = decode(&assignments_chart(&[entry(5, 0, 0.0)]).unwrap());
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
    }

    #[test]
    fn largest_week_number_renders() {
        let ex = parse_extraction(
            r#"{"schedule": [
                {"week": 1, "assignments": 1, "weight_pct": 10},
                {"week": "4294967295", "assignments": 2, "weight_pct": 20}
            ]}"#,
        )
        .unwrap();
        assert_eq!(ex.schedule.len(), 2);

        for png in [
            weights_chart(&ex.schedule).unwrap(),
            assignments_chart(&ex.schedule).unwrap(),
        ] {
            assert_eq!(decode(&png).dimensions(), (WIDTH, HEIGHT));
        }
        let single = decode(&weights_chart(&[entry(u32::MAX, 1, 5.0)]).unwrap());
        assert_eq!(single.dimensions(), (WIDTH, HEIGHT));
    }

    #[test]
    fn overflowing_running_total_renders() {
        let entries = vec![entry(1, 0, 5.0), entry(2, 0, 1e308), entry(3, 0, 1e308)];
        let img = decode(&weights_chart(&entries).unwrap());
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
        assert!(img.pixels().any(|p| *p == SERIES));

        let huge = vec![entry(1, 0, f64::MAX), entry(2, 0, -f64::MAX)];
        assert_eq!(decode(&weights_chart(&huge).unwrap()).dimensions(), (WIDTH, HEIGHT));
    }

    #[test]
    fn pixel_mapping_stays_near_canvas() {
        let canvas = Canvas::new(&[1, 3], 10.0, &WEIGHTS_LABELS);
        for y in [f64::MAX, -f64::MAX, f64::INFINITY, 1e300] {
            let py = canvas.y_px(y);
            assert!((0..i64::from(HEIGHT)).contains(&py), "{y} → {py}");
        }
        for x in [f64::MAX, -f64::MAX, 4294967295.0] {
            let px = canvas.x_px(x);
            assert!((0..i64::from(WIDTH)).contains(&px), "{x} → {px}");
        }
    }

    #[test]
    fn nice_axis_steps() {
        assert_eq!(nice_axis(100.0), (20.0, 100.0));
        assert_eq!(nice_axis(4.0), (1.0, 4.0));
        assert_eq!(nice_axis(37.0), (10.0, 40.0));
        assert_eq!(nice_axis(0.0), (1.0, 1.0));
        let (step, top) = nice_axis(f64::MAX);
        assert!(step.is_finite() && top.is_finite());
    }

    #[test]
    fn ticks_format_without_trailing_zeros() {
        assert_eq!(format_tick(20.0), "20");
        assert_eq!(format_tick(0.5), "0.5");
        assert_eq!(format_tick(0.25), "0.25");
        assert_eq!(format_tick(2e10), "2.0e10");
    }

    #[test]
    fn letters_have_glyphs_in_either_case() {
        for ch in "Cumulative % of Final Grade # Assignments Week".chars() {
            assert!(ch == ' ' || glyph(ch).is_some(), "no glyph for {ch:?}");
        }
        assert_eq!(glyph('w'), glyph('W'));
    }
}
