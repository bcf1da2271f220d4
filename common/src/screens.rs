//! The screens the monitor cycles through: the current readings and one
//! history curve per channel.

use embedded_graphics::mono_font::{ascii::FONT_6X10, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Polyline, PrimitiveStyle};
use embedded_graphics::text::{Baseline, Text};
use envmon_model::{Channel, History, Measurement};

use crate::canvas::{Canvas, WIDTH};

/// Number of most recent samples a curve spans, one per column.
pub const CURVE_WINDOW: usize = WIDTH;

/// Height in pixels the curve is scaled into. The rows below hold the label.
pub const CURVE_HEIGHT: f64 = 56.0;

fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyle::new(&FONT_6X10, BinaryColor::On)
}

/// Toggles one pixel of the top row, moving one column per cycle so a running
/// monitor is visible at a glance.
pub fn heartbeat(canvas: &mut Canvas, tick: usize) {
    canvas.toggle(tick % WIDTH, 0);
}

/// The four text lines of the readings screen.
pub fn readings_lines(measurement: &Measurement) -> [String; 4] {
    Channel::ALL.map(|channel| format!("{} = {:.6}", channel.label(), channel.value(measurement)))
}

/// Draws the readings screen below the heartbeat row.
pub fn draw_readings(canvas: &mut Canvas, measurement: &Measurement) {
    canvas.clear_from_row(1);
    canvas.draw_with(|c| readings(c, measurement));
}

/// Writes the readings text onto any binary draw target.
pub fn readings<D>(target: &mut D, measurement: &Measurement) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    for (line, y) in readings_lines(measurement).iter().zip([10, 20, 30, 40]) {
        Text::with_baseline(line, Point::new(1, y), text_style(), Baseline::Top).draw(target)?;
    }
    Ok(())
}

/// Maps `values` to chart points: sample index on x, and the value range onto
/// `0..=max_y` with the minimum at the bottom (`max_y`) and the maximum at the top.
///
/// A series without spread is drawn as a flat line at half height.
pub fn curve_points(values: &[f64], max_y: f64) -> Vec<Point> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;

    values
        .iter()
        .enumerate()
        .map(|(x, &v)| {
            let y = if span.is_finite() && span > 0.0 {
                (1.0 - (v - min) / span) * max_y
            } else {
                max_y / 2.0
            };
            Point::new(x as i32, y.round() as i32)
        })
        .collect()
}

/// Draws the history curve of `channel` over the last [`CURVE_WINDOW`] samples.
///
/// Leaves the canvas untouched and returns `false` while the history has two
/// records or fewer.
pub fn draw_channel_curve(canvas: &mut Canvas, history: &History, channel: Channel) -> bool {
    if history.len() <= 2 {
        return false;
    }

    let points = curve_points(&history.channel_tail(channel, CURVE_WINDOW), CURVE_HEIGHT);
    canvas.erase();
    canvas.draw_with(|c| curve(c, channel.name(), &points));
    true
}

/// Writes a labelled polyline onto any binary draw target.
pub fn curve<D>(target: &mut D, label: &str, points: &[Point]) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Text::with_baseline(label, Point::new(9, 53), text_style(), Baseline::Top).draw(target)?;
    Polyline::new(points)
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(target)
}
