//! Per-sequence sampling temperature schedules.
//!
//! A temperature is either a constant or a piecewise-linear curve over the
//! output sample range, written as a pair of lists: control-point positions as
//! fractions of the output length and the temperatures at those points.
//!
//! ```text
//! 0.95
//! ([0.0, 0.5, 1.0], [0.9, 0.5, 0.9])
//! ```
//!
//! Curves are resolved to one value per generated frame by [`interpolate`], and
//! [`frame_temperatures`] zips all sequences into one vector per frame.

use crate::error::{Error, Result};

/// Control points of a curve, positions in absolute sample indices.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPoints {
    xs: Vec<usize>,
    ys: Vec<f64>,
}

impl ControlPoints {
    pub fn xs(&self) -> &[usize] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }
}

/// Parsed temperature for one sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum TemperatureSpec {
    Constant(f64),
    Curve(ControlPoints),
}

impl TemperatureSpec {
    /// Parse one raw specification against an output of `total_samples` samples.
    ///
    /// Curve positions become `round(fraction * total_samples)` and the points are
    /// sorted by position.
    pub fn parse(raw: &str, total_samples: usize) -> Result<Self> {
        let trimmed = raw.trim();
        if let Ok(value) = trimmed.parse::<f64>() {
            return check_temperature(raw, value).map(TemperatureSpec::Constant);
        }

        let (fractions, ys) = parse_curve_literal(trimmed).ok_or_else(|| {
            Error::invalid_temperature(
                raw,
                "expected a number or a pair of lists such as ([0, 1], [0.9, 0.5])",
            )
        })?;

        if fractions.len() != ys.len() {
            return Err(Error::invalid_temperature(
                raw,
                format!(
                    "{} positions but {} temperatures",
                    fractions.len(),
                    ys.len()
                ),
            ));
        }
        if fractions.len() < 2 {
            return Err(Error::invalid_temperature(raw, "a curve needs at least two points"));
        }
        if let Some(f) = fractions.iter().find(|f| !(0.0..=1.0).contains(*f)) {
            return Err(Error::invalid_temperature(
                raw,
                format!("position {f} is outside [0, 1]"),
            ));
        }
        for &y in &ys {
            check_temperature(raw, y)?;
        }

        let mut points: Vec<(f64, f64)> = fractions.into_iter().zip(ys).collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        if points.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            return Err(Error::invalid_temperature(raw, "duplicate curve positions"));
        }

        let xs = points
            .iter()
            .map(|(f, _)| (f * total_samples as f64).round_ties_even() as usize)
            .collect();
        let ys = points.into_iter().map(|(_, y)| y).collect();
        Ok(TemperatureSpec::Curve(ControlPoints { xs, ys }))
    }

    /// The value a sequence ends on: the constant itself, or the curve's last temperature.
    pub fn terminal(&self) -> f64 {
        match self {
            TemperatureSpec::Constant(value) => *value,
            TemperatureSpec::Curve(points) => points.ys.last().copied().unwrap_or_default(),
        }
    }
}

fn check_temperature(raw: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Error::invalid_temperature(
            raw,
            format!("temperature {value} must be a positive number"),
        ))
    }
}

/// Read `(xs, ys)` written as a tuple or list of two number lists.
///
/// Either bracket style is accepted at both levels, as are trailing commas.
/// Numbers use Rust float syntax, which covers `.5`, `1.` and exponents.
fn parse_curve_literal(text: &str) -> Option<(Vec<f64>, Vec<f64>)> {
    let mut literal = Literal { rest: text };
    let outer = literal.open()?;
    let xs = literal.number_list()?;
    if !literal.eat(',') {
        return None;
    }
    let ys = literal.number_list()?;
    literal.eat(',');
    if !literal.eat(outer) {
        return None;
    }
    literal.rest.trim_start().is_empty().then_some((xs, ys))
}

struct Literal<'a> {
    rest: &'a str,
}

impl Literal<'_> {
    fn eat(&mut self, token: char) -> bool {
        match self.rest.trim_start().strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    /// Consume an opening bracket and return the matching closer.
    fn open(&mut self) -> Option<char> {
        if self.eat('(') {
            Some(')')
        } else if self.eat('[') {
            Some(']')
        } else {
            None
        }
    }

    fn number(&mut self) -> Option<f64> {
        let text = self.rest.trim_start();
        let end = text
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-')))
            .unwrap_or(text.len());
        let value = text[..end].parse::<f64>().ok()?;
        self.rest = &text[end..];
        Some(value)
    }

    fn number_list(&mut self) -> Option<Vec<f64>> {
        let close = self.open()?;
        let mut values = Vec::new();
        loop {
            if self.eat(close) {
                return Some(values);
            }
            values.push(self.number()?);
            if !self.eat(',') {
                return self.eat(close).then_some(values);
            }
        }
    }
}

/// Parse `raw` and resize the result to exactly `num_seqs` entries.
///
/// With fewer specifications than sequences the last one is replicated; with
/// more, the extras are dropped. Neither case is an error.
pub fn parse_temperatures<S: AsRef<str>>(
    raw: &[S],
    num_seqs: usize,
    total_samples: usize,
) -> Result<Vec<TemperatureSpec>> {
    let mut specs = raw
        .iter()
        .map(|s| TemperatureSpec::parse(s.as_ref(), total_samples))
        .collect::<Result<Vec<_>>>()?;
    let Some(last) = specs.last().cloned() else {
        return Err(Error::invalid_temperature("", "no temperature given"));
    };
    if specs.len() != num_seqs {
        log::debug!(
            "broadcasting {} temperature specs to {num_seqs} sequences",
            specs.len()
        );
    }
    specs.resize(num_seqs, last);
    Ok(specs)
}

/// Piecewise-linear walk along a curve, one `(x, y)` point per step.
///
/// The step is `dx = xs[last] / num_frames`. Each segment `(xi, xj)` contributes
/// `round((xj - xi) / dx)` points (ties to even) starting at `(xi, yi)`. Because
/// of that rounding the total can fall short of `num_frames`.
#[derive(Debug, Clone)]
pub struct Interpolation {
    segments: Vec<Segment>,
    segment: usize,
    step: usize,
    dx: f64,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    x0: f64,
    y0: f64,
    dy: f64,
    count: usize,
}

/// Interpolate the curve through `(xs, ys)` at `num_frames` resolution.
pub fn interpolate(num_frames: usize, xs: &[usize], ys: &[f64]) -> Interpolation {
    let x_end = xs.last().copied().unwrap_or(0) as f64;
    let dx = if num_frames == 0 {
        0.0
    } else {
        x_end / num_frames as f64
    };
    let segments = if dx > 0.0 {
        xs.windows(2)
            .zip(ys.windows(2))
            .map(|(x, y)| {
                let steps = (x[1] as f64 - x[0] as f64) / dx;
                Segment {
                    x0: x[0] as f64,
                    y0: y[0],
                    dy: if steps > 0.0 { (y[1] - y[0]) / steps } else { 0.0 },
                    count: steps.round_ties_even().max(0.0) as usize,
                }
            })
            .collect()
    } else {
        Vec::new()
    };
    Interpolation {
        segments,
        segment: 0,
        step: 0,
        dx,
    }
}

impl Iterator for Interpolation {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<(f64, f64)> {
        while let Some(seg) = self.segments.get(self.segment) {
            if self.step < seg.count {
                let k = self.step as f64;
                self.step += 1;
                return Some((seg.x0 + k * self.dx, seg.y0 + k * seg.dy));
            }
            self.segment += 1;
            self.step = 0;
        }
        None
    }
}

#[derive(Debug, Clone)]
enum Source {
    Constant(f64),
    Curve(Interpolation),
}

/// One temperature per sequence for each generated frame.
///
/// Ends after `num_frames` vectors, or earlier as soon as any curve runs out.
#[derive(Debug, Clone)]
pub struct FrameTemperatures {
    sources: Vec<Source>,
    remaining: usize,
}

/// Build the per-frame temperature stream for `specs`.
pub fn frame_temperatures(specs: &[TemperatureSpec], num_frames: usize) -> FrameTemperatures {
    let sources = specs
        .iter()
        .map(|spec| match spec {
            TemperatureSpec::Constant(value) => Source::Constant(*value),
            TemperatureSpec::Curve(points) => {
                Source::Curve(interpolate(num_frames, &points.xs, &points.ys))
            }
        })
        .collect();
    FrameTemperatures {
        sources,
        remaining: num_frames,
    }
}

impl Iterator for FrameTemperatures {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Vec<f64>> {
        if self.remaining == 0 {
            return None;
        }
        let mut values = Vec::with_capacity(self.sources.len());
        for source in &mut self.sources {
            match source {
                Source::Constant(value) => values.push(*value),
                Source::Curve(curve) => match curve.next() {
                    Some((_, y)) => values.push(y),
                    None => {
                        self.remaining = 0;
                        return None;
                    }
                },
            }
        }
        self.remaining -= 1;
        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(spec: &TemperatureSpec) -> &ControlPoints {
        match spec {
            TemperatureSpec::Curve(points) => points,
            other => panic!("expected a curve, got {other:?}"),
        }
    }

    #[test]
    fn parses_constants_and_curves() {
        assert_eq!(
            TemperatureSpec::parse(" 0.95 ", 100).unwrap(),
            TemperatureSpec::Constant(0.95)
        );
        let spec = TemperatureSpec::parse("([0, 0.5, 1], [0.9, 0.5, 0.9])", 1000).unwrap();
        assert_eq!(curve(&spec).xs(), &[0, 500, 1000]);
        assert_eq!(curve(&spec).ys(), &[0.9, 0.5, 0.9]);
        assert_eq!(spec.terminal(), 0.9);

        let list_form = TemperatureSpec::parse("[[0.0, 1.0], [1.0, 0.2]]", 10).unwrap();
        assert_eq!(curve(&list_form).xs(), &[0, 10]);
    }

    #[test]
    fn accepts_python_float_and_tuple_forms() {
        let spec = TemperatureSpec::parse("([0, .5, 1], [.9, .5, .9])", 100).unwrap();
        assert_eq!(curve(&spec).xs(), &[0, 50, 100]);
        assert_eq!(curve(&spec).ys(), &[0.9, 0.5, 0.9]);

        let spec = TemperatureSpec::parse("([0., 1.], [1., 2.],)", 10).unwrap();
        assert_eq!(curve(&spec).xs(), &[0, 10]);
        assert_eq!(curve(&spec).ys(), &[1.0, 2.0]);

        let spec = TemperatureSpec::parse("([0, 1,], [1, 2],)", 10).unwrap();
        assert_eq!(curve(&spec).ys(), &[1.0, 2.0]);

        let spec = TemperatureSpec::parse("((0, 1e0), (5e-1, 1))", 4).unwrap();
        assert_eq!(curve(&spec).xs(), &[0, 4]);
    }

    #[test]
    fn curve_positions_round_half_to_even() {
        // 0.0625 * 40 = 2.5 and 0.3125 * 40 = 12.5.
        let spec =
            TemperatureSpec::parse("([0, 0.0625, 0.3125, 1], [1, 0.5, 0.7, 1])", 40).unwrap();
        assert_eq!(curve(&spec).xs(), &[0, 2, 12, 40]);
    }

    #[test]
    fn curve_points_are_sorted_and_rounded() {
        let spec = TemperatureSpec::parse("([1.0, 0.0, 0.333], [0.2, 1.0, 0.6])", 10).unwrap();
        assert_eq!(curve(&spec).xs(), &[0, 3, 10]);
        assert_eq!(curve(&spec).ys(), &[1.0, 0.6, 0.2]);
    }

    #[test]
    fn malformed_specs_fail_fast() {
        for raw in [
            "warm",
            "-0.5",
            "0",
            "([0, 1], [0.9])",
            "([0], [0.9])",
            "([0, 1.5], [0.9, 0.9])",
            "([0, 0.5, 0.5], [1, 1, 1])",
            "([0, 1], [0.9, -1])",
            "([0, 1], [1, 2]",
            "([0, 1] [1, 2])",
            "([0, 1], [1, 2]))",
            "([0, 1], [1, 2], [3, 4])",
            "([0, 1], [1, 2],,)",
            "([0, 1), [1, 2])",
            "([0, inf], [1, 2])",
        ] {
            let err = TemperatureSpec::parse(raw, 100).unwrap_err();
            assert!(
                matches!(err, Error::InvalidTemperature { .. }),
                "{raw} -> {err:?}"
            );
        }
    }

    #[test]
    fn broadcast_replicates_or_truncates() {
        let specs = parse_temperatures(&["0.7"], 3, 100).unwrap();
        assert_eq!(specs, vec![TemperatureSpec::Constant(0.7); 3]);

        let specs = parse_temperatures(&["0.7", "0.8", "0.9"], 2, 100).unwrap();
        assert_eq!(
            specs,
            vec![TemperatureSpec::Constant(0.7), TemperatureSpec::Constant(0.8)]
        );

        assert!(parse_temperatures::<&str>(&[], 1, 100).is_err());
    }

    #[test]
    fn interpolation_dips_and_recovers() {
        let points: Vec<_> = interpolate(100, &[0, 50, 100], &[1.0, 0.5, 1.0]).collect();
        assert_eq!(points.len(), 100);
        assert!((points[0].1 - 1.0).abs() < 1e-9);
        assert!((points[50].1 - 0.5).abs() < 1e-9);
        assert!((points[99].1 - 1.0).abs() < 0.02);
        for pair in points[..50].windows(2) {
            assert!(pair[1].1 < pair[0].1);
        }
        for pair in points[50..].windows(2) {
            assert!(pair[1].1 > pair[0].1);
        }
        assert!((points[10].0 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn interpolation_can_fall_short() {
        // dx = 10 / 4 = 2.5; segments of 5 samples each round 2.0 to 2 points.
        let points: Vec<_> = interpolate(4, &[0, 5, 10], &[1.0, 0.5, 1.0]).collect();
        assert_eq!(points.len(), 4);
        // dx = 9 / 4 = 2.25; 3/2.25 = 1.33 -> 1 point per segment.
        let points: Vec<_> = interpolate(4, &[0, 3, 6, 9], &[1.0, 0.8, 0.6, 0.4]).collect();
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn degenerate_curves_are_empty() {
        assert_eq!(interpolate(0, &[0, 10], &[1.0, 0.5]).count(), 0);
        assert_eq!(interpolate(10, &[0, 0], &[1.0, 0.5]).count(), 0);
    }

    #[test]
    fn frame_stream_stops_at_first_exhausted_curve() {
        let specs = vec![
            TemperatureSpec::Constant(0.9),
            TemperatureSpec::Curve(ControlPoints {
                xs: vec![0, 3, 6, 9],
                ys: vec![1.0, 0.8, 0.6, 0.4],
            }),
        ];
        let frames: Vec<_> = frame_temperatures(&specs, 4).collect();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.len() == 2 && f[0] == 0.9));
    }

    #[test]
    fn constant_only_stream_runs_for_every_frame() {
        let specs = vec![TemperatureSpec::Constant(1.0); 2];
        let mut frames = frame_temperatures(&specs, 5);
        assert_eq!(frames.by_ref().count(), 5);
        assert!(frames.next().is_none());
    }
}
