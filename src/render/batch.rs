use std::ops::Range;

use crate::foundation::core::Point;
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::protocol::args::{Argument, NumberAccessor, TypedBuffer};
use crate::protocol::style::ColorAccessor;
use crate::render::primitives::PrimitiveRenderer;
use crate::render::surface::{DrawingSurface, Paint, StyleSetting};

/// Fill or stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Fill the shape.
    Fill,
    /// Outline the shape.
    Stroke,
}

/// Per-batch iteration bounds.
///
/// `item_count` is the maximum declared length across all participating
/// fields. Numeric fields must either broadcast (length 1) or cover every
/// item; colour and alpha are exempt because they wrap to slot 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchFrame {
    /// Number of items the batch draws.
    pub item_count: usize,
}

impl BatchFrame {
    /// Resolve the item count and reject numeric fields that would be read past their end.
    pub fn new(fields: &[NumberAccessor<'_>], style: Option<&ColorAccessor<'_>>) -> BridgeResult<Self> {
        let style_len = style.map_or(0, |c| c.color_len().max(c.alpha_len()));
        let item_count = fields
            .iter()
            .map(NumberAccessor::len)
            .fold(style_len, usize::max);
        for (i, f) in fields.iter().enumerate() {
            let len = f.len();
            if len != 1 && len < item_count {
                return Err(BridgeError::protocol(format!(
                    "field {i} has {len} values but the batch has {item_count} items"
                )));
            }
        }
        Ok(Self { item_count })
    }
}

/// Coordinate ranges consumed by a variable-length polygon batch.
///
/// Item `i` takes `counts[i] * 2` values starting where item `i - 1` ended;
/// the scan is sequential by construction.
#[derive(Clone, Debug)]
pub struct PolygonScan<'a> {
    counts: NumberAccessor<'a>,
    item: usize,
    items: usize,
    offset: usize,
}

impl<'a> PolygonScan<'a> {
    /// Scan `items` polygons with the given per-item vertex counts.
    pub fn new(counts: NumberAccessor<'a>, items: usize) -> Self {
        Self {
            counts,
            item: 0,
            items,
            offset: 0,
        }
    }

    /// Total coordinate values the whole scan consumes, validating every count.
    pub fn total(counts: NumberAccessor<'a>, items: usize) -> BridgeResult<usize> {
        (0..items).try_fold(0usize, |acc, i| {
            acc.checked_add(coord_count(counts.get(i))?)
                .ok_or_else(|| BridgeError::protocol("polygon vertex counts overflow"))
        })
    }
}

impl Iterator for PolygonScan<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.item >= self.items {
            return None;
        }
        let n = coord_count(self.counts.get(self.item)).unwrap_or(0);
        let start = self.offset;
        self.offset = self.offset.saturating_add(n);
        self.item += 1;
        Some(start..self.offset)
    }
}

/// Coordinate values (two per vertex) consumed by one polygon.
fn coord_count(v: f64) -> BridgeResult<usize> {
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 || v >= u32::MAX as f64 {
        return Err(BridgeError::protocol(format!("invalid vertex count {v}")));
    }
    (v as usize)
        .checked_mul(2)
        .ok_or_else(|| BridgeError::protocol(format!("invalid vertex count {v}")))
}

/// Drives a [`PrimitiveRenderer`] across every item of a batched command.
pub struct BatchExecutor<'r> {
    renderer: &'r dyn PrimitiveRenderer,
    scratch: Vec<Point>,
}

impl<'r> BatchExecutor<'r> {
    /// Executor over the given primitive strategy.
    pub fn new(renderer: &'r dyn PrimitiveRenderer) -> Self {
        Self {
            renderer,
            scratch: Vec::new(),
        }
    }

    /// `[x, y, w, h]`; a missing `h` reuses `w`.
    #[allow(clippy::too_many_arguments)]
    pub fn rects(
        &mut self,
        s: &mut dyn DrawingSurface,
        mode: Mode,
        x: &Argument,
        y: &Argument,
        w: &Argument,
        h: Option<&Argument>,
        style: Option<(&Argument, &Argument)>,
    ) -> BridgeResult<usize> {
        let (xx, yy, ww) = (x.numbers()?, y.numbers()?, w.numbers()?);
        let hh = match h {
            Some(h) => h.numbers()?,
            None => ww,
        };
        let cc = style.map(|(c, a)| ColorAccessor::new(c, a)).transpose()?;
        let frame = BatchFrame::new(&[xx, yy, ww, hh], cc.as_ref())?;
        for i in 0..frame.item_count {
            apply_item_style(s, mode, cc.as_ref(), i);
            match mode {
                Mode::Fill => self.renderer.fill_rect(s, xx.get(i), yy.get(i), ww.get(i), hh.get(i)),
                Mode::Stroke => {
                    self.renderer
                        .stroke_rect(s, xx.get(i), yy.get(i), ww.get(i), hh.get(i))
                }
            }
        }
        Ok(frame.item_count)
    }

    /// `[x, y, r]`.
    pub fn circles(
        &mut self,
        s: &mut dyn DrawingSurface,
        mode: Mode,
        x: &Argument,
        y: &Argument,
        r: &Argument,
        style: Option<(&Argument, &Argument)>,
    ) -> BridgeResult<usize> {
        let (xx, yy, rr) = (x.numbers()?, y.numbers()?, r.numbers()?);
        let cc = style.map(|(c, a)| ColorAccessor::new(c, a)).transpose()?;
        let frame = BatchFrame::new(&[xx, yy, rr], cc.as_ref())?;
        for i in 0..frame.item_count {
            apply_item_style(s, mode, cc.as_ref(), i);
            match mode {
                Mode::Fill => self.renderer.fill_circle(s, xx.get(i), yy.get(i), rr.get(i)),
                Mode::Stroke => self.renderer.stroke_circle(s, xx.get(i), yy.get(i), rr.get(i)),
            }
        }
        Ok(frame.item_count)
    }

    /// `[x, y, r, start, end]` plus a broadcast `anticlockwise` flag.
    pub fn arcs(
        &mut self,
        s: &mut dyn DrawingSurface,
        mode: Mode,
        geometry: [&Argument; 5],
        anticlockwise: bool,
        style: Option<(&Argument, &Argument)>,
    ) -> BridgeResult<usize> {
        let [x, y, r, a0, a1] = geometry;
        let fields = [
            x.numbers()?,
            y.numbers()?,
            r.numbers()?,
            a0.numbers()?,
            a1.numbers()?,
        ];
        let cc = style.map(|(c, a)| ColorAccessor::new(c, a)).transpose()?;
        let frame = BatchFrame::new(&fields, cc.as_ref())?;
        let [xx, yy, rr, ss, ee] = fields;
        for i in 0..frame.item_count {
            apply_item_style(s, mode, cc.as_ref(), i);
            let (cx, cy, rad, start, end) = (xx.get(i), yy.get(i), rr.get(i), ss.get(i), ee.get(i));
            match mode {
                Mode::Fill => self
                    .renderer
                    .fill_arc(s, cx, cy, rad, start, end, anticlockwise),
                Mode::Stroke => self
                    .renderer
                    .stroke_arc(s, cx, cy, rad, start, end, anticlockwise),
            }
        }
        Ok(frame.item_count)
    }

    /// One polygon (closed) or polyline (open) from a flat `x, y` buffer.
    pub fn polygon(
        &mut self,
        s: &mut dyn DrawingSurface,
        mode: Mode,
        closed: bool,
        points: &Argument,
    ) -> BridgeResult<()> {
        let coords = points.as_buffer()?;
        if coords.len() % 2 != 0 {
            return Err(BridgeError::protocol(format!(
                "point buffer has odd length {}",
                coords.len()
            )));
        }
        fill_scratch(&mut self.scratch, coords, 0..coords.len());
        self.draw_points(s, mode, closed);
        Ok(())
    }

    /// Variable-length polygons: `[points, pointsPerItem]`.
    #[allow(clippy::too_many_arguments)]
    pub fn polygons(
        &mut self,
        s: &mut dyn DrawingSurface,
        mode: Mode,
        closed: bool,
        points: &Argument,
        counts: &Argument,
        style: Option<(&Argument, &Argument)>,
    ) -> BridgeResult<usize> {
        let coords = points.as_buffer()?;
        let counts = counts.numbers()?;
        let cc = style.map(|(c, a)| ColorAccessor::new(c, a)).transpose()?;
        let frame = BatchFrame::new(&[counts], cc.as_ref())?;

        let needed = PolygonScan::total(counts, frame.item_count)?;
        if needed > coords.len() {
            return Err(BridgeError::protocol(format!(
                "polygons need {needed} coordinates but the buffer holds {}",
                coords.len()
            )));
        }

        for (i, range) in PolygonScan::new(counts, frame.item_count).enumerate() {
            apply_item_style(s, mode, cc.as_ref(), i);
            fill_scratch(&mut self.scratch, coords, range);
            self.draw_points(s, mode, closed);
        }
        Ok(frame.item_count)
    }

    fn draw_points(&mut self, s: &mut dyn DrawingSurface, mode: Mode, closed: bool) {
        let pts = &self.scratch;
        match (mode, closed) {
            (Mode::Fill, _) => self.renderer.fill_polygon(s, pts),
            (Mode::Stroke, true) => self.renderer.stroke_polygon(s, pts),
            (Mode::Stroke, false) => self.renderer.stroke_polyline(s, pts),
        }
    }
}

fn fill_scratch(scratch: &mut Vec<Point>, coords: &TypedBuffer, range: Range<usize>) {
    scratch.clear();
    let mut i = range.start;
    while i + 1 < range.end {
        let (x, y) = (
            coords.get(i).unwrap_or(f64::NAN),
            coords.get(i + 1).unwrap_or(f64::NAN),
        );
        scratch.push(Point::new(x, y));
        i += 2;
    }
}

/// Style is set immediately before each item because canvas style state is
/// global and every item may differ.
fn apply_item_style(s: &mut dyn DrawingSurface, mode: Mode, style: Option<&ColorAccessor<'_>>, i: usize) {
    let Some(cc) = style else {
        return;
    };
    let paint = Paint::Color(cc.get(i));
    let setting = match mode {
        Mode::Fill => StyleSetting::FillStyle(paint),
        Mode::Stroke => StyleSetting::StrokeStyle(paint),
    };
    s.apply_style(&setting);
}

#[cfg(test)]
#[path = "../../tests/unit/render/batch.rs"]
mod tests;
