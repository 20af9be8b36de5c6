//! Canvas sizing model.
//!
//! The canvas has a backing buffer (`output`, the render resolution) and a
//! `display` size it is shown at. Each pair can be aspect-locked: changing a
//! locked dimension recomputes its partner from the aspect ratio the pair had
//! *before* the change. Numeric input is arithmetic text evaluated by
//! [`expr::evaluate`].

pub mod expr;

use std::fmt;

pub use expr::{evaluate, ExprError};

/// Largest accepted value for any dimension.
pub const MAX_DIMENSION: u32 = 16384;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SizingError {
    #[error("invalid size expression '{input}': {source}")]
    Expression {
        input: String,
        #[source]
        source: ExprError,
    },
    #[error("size {value} is out of range (1..={MAX_DIMENSION})")]
    OutOfRange { value: f64 },
    #[error("expected WIDTHxHEIGHT, got '{0}'")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parses `WIDTHxHEIGHT` where each side is an arithmetic expression.
    pub fn parse(input: &str) -> Result<Self, SizingError> {
        let (width, height) = input
            .split_once(['x', 'X'])
            .ok_or_else(|| SizingError::Malformed(input.to_string()))?;
        Ok(Self {
            width: evaluate_dimension(width)?,
            height: evaluate_dimension(height)?,
        })
    }

    fn get(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Width => self.width,
            Axis::Height => self.height,
        }
    }

    fn set(&mut self, axis: Axis, value: u32) {
        match axis {
            Axis::Width => self.width = value,
            Axis::Height => self.height = value,
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which of the two independently lockable pairs a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pair {
    Output,
    Display,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

impl Axis {
    fn other(self) -> Self {
        match self {
            Self::Width => Self::Height,
            Self::Height => Self::Width,
        }
    }
}

/// Backing-buffer and display sizes of the canvas plus their aspect locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub output: Dimensions,
    pub display: Dimensions,
    pub lock_output: bool,
    pub lock_display: bool,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::new(Dimensions::new(800, 600), Dimensions::new(800, 600))
    }
}

impl CanvasSize {
    pub fn new(output: Dimensions, display: Dimensions) -> Self {
        Self {
            output,
            display,
            lock_output: false,
            lock_display: false,
        }
    }

    /// Evaluates `input` and stores it on `pair`/`axis`, honouring the lock.
    ///
    /// Returns the resulting dimensions of the pair. On error nothing changes.
    pub fn apply(&mut self, pair: Pair, axis: Axis, input: &str) -> Result<Dimensions, SizingError> {
        let value = evaluate_dimension(input)?;
        Ok(self.set_dimension(pair, axis, value))
    }

    /// Stores an already evaluated dimension, honouring the lock.
    pub fn set_dimension(&mut self, pair: Pair, axis: Axis, value: u32) -> Dimensions {
        let locked = self.is_locked(pair);
        let dims = self.dims_mut(pair);
        let previous = *dims;
        dims.set(axis, value.clamp(1, MAX_DIMENSION));
        if locked {
            let partner = scale_partner(value, previous.get(axis), previous.get(axis.other()));
            dims.set(axis.other(), partner);
        }
        let current = *dims;
        tracing::debug!(
            ?pair,
            ?axis,
            locked,
            from = %previous,
            to = %current,
            "canvas dimension changed"
        );
        current
    }

    /// Replaces the display size outright, e.g. when a window is resized.
    pub fn set_display(&mut self, display: Dimensions) {
        self.display = Dimensions::new(
            display.width.clamp(1, MAX_DIMENSION),
            display.height.clamp(1, MAX_DIMENSION),
        );
    }

    pub fn set_lock(&mut self, pair: Pair, locked: bool) {
        match pair {
            Pair::Output => self.lock_output = locked,
            Pair::Display => self.lock_display = locked,
        }
    }

    pub fn is_locked(&self, pair: Pair) -> bool {
        match pair {
            Pair::Output => self.lock_output,
            Pair::Display => self.lock_display,
        }
    }

    fn dims_mut(&mut self, pair: Pair) -> &mut Dimensions {
        match pair {
            Pair::Output => &mut self.output,
            Pair::Display => &mut self.display,
        }
    }
}

/// Evaluates one dimension field, truncating fractional results.
pub fn evaluate_dimension(input: &str) -> Result<u32, SizingError> {
    let value = evaluate(input).map_err(|source| SizingError::Expression {
        input: input.trim().to_string(),
        source,
    })?;
    let truncated = value.trunc();
    if truncated < 1.0 || truncated > f64::from(MAX_DIMENSION) {
        return Err(SizingError::OutOfRange { value });
    }
    Ok(truncated as u32)
}

/// Partner of a locked dimension: `new * old_partner / old`, rounded.
fn scale_partner(new_value: u32, old_value: u32, old_partner: u32) -> u32 {
    let scaled = f64::from(new_value) * f64::from(old_partner) / f64::from(old_value.max(1));
    (scaled.round() as u32).clamp(1, MAX_DIMENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_output_width_rescales_height() {
        let mut canvas = CanvasSize::new(Dimensions::new(800, 600), Dimensions::new(800, 600));
        canvas.set_lock(Pair::Output, true);
        let output = canvas.apply(Pair::Output, Axis::Width, "400").unwrap();
        assert_eq!(output, Dimensions::new(400, 300));
        assert_eq!(canvas.display, Dimensions::new(800, 600));
    }

    #[test]
    fn locked_height_rescales_width_from_previous_aspect() {
        let mut canvas = CanvasSize::new(Dimensions::new(1920, 1080), Dimensions::new(960, 540));
        canvas.set_lock(Pair::Display, true);
        canvas.apply(Pair::Display, Axis::Height, "1080 / 2 * 2").unwrap();
        assert_eq!(canvas.display, Dimensions::new(1920, 1080));
        assert_eq!(canvas.output, Dimensions::new(1920, 1080));
    }

    #[test]
    fn unlocked_pairs_change_independently() {
        let mut canvas = CanvasSize::default();
        canvas.apply(Pair::Output, Axis::Width, "1024").unwrap();
        canvas.apply(Pair::Display, Axis::Height, "300").unwrap();
        assert_eq!(canvas.output, Dimensions::new(1024, 600));
        assert_eq!(canvas.display, Dimensions::new(800, 300));
    }

    #[test]
    fn rejected_input_leaves_size_untouched() {
        let mut canvas = CanvasSize::default();
        canvas.set_lock(Pair::Output, true);
        assert!(matches!(
            canvas.apply(Pair::Output, Axis::Width, "window.close()"),
            Err(SizingError::Expression { .. })
        ));
        assert!(matches!(
            canvas.apply(Pair::Output, Axis::Height, "0.5"),
            Err(SizingError::OutOfRange { .. })
        ));
        assert!(matches!(
            canvas.apply(Pair::Output, Axis::Height, "-10"),
            Err(SizingError::OutOfRange { .. })
        ));
        assert_eq!(canvas, {
            let mut expected = CanvasSize::default();
            expected.lock_output = true;
            expected
        });
    }

    #[test]
    fn truncates_fractional_results() {
        assert_eq!(evaluate_dimension("1000 / 3"), Ok(333));
    }

    #[test]
    fn parses_dimension_pairs() {
        assert_eq!(Dimensions::parse("800x600"), Ok(Dimensions::new(800, 600)));
        assert_eq!(
            Dimensions::parse("1920/2 X 1080/2"),
            Ok(Dimensions::new(960, 540))
        );
        assert!(matches!(
            Dimensions::parse("800"),
            Err(SizingError::Malformed(_))
        ));
    }
}
