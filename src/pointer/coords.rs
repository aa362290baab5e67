use crate::host::{BoundingBox, ClientSize, PointerMove};

/// Treat absent, `NaN` and infinite inputs as zero.
fn term(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Pointer position relative to an element, clamped to its client box.
///
/// `x = clientX - left` and `y = clientY - top`, floored at zero. Each axis
/// is capped at the element's client dimension when that dimension is
/// known and non-zero; a zero or missing dimension leaves the axis uncapped.
///
/// # Examples
///
/// ```
/// use tincan_hooks::host::{BoundingBox, ClientSize, PointerMove};
/// use tincan_hooks::pointer::relative_xy;
///
/// let bounds = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
/// let size = ClientSize { width: 100.0, height: 50.0 };
///
/// assert_eq!(relative_xy(&PointerMove::at(5.0, 15.0), Some(bounds), Some(size)), (0.0, 0.0));
/// assert_eq!(relative_xy(&PointerMove::at(200.0, 30.0), Some(bounds), Some(size)), (100.0, 10.0));
/// ```
pub fn relative_xy(
    event: &PointerMove,
    bounds: Option<BoundingBox>,
    client_size: Option<ClientSize>,
) -> (f64, f64) {
    let mut x = term(event.client_x) - term(bounds.map(|b| b.left));
    let mut y = term(event.client_y) - term(bounds.map(|b| b.top));

    if y < 0.0 {
        y = 0.0;
    }
    if x < 0.0 {
        x = 0.0;
    }

    if let Some(size) = client_size {
        if size.height > 0.0 && y > size.height {
            y = size.height;
        }
        if size.width > 0.0 && x > size.width {
            x = size.width;
        }
    }

    (x, y)
}
