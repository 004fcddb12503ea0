//! Formatting helpers.

use std::fmt;

/// Wrap a formatting closure as an on-the-fly [`fmt::Display`] value, so
/// that grammar-aware renderers need no dedicated adapter types.
pub fn display_fn<F>(f: F) -> impl fmt::Display
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    struct Adapter<F>(F);

    impl<F> fmt::Display for Adapter<F>
    where
        F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            (self.0)(f)
        }
    }

    Adapter(f)
}
