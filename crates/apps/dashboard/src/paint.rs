use std::collections::BTreeSet;

/// State of one press-drag-release paint stroke.
///
/// The gesture only decides *whether* a cell under the pointer gets painted
/// and with what value; the session applies the edit.
#[derive(Debug, Default)]
pub struct PaintGesture {
    value: Option<f64>,
    touched: BTreeSet<String>,
}

impl PaintGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, value: f64) {
        self.value = Some(value);
        self.touched.clear();
    }

    /// Value to paint onto the cell under the pointer, or `None` when no
    /// stroke is active. Re-entering a cell within the same stroke paints it
    /// again.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Records that `identity` was painted during the current stroke.
    pub fn painted(&mut self, identity: &str) {
        if self.value.is_some() {
            self.touched.insert(identity.to_string());
        }
    }

    /// Ends the stroke. Returns the number of distinct cells it painted.
    pub fn release(&mut self) -> usize {
        self.value = None;
        let touched = self.touched.len();
        self.touched.clear();
        touched
    }

    pub fn is_active(&self) -> bool {
        self.value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::PaintGesture;

    #[test]
    fn moves_only_paint_while_pressed() {
        let mut g = PaintGesture::new();
        assert_eq!(g.value(), None);

        g.press(210.0);
        assert!(g.is_active());
        assert_eq!(g.value(), Some(210.0));
        g.painted("a");
        g.painted("b");
        g.painted("a");
        assert_eq!(g.release(), 2);

        assert!(!g.is_active());
        g.painted("c");
        assert_eq!(g.value(), None);
        assert_eq!(g.release(), 0);
    }
}
