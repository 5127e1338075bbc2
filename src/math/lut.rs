/// A lookup table

#[derive(Clone, Debug)]
pub struct LookupTable<T> {
    offset: f64,
    step: f64,
    values: Vec<T>,
}

impl<T> LookupTable<T> {
    /// Creates a lookup table whose `i`th value covers `[offset + i * step, offset + (i + 1) * step)`.
    pub fn from_values(offset: f64, step: f64, values: Vec<T>) -> Self {
        assert!(!values.is_empty(), "Lookup table must contain at least one value");
        Self {
            offset,
            step,
            values,
        }
    }

    /// Samples the lookup table. Values outside the table's range are clamped.
    pub fn sample(&self, x: f64) -> &T {
        let idx = (x - self.offset) / self.step;
        let idx = usize::min(idx as u32 as usize, self.values.len() - 1);
        &self.values[idx]
    }

    /// The values in the table.
    pub fn values(&self) -> &[T] {
        &self.values
    }
}
