use super::{Record, Recorder};

/// Keeps every written record in memory.
#[derive(Default)]
pub struct BufferedRecorder {
    buf: Vec<(usize, Record)>,
}

impl BufferedRecorder {
    /// Constructs the recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an iterator over `(step, record)` pairs in writing order.
    pub fn iter(&self) -> std::slice::Iter<(usize, Record)> {
        self.buf.iter()
    }

    /// Returns `(step, value)` pairs of the scalar with the given name.
    pub fn scalars(&self, name: &str) -> Vec<(usize, f32)> {
        self.buf
            .iter()
            .filter_map(|(step, record)| record.get_scalar(name).ok().map(|v| (*step, v)))
            .collect()
    }

    /// Returns the number of written records.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Recorder for BufferedRecorder {
    fn write(&mut self, step: usize, record: Record) {
        self.buf.push((step, record));
    }
}
