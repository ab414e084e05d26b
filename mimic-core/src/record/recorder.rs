use super::Record;

/// Sink of metric records.
///
/// Every scalar in a written record is a `(name, value, step)` triple.
pub trait Recorder {
    /// Writes a record produced at the given step.
    fn write(&mut self, step: usize, record: Record);

    /// Flushes buffered output, if any.
    fn flush(&mut self) {}
}
