pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Error {
    // Segments would not fit into the sample buffer
    CapacityExceeded { requested: usize, capacity: usize },
    // A capture is still in flight
    Busy,
    // Zero tick delay between samples
    InvalidDelay,
    // Zero samples requested
    EmptyCapture,
    // Readback of a segment or range that does not exist
    InvalidChannel,
    // Host serial link
    Link,
    // SPI bus or chip select
    Bus,
}
