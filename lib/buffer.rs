use heapless::Vec;

use crate::config::{ChannelCount, MAX_CHANNELS};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    start: usize,
    len: usize,
    cursor: usize,
}

impl Segment {
    fn is_full(&self) -> bool {
        self.cursor >= self.len
    }
}

/// Fixed sample storage sliced into one contiguous segment per channel.
pub struct SampleBuffer<const N: usize> {
    storage: &'static mut [u16; N],
    segments: Vec<Segment, MAX_CHANNELS>,
}

impl<const N: usize> SampleBuffer<N> {
    pub fn new(storage: &'static mut [u16; N]) -> Self {
        SampleBuffer {
            storage,
            segments: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Check that `channels` segments of `samples` words fit.
    pub fn check(channels: ChannelCount, samples: u16) -> Result<()> {
        let requested = channels.get() * usize::from(samples);
        if requested > N {
            return Err(Error::CapacityExceeded {
                requested,
                capacity: N,
            });
        }
        Ok(())
    }

    /// Slice the storage into `channels` segments of `samples` words and
    /// reset every cursor to the start of its segment.
    pub fn partition(&mut self, channels: ChannelCount, samples: u16) -> Result<()> {
        Self::check(channels, samples)?;

        let len = usize::from(samples);
        let mut segments = Vec::new();
        for channel in 0..channels.get() {
            segments
                .push(Segment {
                    start: channel * len,
                    len,
                    cursor: 0,
                })
                .map_err(|_| Error::InvalidChannel)?;
        }
        self.segments = segments;
        Ok(())
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Write one value per segment at its cursor and advance all cursors.
    /// Nothing is written once any segment is full.
    pub fn write_group(&mut self, group: &[u16]) -> bool {
        if group.len() < self.segments.len() || self.segments.iter().any(Segment::is_full) {
            return false;
        }
        for (segment, value) in self.segments.iter_mut().zip(group) {
            self.storage[segment.start + segment.cursor] = *value;
            segment.cursor += 1;
        }
        true
    }

    /// Mark `count` words of a segment as written behind the CPU's back.
    pub fn mark_written(&mut self, channel: usize, count: usize) {
        if let Some(segment) = self.segments.get_mut(channel) {
            segment.cursor = count.min(segment.len);
        }
    }

    pub fn cursor(&self, channel: usize) -> Option<usize> {
        self.segments.get(channel).map(|segment| segment.cursor)
    }

    /// Whole segment of a channel, written or not.
    pub fn segment(&self, channel: usize) -> Option<&[u16]> {
        self.segments
            .get(channel)
            .map(|segment| &self.storage[segment.start..segment.start + segment.len])
    }

    /// Words written to a segment so far.
    pub fn written(&self, channel: usize) -> Option<&[u16]> {
        self.segments
            .get(channel)
            .map(|segment| &self.storage[segment.start..segment.start + segment.cursor])
    }

    /// Start of the storage, the DMA destination.
    pub fn base_address(&mut self) -> u32 {
        self.storage.as_mut_ptr() as usize as u32
    }
}
