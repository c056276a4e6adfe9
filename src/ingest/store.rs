use ndarray::{s, Array2, ArrayView1, ArrayViewMut1, Axis};
use parking_lot::RwLock;

use crate::ingest::{
    ChannelSelection, EngineConfig, OversizedPacketPolicy, ShapeError, ValidatedPacket,
};

/// Copy of every tracked window plus the cursor, taken under one lock.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowSnapshot {
    pub samples: Array2<f32>, // tracked channels x window_capacity
    pub cursor: usize,
    pub channel_ids: Vec<usize>,
    /// Packets applied to the window so far.
    pub packets_written: u64,
    /// Rate reported by the latest written packet, 0 until one carried it.
    pub sample_rate_hz: u32,
}

impl WindowSnapshot {
    pub fn capacity(&self) -> usize {
        self.samples.ncols()
    }
    pub fn channel(&self, channel_id: usize) -> Option<ArrayView1<'_, f32>> {
        let slot = self.channel_ids.iter().position(|&id| id == channel_id)?;
        Some(self.samples.row(slot))
    }
    /// Window of `channel_id` reordered oldest sample first.
    pub fn chronological(&self, channel_id: usize) -> Option<Vec<f32>> {
        let row = self.channel(channel_id)?;
        Some(
            row.slice(s![self.cursor..])
                .iter()
                .chain(row.slice(s![..self.cursor]).iter())
                .copied()
                .collect(),
        )
    }
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.capacity() as f32 / self.sample_rate_hz as f32
    }
}

struct WindowState {
    windows: Array2<f32>, // tracked channels x capacity
    cursor: usize,
    packets_written: u64,
    sample_rate_hz: u32,
}

/// Fixed-length circular window per tracked channel, sharing one write cursor.
///
/// All channels of a packet are written and the cursor advanced while holding
/// the write lock, so [`RingBufferStore::snapshot`] never sees half a packet.
pub struct RingBufferStore {
    selection: ChannelSelection,
    capacity: usize,
    scale_factor: f32,
    oversized_policy: OversizedPacketPolicy,
    state: RwLock<WindowState>,
}

impl RingBufferStore {
    /// `capacity` and `scale_factor` are assumed valid; see [`EngineConfig::validate`].
    pub fn new(
        selection: ChannelSelection,
        capacity: usize,
        scale_factor: f32,
        oversized_policy: OversizedPacketPolicy,
    ) -> Self {
        Self {
            selection,
            capacity,
            scale_factor,
            oversized_policy,
            state: RwLock::new(WindowState {
                windows: Array2::zeros((selection.tracked_count(), capacity)),
                cursor: 0,
                packets_written: 0,
                sample_rate_hz: 0,
            }),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.channels,
            config.window_capacity,
            config.scale_factor,
            config.oversized_policy,
        )
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn selection(&self) -> ChannelSelection {
        self.selection
    }
    pub fn cursor(&self) -> usize {
        self.state.read().cursor
    }

    /// Scales the tracked channels of `packet` and writes them at the shared
    /// cursor. Returns the new cursor. Rejected packets leave the store untouched.
    pub fn write_packet(&self, packet: &ValidatedPacket) -> Result<usize, ShapeError> {
        let required = self.selection.required_source_channels();
        if packet.num_channels() < required {
            return Err(ShapeError::ChannelMismatch {
                required,
                actual: packet.num_channels(),
            });
        }
        let num_samples = packet.num_samples();
        if num_samples >= self.capacity && self.oversized_policy == OversizedPacketPolicy::Reject
        {
            return Err(ShapeError::Oversized {
                num_samples,
                capacity: self.capacity,
            });
        }
        if num_samples > self.capacity {
            log::debug!(
                "packet of {} samples exceeds window of {}, keeping the newest",
                num_samples,
                self.capacity
            );
        }
        let first = self.selection.first_channel();
        let scale = self.scale_factor;
        let rows = packet
            .samples()
            .slice(s![first..first + self.selection.tracked_count(), ..])
            .mapv(|v| v / scale);

        let mut state = self.state.write();
        let cursor_before = state.cursor;
        let mut cursor_after = cursor_before;
        for (window, row) in state
            .windows
            .axis_iter_mut(Axis(0))
            .zip(rows.axis_iter(Axis(0)))
        {
            cursor_after = write_wrapped(window, row, cursor_before);
        }
        state.cursor = cursor_after;
        state.packets_written += 1;
        if packet.meta().sample_rate > 0 {
            state.sample_rate_hz = packet.meta().sample_rate;
        }
        Ok(cursor_after)
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        let state = self.state.read();
        WindowSnapshot {
            samples: state.windows.clone(),
            cursor: state.cursor,
            channel_ids: self.selection.channel_ids(),
            packets_written: state.packets_written,
            sample_rate_hz: state.sample_rate_hz,
        }
    }

    /// Copy of one channel's window and the cursor. `None` selects the first
    /// tracked channel, which in single-channel mode is the selected one.
    pub fn channel_snapshot(&self, channel_id: Option<usize>) -> Option<(Vec<f32>, usize)> {
        let slot = match channel_id {
            Some(id) => self.selection.slot_of(id)?,
            None => 0,
        };
        let state = self.state.read();
        Some((state.windows.row(slot).to_vec(), state.cursor))
    }
}

/// Writes `row` into the circular `window` starting at `cursor_before` and
/// returns `(cursor_before + row.len()) % window.len()`.
///
/// A row at least as long as the window overwrites all of it; only its last
/// `window.len()` samples survive, each at the slot a sample-by-sample write
/// would have used.
pub fn write_wrapped(
    mut window: ArrayViewMut1<'_, f32>,
    row: ArrayView1<'_, f32>,
    cursor_before: usize,
) -> usize {
    let capacity = window.len();
    if capacity == 0 {
        return 0;
    }
    let num_samples = row.len();
    let skip = num_samples.saturating_sub(capacity);
    let row = row.slice(s![skip..]);
    let start = (cursor_before + skip) % capacity;
    let len = row.len();
    if start + len <= capacity {
        window.slice_mut(s![start..start + len]).assign(&row);
    } else {
        let part1 = capacity - start;
        window.slice_mut(s![start..]).assign(&row.slice(s![..part1]));
        window
            .slice_mut(s![..len - part1])
            .assign(&row.slice(s![part1..]));
    }
    (cursor_before + num_samples) % capacity
}
