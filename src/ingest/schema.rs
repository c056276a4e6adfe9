// Table accessors for schema/continuous_data.fbs, in the shape flatc emits for Rust.
#![allow(clippy::needless_lifetimes, clippy::extra_unused_lifetimes)]

use flatbuffers::{FlatBufferBuilder, Follow, Table, VOffsetT, WIPOffset};

pub enum ContinuousDataOffset {}

#[derive(Copy, Clone, PartialEq)]
pub struct ContinuousData<'a> {
    pub _tab: Table<'a>,
}

impl<'a> Follow<'a> for ContinuousData<'a> {
    type Inner = ContinuousData<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: Table::new(buf, loc),
        }
    }
}

impl<'a> ContinuousData<'a> {
    pub const VT_SAMPLES: VOffsetT = 4;
    pub const VT_STREAM: VOffsetT = 6;
    pub const VT_N_CHANNELS: VOffsetT = 8;
    pub const VT_N_SAMPLES: VOffsetT = 10;
    pub const VT_SAMPLE_NUM: VOffsetT = 12;
    pub const VT_TIMESTAMP: VOffsetT = 14;
    pub const VT_MESSAGE_ID: VOffsetT = 16;
    pub const VT_SAMPLE_RATE: VOffsetT = 18;

    #[allow(unused_mut)]
    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut FlatBufferBuilder<'bldr>,
        args: &'args ContinuousDataArgs<'args>,
    ) -> WIPOffset<ContinuousData<'bldr>> {
        let mut builder = ContinuousDataBuilder::new(fbb);
        builder.add_message_id(args.message_id);
        builder.add_timestamp(args.timestamp);
        builder.add_sample_num(args.sample_num);
        builder.add_sample_rate(args.sample_rate);
        builder.add_n_samples(args.n_samples);
        builder.add_n_channels(args.n_channels);
        if let Some(x) = args.stream {
            builder.add_stream(x);
        }
        if let Some(x) = args.samples {
            builder.add_samples(x);
        }
        builder.finish()
    }

    // Safety (all accessors): the table was produced by a verified root lookup,
    // so every slot read below holds a value of the declared type.
    #[inline]
    pub fn samples(&self) -> Option<flatbuffers::Vector<'a, f32>> {
        unsafe {
            self._tab
                .get::<flatbuffers::ForwardsUOffset<flatbuffers::Vector<'a, f32>>>(
                    ContinuousData::VT_SAMPLES,
                    None,
                )
        }
    }
    #[inline]
    pub fn stream(&self) -> Option<&'a str> {
        unsafe {
            self._tab
                .get::<flatbuffers::ForwardsUOffset<&str>>(ContinuousData::VT_STREAM, None)
        }
    }
    #[inline]
    pub fn n_channels(&self) -> u32 {
        unsafe {
            self._tab
                .get::<u32>(ContinuousData::VT_N_CHANNELS, Some(0))
                .unwrap_or_default()
        }
    }
    #[inline]
    pub fn n_samples(&self) -> u32 {
        unsafe {
            self._tab
                .get::<u32>(ContinuousData::VT_N_SAMPLES, Some(0))
                .unwrap_or_default()
        }
    }
    #[inline]
    pub fn sample_num(&self) -> u64 {
        unsafe {
            self._tab
                .get::<u64>(ContinuousData::VT_SAMPLE_NUM, Some(0))
                .unwrap_or_default()
        }
    }
    #[inline]
    pub fn timestamp(&self) -> f64 {
        unsafe {
            self._tab
                .get::<f64>(ContinuousData::VT_TIMESTAMP, Some(0.0))
                .unwrap_or_default()
        }
    }
    #[inline]
    pub fn message_id(&self) -> u64 {
        unsafe {
            self._tab
                .get::<u64>(ContinuousData::VT_MESSAGE_ID, Some(0))
                .unwrap_or_default()
        }
    }
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        unsafe {
            self._tab
                .get::<u32>(ContinuousData::VT_SAMPLE_RATE, Some(0))
                .unwrap_or_default()
        }
    }
}

impl flatbuffers::Verifiable for ContinuousData<'_> {
    #[inline]
    fn run_verifier(
        v: &mut flatbuffers::Verifier,
        pos: usize,
    ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<flatbuffers::ForwardsUOffset<flatbuffers::Vector<'_, f32>>>(
                "samples",
                Self::VT_SAMPLES,
                false,
            )?
            .visit_field::<flatbuffers::ForwardsUOffset<&str>>("stream", Self::VT_STREAM, false)?
            .visit_field::<u32>("n_channels", Self::VT_N_CHANNELS, false)?
            .visit_field::<u32>("n_samples", Self::VT_N_SAMPLES, false)?
            .visit_field::<u64>("sample_num", Self::VT_SAMPLE_NUM, false)?
            .visit_field::<f64>("timestamp", Self::VT_TIMESTAMP, false)?
            .visit_field::<u64>("message_id", Self::VT_MESSAGE_ID, false)?
            .visit_field::<u32>("sample_rate", Self::VT_SAMPLE_RATE, false)?
            .finish();
        Ok(())
    }
}

pub struct ContinuousDataArgs<'a> {
    pub samples: Option<WIPOffset<flatbuffers::Vector<'a, f32>>>,
    pub stream: Option<WIPOffset<&'a str>>,
    pub n_channels: u32,
    pub n_samples: u32,
    pub sample_num: u64,
    pub timestamp: f64,
    pub message_id: u64,
    pub sample_rate: u32,
}

impl<'a> Default for ContinuousDataArgs<'a> {
    #[inline]
    fn default() -> Self {
        ContinuousDataArgs {
            samples: None,
            stream: None,
            n_channels: 0,
            n_samples: 0,
            sample_num: 0,
            timestamp: 0.0,
            message_id: 0,
            sample_rate: 0,
        }
    }
}

pub struct ContinuousDataBuilder<'a: 'b, 'b> {
    fbb_: &'b mut FlatBufferBuilder<'a>,
    start_: WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
}

impl<'a: 'b, 'b> ContinuousDataBuilder<'a, 'b> {
    #[inline]
    pub fn add_samples(&mut self, samples: WIPOffset<flatbuffers::Vector<'b, f32>>) {
        self.fbb_
            .push_slot_always::<WIPOffset<_>>(ContinuousData::VT_SAMPLES, samples);
    }
    #[inline]
    pub fn add_stream(&mut self, stream: WIPOffset<&'b str>) {
        self.fbb_
            .push_slot_always::<WIPOffset<_>>(ContinuousData::VT_STREAM, stream);
    }
    #[inline]
    pub fn add_n_channels(&mut self, n_channels: u32) {
        self.fbb_
            .push_slot::<u32>(ContinuousData::VT_N_CHANNELS, n_channels, 0);
    }
    #[inline]
    pub fn add_n_samples(&mut self, n_samples: u32) {
        self.fbb_
            .push_slot::<u32>(ContinuousData::VT_N_SAMPLES, n_samples, 0);
    }
    #[inline]
    pub fn add_sample_num(&mut self, sample_num: u64) {
        self.fbb_
            .push_slot::<u64>(ContinuousData::VT_SAMPLE_NUM, sample_num, 0);
    }
    #[inline]
    pub fn add_timestamp(&mut self, timestamp: f64) {
        self.fbb_
            .push_slot::<f64>(ContinuousData::VT_TIMESTAMP, timestamp, 0.0);
    }
    #[inline]
    pub fn add_message_id(&mut self, message_id: u64) {
        self.fbb_
            .push_slot::<u64>(ContinuousData::VT_MESSAGE_ID, message_id, 0);
    }
    #[inline]
    pub fn add_sample_rate(&mut self, sample_rate: u32) {
        self.fbb_
            .push_slot::<u32>(ContinuousData::VT_SAMPLE_RATE, sample_rate, 0);
    }
    #[inline]
    pub fn new(fbb: &'b mut FlatBufferBuilder<'a>) -> ContinuousDataBuilder<'a, 'b> {
        let start = fbb.start_table();
        ContinuousDataBuilder {
            fbb_: fbb,
            start_: start,
        }
    }
    #[inline]
    pub fn finish(self) -> WIPOffset<ContinuousData<'a>> {
        let o = self.fbb_.end_table(self.start_);
        WIPOffset::new(o.value())
    }
}

/// Verifies `buf` and returns the root `ContinuousData` table.
#[inline]
pub fn root_as_continuous_data(
    buf: &[u8],
) -> Result<ContinuousData<'_>, flatbuffers::InvalidFlatbuffer> {
    flatbuffers::root::<ContinuousData>(buf)
}

#[inline]
pub fn finish_continuous_data_buffer<'a>(
    fbb: &mut FlatBufferBuilder<'a>,
    root: WIPOffset<ContinuousData<'a>>,
) {
    fbb.finish(root, None);
}
