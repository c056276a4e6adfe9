use flatbuffers::FlatBufferBuilder;
use ndarray::Array2;

use crate::ingest::schema::{
    finish_continuous_data_buffer, root_as_continuous_data, ContinuousData, ContinuousDataArgs,
};
use crate::ingest::{DecodeError, ShapeError};

/// Descriptive fields carried next to the samples. Not used by the window itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PacketMeta {
    pub stream: Option<String>,
    pub sample_num: u64,
    pub timestamp: f64,
    pub message_id: u64,
    pub sample_rate: u32,
}

/// One decoded `ContinuousData` message, not yet checked for shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    pub num_samples: u32,
    pub num_channels: u32,
    pub samples: Vec<f32>, // channel-major: all of channel 0, then channel 1, ...
    pub meta: PacketMeta,
}

/// Packet whose samples are known to form a `num_channels x num_samples` block.
#[derive(Clone, Debug)]
pub struct ValidatedPacket {
    samples: Array2<f32>, // channels x samples
    meta: PacketMeta,
}

impl ValidatedPacket {
    pub fn num_samples(&self) -> usize {
        self.samples.ncols()
    }
    pub fn num_channels(&self) -> usize {
        self.samples.nrows()
    }
    pub fn samples(&self) -> &Array2<f32> {
        &self.samples
    }
    pub fn meta(&self) -> &PacketMeta {
        &self.meta
    }
}

/// Parses a raw payload. Never panics on hostile input: the buffer is verified
/// before any field is read.
pub fn decode(raw: &[u8]) -> Result<Packet, DecodeError> {
    let data = root_as_continuous_data(raw)?;
    let samples = data
        .samples()
        .ok_or_else(|| DecodeError::Malformed("missing samples vector".into()))?;
    Ok(Packet {
        num_samples: data.n_samples(),
        num_channels: data.n_channels(),
        samples: samples.iter().collect(),
        meta: PacketMeta {
            stream: data.stream().map(str::to_owned),
            sample_num: data.sample_num(),
            timestamp: data.timestamp(),
            message_id: data.message_id(),
            sample_rate: data.sample_rate(),
        },
    })
}

/// Checks `samples.len() == num_samples * num_channels` and reshapes.
pub fn validate(packet: Packet) -> Result<ValidatedPacket, ShapeError> {
    let num_samples = packet.num_samples as usize;
    let num_channels = packet.num_channels as usize;
    let actual = packet.samples.len();
    let expected = num_samples.checked_mul(num_channels).unwrap_or(usize::MAX);
    if actual != expected {
        return Err(ShapeError::SizeMismatch { expected, actual });
    }
    let samples = Array2::from_shape_vec((num_channels, num_samples), packet.samples)
        .map_err(|_| ShapeError::SizeMismatch { expected, actual })?;
    Ok(ValidatedPacket {
        samples,
        meta: packet.meta,
    })
}

impl Packet {
    pub fn validate(self) -> Result<ValidatedPacket, ShapeError> {
        validate(self)
    }
}

/// Serializes a packet into the wire format. Sizes are written as given, so a
/// deliberately inconsistent packet can be produced.
pub fn encode_packet(packet: &Packet) -> Vec<u8> {
    let mut fbb = FlatBufferBuilder::with_capacity(64 + packet.samples.len() * 4);
    let samples = fbb.create_vector(&packet.samples[..]);
    let stream = packet.meta.stream.as_deref().map(|s| fbb.create_string(s));
    let root = ContinuousData::create(
        &mut fbb,
        &ContinuousDataArgs {
            samples: Some(samples),
            stream,
            n_channels: packet.num_channels,
            n_samples: packet.num_samples,
            sample_num: packet.meta.sample_num,
            timestamp: packet.meta.timestamp,
            message_id: packet.meta.message_id,
            sample_rate: packet.meta.sample_rate,
        },
    );
    finish_continuous_data_buffer(&mut fbb, root);
    fbb.finished_data().to_vec()
}

/// Convenience constructor for a packet from per-channel rows.
pub fn packet_from_rows(rows: &[Vec<f32>]) -> Packet {
    let num_samples = rows.first().map(|r| r.len()).unwrap_or(0);
    Packet {
        num_samples: num_samples as u32,
        num_channels: rows.len() as u32,
        samples: rows.iter().flatten().copied().collect(),
        meta: PacketMeta::default(),
    }
}
