// Events - Lock-free notifications from the audio thread

use crate::sampler::timbre::Timbre;
use ringbuf::{HeapRb, traits::Split};

/// Something the engine did while rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    /// A track sounded
    Hit {
        track: usize,
        step: usize,
        sample: Timbre,
        /// Clock time of the hit in seconds
        at: f64,
    },
    /// The transport finished starting
    Started,
}

pub type EventProducer = ringbuf::HeapProd<EngineEvent>;
pub type EventConsumer = ringbuf::HeapCons<EngineEvent>;

pub fn create_event_channel(capacity: usize) -> (EventProducer, EventConsumer) {
    let rb = HeapRb::<EngineEvent>::new(capacity.max(1));
    rb.split()
}
