// Lock-free note channel (scheduler thread → audio thread)

use crate::messaging::note::{NoteEvent, NoteSink};
use ringbuf::{
    HeapRb,
    traits::{Producer, Split},
};

pub type NoteProducer = ringbuf::HeapProd<NoteEvent>;
pub type NoteConsumer = ringbuf::HeapCons<NoteEvent>;

pub fn create_note_channel(capacity: usize) -> (NoteProducer, NoteConsumer) {
    let rb = HeapRb::<NoteEvent>::new(capacity);
    rb.split()
}

impl NoteSink for NoteProducer {
    fn note(&mut self, event: NoteEvent) {
        // Never blocks: on overflow the event is dropped
        if self.try_push(event).is_err() {
            log::warn!(
                "Note queue full, dropped {} step {} at {:.3}s",
                event.voice,
                event.step,
                event.time
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::pattern::VoiceId;
    use ringbuf::traits::Consumer;

    fn event(step: usize) -> NoteEvent {
        NoteEvent {
            voice: VoiceId::Synth1,
            step,
            time: step as f64 * 0.125,
            velocity: 0.8,
        }
    }

    #[test]
    fn test_channel_delivers_in_order() {
        let (mut tx, mut rx) = create_note_channel(8);
        tx.note(event(0));
        tx.note(event(1));

        assert_eq!(rx.try_pop().map(|e| e.step), Some(0));
        assert_eq!(rx.try_pop().map(|e| e.step), Some(1));
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_full_channel_drops_newest() {
        let (mut tx, mut rx) = create_note_channel(2);
        for step in 0..4 {
            tx.note(event(step));
        }

        let received: Vec<usize> = std::iter::from_fn(|| rx.try_pop()).map(|e| e.step).collect();
        assert_eq!(received, vec![0, 1]);
    }
}
