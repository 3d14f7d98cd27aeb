//! Interrupt boundary
//!
//! Interrupt handlers only record that something happened. They hold an
//! [`EventSender`] and push an [`Event`]; the processing loop holds the
//! matching [`EventReceiver`] and does all the real work. The two halves come
//! from splitting a single-producer single-consumer [`EventQueue`].

use embedded_hal::digital::v2::InputPin;
use heapless::spsc::{Consumer, Producer, Queue};

/// Something a hardware signal reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The radio has a packet (or a reception error) ready
    PacketReady,
    /// The user button was pressed
    ButtonPressed,
}

/// Backing storage for the event channel; holds `N - 1` events
pub type EventQueue<const N: usize> = Queue<Event, N>;

/// Split `queue` into its interrupt side and loop side
pub fn split<const N: usize>(
    queue: &mut EventQueue<N>,
) -> (EventSender<'_, N>, EventReceiver<'_, N>) {
    let (producer, consumer) = queue.split();
    (
        EventSender { producer },
        EventReceiver {
            consumer,
            held_presses: 0,
        },
    )
}

/// Interrupt side of the event channel
pub struct EventSender<'a, const N: usize> {
    producer: Producer<'a, Event, N>,
}

impl<'a, const N: usize> EventSender<'a, N> {
    /// Record `event`. Never blocks; returns `false` if the queue was full and
    /// the event was lost.
    pub fn signal(&mut self, event: Event) -> bool {
        self.producer.enqueue(event).is_ok()
    }
}

/// Loop side of the event channel
pub struct EventReceiver<'a, const N: usize> {
    consumer: Consumer<'a, Event, N>,
    // Button presses pulled off the queue by an invalidation. They precede
    // everything still in the queue.
    held_presses: usize,
}

impl<'a, const N: usize> EventReceiver<'a, N> {
    /// Next event in arrival order
    pub fn next(&mut self) -> Option<Event> {
        if self.held_presses > 0 {
            self.held_presses -= 1;
            return Some(Event::ButtonPressed);
        }
        self.consumer.dequeue()
    }

    /// Whether no event is waiting
    pub fn is_empty(&self) -> bool {
        self.held_presses == 0 && self.consumer.len() == 0
    }

    /// Drop every queued packet-ready event, keeping the others in order
    ///
    /// Called after a transmit: anything the radio signalled before
    /// reception was re-armed belongs to an abandoned reception.
    /// Returns the number of events dropped.
    pub fn invalidate_packet_ready(&mut self) -> usize {
        let mut dropped = 0;
        while let Some(event) = self.consumer.dequeue() {
            match event {
                Event::PacketReady => dropped += 1,
                Event::ButtonPressed => self.held_presses += 1,
            }
        }
        dropped
    }
}

/// Signal edge to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// High to low (active-low button)
    Falling,
    /// Low to high (radio DIO line)
    Rising,
}

/// Result of sampling a watched pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// Watched edge did not occur
    Quiet,
    /// Edge seen and its event queued
    Signalled,
    /// Edge seen but the queue was full; the event was lost
    Lost,
}

/// Turns level samples of an input pin into edge-triggered events
///
/// For boards where the pin is polled instead of wired to an interrupt.
pub struct EdgeWatcher<P: InputPin> {
    pin: P,
    edge: Edge,
    event: Event,
    last_high: Option<bool>,
}

impl<P: InputPin> EdgeWatcher<P> {
    /// Watch `pin` for `edge`, signalling `event` each time it occurs
    pub fn new(pin: P, edge: Edge, event: Event) -> Self {
        Self {
            pin,
            edge,
            event,
            last_high: None,
        }
    }

    /// Sample the pin once, signalling on the watched edge
    pub fn poll<const N: usize>(
        &mut self,
        sender: &mut EventSender<'_, N>,
    ) -> Result<Sample, P::Error> {
        let high = self.pin.is_high()?;
        let fired = match (self.last_high, self.edge) {
            (Some(true), Edge::Falling) => !high,
            (Some(false), Edge::Rising) => high,
            _ => false,
        };
        self.last_high = Some(high);
        if !fired {
            return Ok(Sample::Quiet);
        }
        if sender.signal(self.event) {
            Ok(Sample::Signalled)
        } else {
            Ok(Sample::Lost)
        }
    }

    /// Release the pin
    pub fn free(self) -> P {
        self.pin
    }
}
