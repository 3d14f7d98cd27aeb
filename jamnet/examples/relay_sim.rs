//! Host-side simulation: one gateway, two end devices, one shared "air".
//!
//! Frames transmitted on a frequency are delivered to every radio listening on
//! it. Run with `cargo run --example relay_sim --features std`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use jamnet::{
    config::device::DeviceConfig,
    events::{self, Event, EventQueue},
    jamnet::packet::{App, NetworkName},
    radio::{Radio, ReceiveError},
    role::{DeviceRole, EndDevice, Gateway},
};
use env_logger::Builder;
use log::{info, LevelFilter};

#[derive(Debug)]
struct AirError;

/// Frames in flight, tagged with their carrier frequency
type Air = Rc<RefCell<Vec<(u32, Vec<u8>)>>>;

struct SimRadio {
    name: &'static str,
    air: Air,
    frequency: u32,
    inbox: VecDeque<Vec<u8>>,
}

impl SimRadio {
    fn new(name: &'static str, air: Air) -> Self {
        Self {
            name,
            air,
            frequency: 0,
            inbox: VecDeque::new(),
        }
    }

    /// Pick up frames sent on our frequency; returns how many arrived
    fn listen(&mut self) -> usize {
        let mut air = self.air.borrow_mut();
        let before = self.inbox.len();
        let frequency = self.frequency;
        air.retain(|(freq, frame)| {
            if *freq == frequency {
                self.inbox.push_back(frame.clone());
                false
            } else {
                true
            }
        });
        self.inbox.len() - before
    }
}

impl Radio for SimRadio {
    type Error = AirError;

    fn set_frequency(&mut self, freq: u32) -> Result<(), Self::Error> {
        self.frequency = freq;
        Ok(())
    }

    fn transmit(&mut self, buffer: &[u8]) -> Result<(), Self::Error> {
        info!("{} -> {} Hz: {:02X?}", self.name, self.frequency, buffer);
        self.air.borrow_mut().push((self.frequency, buffer.to_vec()));
        Ok(())
    }

    fn start_receive(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn read_received(&mut self, buffer: &mut [u8]) -> Result<usize, ReceiveError<Self::Error>> {
        let frame = self.inbox.pop_front().ok_or(ReceiveError::Timeout)?;
        let len = frame.len().min(buffer.len());
        buffer[..len].copy_from_slice(&frame[..len]);
        Ok(len)
    }

    fn get_rssi(&mut self) -> Result<i16, Self::Error> {
        Ok(-60)
    }
}

/// Deliver pending frames to `role` and run its loop until idle
fn settle<D: DeviceRole<SimRadio>>(role: &mut D) {
    let mut queue: EventQueue<8> = EventQueue::new();
    let (mut irq, mut events) = events::split(&mut queue);
    for _ in 0..role.arbiter_mut().radio_mut().listen() {
        irq.signal(Event::PacketReady);
    }
    while let Ok(outcome) = role.poll(&mut events) {
        info!("  {:?}", outcome);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    Builder::new().filter_level(LevelFilter::Trace).init();

    let air: Air = Rc::new(RefCell::new(Vec::new()));
    let name = NetworkName::new("jamnet-sim").map_err(|e| e.to_string())?;

    let mut gateway = Gateway::new(
        SimRadio::new("gateway", air.clone()),
        DeviceConfig::new_gateway(0xCAFE, name),
    );
    let mut alice = EndDevice::new(
        SimRadio::new("alice", air.clone()),
        DeviceConfig::new_end_device(0x0001),
    );
    let mut bob = EndDevice::new(
        SimRadio::new("bob", air),
        DeviceConfig::new_end_device(0x0002).with_default_target(0x0001),
    );
    gateway.start().map_err(|e| e.to_string())?;
    alice.start().map_err(|e| e.to_string())?;
    bob.start().map_err(|e| e.to_string())?;

    alice.scan().map_err(|e| e.to_string())?;
    settle(&mut gateway);
    settle(&mut alice);

    for device in [&mut alice, &mut bob] {
        device.join().map_err(|e| e.to_string())?;
        settle(&mut gateway);
        settle(device);
    }

    bob.user_transmit_request(App::HelloWorld, b"hello alice")
        .map_err(|e| e.to_string())?;
    settle(&mut gateway);
    settle(&mut bob);

    alice.request_data().map_err(|e| e.to_string())?;
    settle(&mut gateway);
    settle(&mut alice);

    while let Some(message) = alice.take_message() {
        info!(
            "alice got {:?}: {}",
            message.app,
            String::from_utf8_lossy(&message.payload)
        );
    }
    Ok(())
}
