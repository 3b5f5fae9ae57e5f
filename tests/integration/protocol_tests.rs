//! Bus-level tests: frames through the transport pump into the service,
//! and status replies back out.

use std::collections::VecDeque;

use crate::mock_hw::{MockHardware, RadioCall, Rig};

use clocksync::app::commands::Command;
use clocksync::fsm::StateId;
use clocksync::protocol::{BusTransport, checksum, encode_command, pump};

/// Host side of the bus, scripted.
#[derive(Default)]
struct HostBus {
    writes: VecDeque<Vec<u8>>,
    staged_reply: Option<Vec<u8>>,
}

impl HostBus {
    fn write(&mut self, frame: &[u8]) {
        self.writes.push_back(frame.to_vec());
    }
}

impl BusTransport for HostBus {
    type Error = ();

    fn receive_frame(&mut self, buf: &mut [u8]) -> Result<Option<usize>, ()> {
        Ok(self.writes.pop_front().map(|f| {
            let n = f.len().min(buf.len());
            buf[..n].copy_from_slice(&f[..n]);
            n
        }))
    }

    fn send_frame(&mut self, frame: &[u8]) -> Result<(), ()> {
        self.staged_reply = Some(frame.to_vec());
        Ok(())
    }
}

#[test]
fn encoded_commands_drive_the_service() {
    let mut rig = Rig::new(MockHardware::new());
    let mut bus = HostBus::default();

    bus.write(&encode_command(&Command::EnableProvisioning { enable: true }));
    assert_eq!(pump(&rig.link, &mut bus), Ok(1));
    rig.tick();
    assert_eq!(rig.app.state(), StateId::Provisioning);

    bus.write(&encode_command(&Command::poll_time(30, 120)));
    pump(&rig.link, &mut bus).unwrap();
    rig.tick();
    assert_eq!(rig.app.state(), StateId::Syncing);
    let session = rig.app.session().unwrap();
    assert_eq!((session.timeout_secs, session.validity_secs), (30, 120));

    bus.write(&encode_command(&Command::ResetSettings));
    pump(&rig.link, &mut bus).unwrap();
    rig.tick();
    assert_eq!(rig.app.state(), StateId::Syncing);
}

#[test]
fn staged_reply_tracks_published_status() {
    let mut rig = Rig::new(MockHardware::new());
    let mut bus = HostBus::default();

    pump(&rig.link, &mut bus).unwrap();
    let idle = bus.staged_reply.clone().unwrap();
    assert_eq!(idle.len(), 5);
    assert_eq!(idle[0], 0);

    rig.send_and_tick(&[1, 10, 0, 10, 0, 21]);
    pump(&rig.link, &mut bus).unwrap();
    let syncing = bus.staged_reply.clone().unwrap();
    assert_eq!(syncing[0], 0b10);
    assert_eq!(syncing[4], checksum(&syncing[..4]));
}

#[test]
fn status_read_is_pure() {
    let mut rig = Rig::new(MockHardware::new());
    rig.send_and_tick(&[0, 1, 1]);
    rig.hw.clear_calls();

    let first = rig.read_status();
    for _ in 0..10 {
        assert_eq!(rig.read_status(), first);
    }
    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert!(rig.hw.calls.is_empty());
}

#[test]
fn garbage_between_valid_frames_is_skipped() {
    let mut rig = Rig::new(MockHardware::new());
    let mut bus = HostBus::default();

    bus.write(&[0xFF; 12]);
    bus.write(&[0, 1, 1]);
    bus.write(&[]);
    assert_eq!(pump(&rig.link, &mut bus), Ok(3));
    rig.tick();

    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert_eq!(rig.link.rejected_frames(), 2);
}

#[test]
fn pump_thread_runs_beside_control_loop() {
    const GARBAGE: usize = 200;
    let mut rig = Rig::new(MockHardware::new());
    let Rig { app, hw, link, sink } = &mut rig;
    let link = &*link;

    std::thread::scope(|s| {
        let pump_thread = s.spawn(move || {
            let mut bus = HostBus::default();
            bus.write(&[0, 1, 1]);
            for i in 0..GARBAGE {
                bus.write(&[0xA5, i as u8]);
                pump(link, &mut bus).unwrap();
                let reply = bus.staged_reply.take().unwrap();
                assert_eq!(reply[4], checksum(&reply[..4]), "torn status frame");
            }
        });
        while !pump_thread.is_finished() {
            app.tick(hw, link, sink);
        }
    });
    rig.tick();

    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert_eq!(rig.hw.count(&RadioCall::ApStart), 1);
    assert_eq!(rig.link.rejected_frames() as usize, GARBAGE);
}
