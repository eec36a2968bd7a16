use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use lockstep_vram::{CommandEngine, VdpTime, Vram, VramObserver, Window};
use pretty_assertions::assert_eq;

fn t(ticks: u64) -> VdpTime {
    VdpTime::from_ticks(ticks)
}

/// Command engine replaying a fixed list of timed writes.
#[derive(Default)]
struct ScriptedEngine {
    writes: VecDeque<(VdpTime, u32, u8)>,
    synced_to: Vec<VdpTime>,
}

impl CommandEngine for ScriptedEngine {
    fn sync(&mut self, vram: &mut Vram, time: VdpTime) -> lockstep_vram::Result<()> {
        self.synced_to.push(time);
        while let Some(&(at, address, value)) = self.writes.front() {
            if at > time {
                break;
            }
            self.writes.pop_front();
            vram.cmd_write(address, value, at)?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    seen: Vec<(u32, u8, VdpTime)>,
}

impl VramObserver for Recorder {
    fn update_vram(&mut self, address: u32, value: u8, time: VdpTime) {
        self.seen.push((address, value, time));
    }
}

fn window(base_mask: u32, index_bits: u32) -> Window {
    let mut w = Window::new();
    w.set_mask(base_mask, index_bits);
    w
}

fn setup(writes: &[(u64, u32, u8)]) -> (Vram, Rc<RefCell<ScriptedEngine>>) {
    let engine = Rc::new(RefCell::new(ScriptedEngine {
        writes: writes.iter().map(|&(at, a, v)| (t(at), a, v)).collect(),
        ..ScriptedEngine::default()
    }));
    let mut vram = Vram::new(0x20000);
    vram.set_command_engine(Box::new(engine.clone()));
    (vram, engine)
}

#[test]
fn cpu_read_inside_command_write_window_sees_engine_writes() {
    let (mut vram, engine) = setup(&[(5, 0x0100, 0x11), (50, 0x0101, 0x22)]);
    *vram.cmd_write_window_mut() = window(0x3FFF, 14);

    assert_eq!(vram.cpu_read(0x0100, t(10)).unwrap(), 0x11);
    assert_eq!(engine.borrow().synced_to, vec![t(10)]);
    assert_eq!(vram.read(0x0101).unwrap(), 0);
    assert_eq!(vram.current_time(), t(5));
}

#[test]
fn cpu_read_outside_command_write_window_does_not_sync() {
    let (mut vram, engine) = setup(&[(5, 0x0100, 0x11)]);
    *vram.cmd_write_window_mut() = window(0x3FFF, 14);
    *vram.cmd_read_window_mut() = window(0x7FFF, 14);

    assert_eq!(vram.cpu_read(0x4000, t(10)).unwrap(), 0);
    assert!(engine.borrow().synced_to.is_empty());
    assert_eq!(vram.read(0x0100).unwrap(), 0);
}

#[test]
fn cpu_write_into_command_read_window_lets_engine_finish_first() {
    // The engine writes the same byte before the CPU does; the CPU's later value must win.
    let (mut vram, engine) = setup(&[(5, 0x4000, 0x11)]);
    *vram.cmd_read_window_mut() = window(0x7FFF, 14);

    vram.cpu_write(0x4000, 0x99, t(10)).unwrap();
    assert_eq!(engine.borrow().synced_to, vec![t(10)]);
    assert_eq!(vram.read(0x4000).unwrap(), 0x99);
    assert_eq!(vram.current_time(), t(10));
}

#[test]
fn cpu_write_outside_engine_windows_skips_sync() {
    let (mut vram, engine) = setup(&[(5, 0x0000, 0x11)]);
    *vram.cmd_write_window_mut() = window(0x3FFF, 14);

    vram.cpu_write(0x8000, 0x99, t(10)).unwrap();
    assert!(engine.borrow().synced_to.is_empty());
    assert_eq!(vram.read(0x8000).unwrap(), 0x99);
}

#[test]
fn observers_are_notified_only_inside_their_window_before_commit() {
    let (mut vram, _engine) = setup(&[(3, 0x0010, 0xAA), (4, 0x4010, 0xBB)]);
    *vram.cmd_write_window_mut() = window(0x1FFFF, 17);

    let names = Rc::new(RefCell::new(Recorder::default()));
    let sprites = Rc::new(RefCell::new(Recorder::default()));
    vram.add_observer(window(0x3FFF, 14), Box::new(names.clone()));
    let sprite_id = vram.add_observer(Window::new(), Box::new(sprites.clone()));

    vram.sync(t(8)).unwrap();
    vram.cpu_write(0x0020, 0xCC, t(9)).unwrap();

    assert_eq!(
        names.borrow().seen,
        vec![(0x0010, 0xAA, t(3)), (0x0020, 0xCC, t(9))]
    );
    assert!(sprites.borrow().seen.is_empty());

    vram.observer_window_mut(sprite_id)
        .unwrap()
        .set_mask(0x7FFF, 14);
    vram.cpu_write(0x4001, 0xDD, t(12)).unwrap();
    assert_eq!(sprites.borrow().seen, vec![(0x4001, 0xDD, t(12))]);
    assert_eq!(names.borrow().seen.len(), 2);
}

#[test]
fn engine_writes_reach_vram_in_time_order_across_syncs() {
    let (mut vram, engine) = setup(&[(2, 0x10, 1), (6, 0x11, 2), (9, 0x12, 3)]);
    *vram.cmd_write_window_mut() = window(0x3FFF, 14);

    vram.sync(t(5)).unwrap();
    assert_eq!(vram.current_time(), t(2));
    vram.sync(t(9)).unwrap();
    assert_eq!(vram.current_time(), t(9));
    assert_eq!(
        (0x10..=0x12).map(|a| vram.read(a).unwrap()).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(engine.borrow().writes.is_empty());
}
