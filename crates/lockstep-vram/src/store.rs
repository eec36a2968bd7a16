use crate::{CommandEngine, Result, VdpTime, VramError, VramObserver, Window};

/// Handle for an observer added with [`Vram::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

struct Observer {
    window: Window,
    observer: Box<dyn VramObserver>,
}

#[inline]
fn planar_remap(address: u32) -> u32 {
    ((address << 16) | (address >> 1)) & 0x1FFFF
}

/// The VRAM contents plus the windows of everyone who depends on them.
pub struct Vram {
    data: Box<[u8]>,
    planar: bool,
    current_time: VdpTime,
    cmd_read_window: Window,
    cmd_write_window: Window,
    /// `None` while the engine is being synced.
    engine: Option<Box<dyn CommandEngine>>,
    observers: Vec<Observer>,
}

impl std::fmt::Debug for Vram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vram")
            .field("size", &self.data.len())
            .field("planar", &self.planar)
            .field("current_time", &self.current_time)
            .field("cmd_read_window", &self.cmd_read_window)
            .field("cmd_write_window", &self.cmd_write_window)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Vram {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size].into_boxed_slice(),
            planar: false,
            current_time: VdpTime::ZERO,
            cmd_read_window: Window::new(),
            cmd_write_window: Window::new(),
            engine: None,
            observers: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The instant of the last committed write.
    pub fn current_time(&self) -> VdpTime {
        self.current_time
    }

    pub fn set_command_engine(&mut self, engine: Box<dyn CommandEngine>) {
        self.engine = Some(engine);
    }

    /// Addresses the command engine may read while executing its current command.
    pub fn cmd_read_window_mut(&mut self) -> &mut Window {
        &mut self.cmd_read_window
    }

    /// Addresses the command engine may write while executing its current command.
    pub fn cmd_write_window_mut(&mut self) -> &mut Window {
        &mut self.cmd_write_window
    }

    pub fn add_observer(&mut self, window: Window, observer: Box<dyn VramObserver>) -> ObserverId {
        self.observers.push(Observer { window, observer });
        ObserverId(self.observers.len() - 1)
    }

    pub fn observer_window_mut(&mut self, id: ObserverId) -> Option<&mut Window> {
        self.observers.get_mut(id.0).map(|o| &mut o.window)
    }

    pub fn set_planar(&mut self, planar: bool) {
        self.planar = planar;
    }

    pub fn is_planar(&self) -> bool {
        self.planar
    }

    /// Brings the command engine up to `time`.
    ///
    /// Does nothing when called from within the engine's own sync.
    pub fn sync(&mut self, time: VdpTime) -> Result<()> {
        let Some(mut engine) = self.engine.take() else {
            return Ok(());
        };
        let result = engine.sync(self, time);
        self.engine = Some(engine);
        result
    }

    /// CPU write. Syncs the command engine first if it may read or write `address`.
    pub fn cpu_write(&mut self, address: u32, value: u8, time: VdpTime) -> Result<()> {
        if self.cmd_read_window.is_inside(address) || self.cmd_write_window.is_inside(address) {
            tracing::trace!(address, %time, "cpu write syncs command engine");
            self.sync(time)?;
        }
        let address = self.map(address);
        self.cmd_write(address, value, time)
    }

    /// CPU read. Syncs the command engine first if it may write `address`.
    pub fn cpu_read(&mut self, address: u32, time: VdpTime) -> Result<u8> {
        if self.cmd_write_window.is_inside(address) {
            tracing::trace!(address, %time, "cpu read syncs command engine");
            self.sync(time)?;
        }
        self.read(address)
    }

    /// Commits one byte at a physical address, notifying affected observers first.
    pub fn cmd_write(&mut self, address: u32, value: u8, time: VdpTime) -> Result<()> {
        if time < self.current_time {
            return Err(VramError::TimeWentBackwards {
                current: self.current_time,
                requested: time,
            });
        }
        let index = self.index(address)?;
        for entry in &mut self.observers {
            if entry.window.is_inside(address) {
                entry.observer.update_vram(address, value, time);
            }
        }
        self.data[index] = value;
        self.current_time = time;
        Ok(())
    }

    /// Reads the current contents, applying planar remapping if enabled.
    pub fn read(&self, address: u32) -> Result<u8> {
        let index = self.index(self.map(address))?;
        Ok(self.data[index])
    }

    /// Reads entry `index` of the table described by `window`, without planar remapping.
    ///
    /// Index bits the table does not use must be set to 1.
    pub fn read_np(&self, window: &Window, index: u32) -> Result<u8> {
        let mask = window.mask().ok_or(VramError::WindowDisabled)?;
        let index = self.index(mask & index)?;
        Ok(self.data[index])
    }

    fn map(&self, address: u32) -> u32 {
        if self.planar {
            planar_remap(address)
        } else {
            address
        }
    }

    fn index(&self, address: u32) -> Result<usize> {
        let index = address as usize;
        if index < self.data.len() {
            Ok(index)
        } else {
            Err(VramError::OutOfBounds {
                address,
                size: self.data.len(),
            })
        }
    }
}
