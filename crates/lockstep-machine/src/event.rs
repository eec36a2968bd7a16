use lockstep_console::HostKey;
use lockstep_events::Event;

/// Input arriving from the host side of the emulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A host key was pressed.
    Key(HostKey),
    /// A console command line was entered.
    Command(String),
    /// The host asked the emulator to stop.
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEventKind {
    Key,
    Command,
    Quit,
}

impl Event for HostEvent {
    type Kind = HostEventKind;

    fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::Key(_) => HostEventKind::Key,
            HostEvent::Command(_) => HostEventKind::Command,
            HostEvent::Quit => HostEventKind::Quit,
        }
    }
}
