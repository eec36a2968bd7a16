use std::io::{self, BufRead};

use lockstep_console::HostKey;
use lockstep_events::HostEventSource;
use lockstep_machine::HostEvent;

/// Host event source reading one event per line.
///
/// `quit` requests a stop, `key <name>` presses a host key, anything else is a console command
/// line. End of input is reported as a final [`HostEvent::Quit`].
pub struct LineSource<R> {
    reader: R,
    closed: bool,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            closed: false,
        }
    }
}

fn parse_line(line: &str) -> Option<HostEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line == "quit" {
        return Some(HostEvent::Quit);
    }
    if let Some(name) = line.strip_prefix("key ") {
        return match name.parse::<HostKey>() {
            Ok(key) => Some(HostEvent::Key(key)),
            Err(err) => {
                tracing::warn!("ignoring input: {err}");
                None
            }
        };
    }
    Some(HostEvent::Command(line.to_string()))
}

impl<R: BufRead> HostEventSource<HostEvent> for LineSource<R> {
    type Error = io::Error;

    fn wait_event(&mut self) -> io::Result<Option<HostEvent>> {
        if self.closed {
            return Ok(None);
        }
        let mut raw = Vec::new();
        loop {
            raw.clear();
            if self.reader.read_until(b'\n', &mut raw)? == 0 {
                self.closed = true;
                return Ok(Some(HostEvent::Quit));
            }
            // Undecodable input is the user's mistake, not a failure of the source.
            let line = match std::str::from_utf8(&raw) {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!("ignoring input line that is not valid UTF-8: {err}");
                    continue;
                }
            };
            if let Some(event) = parse_line(line) {
                return Ok(Some(event));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn reads_events_and_quits_at_end_of_input() {
        let input = "speed 120\n\n  key f9 \nkey space\nquit\n";
        let mut source = LineSource::new(Cursor::new(input));
        let mut events = Vec::new();
        while let Some(event) = source.wait_event().unwrap() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                HostEvent::Command("speed 120".to_string()),
                HostEvent::Key(HostKey::F(9)),
                HostEvent::Quit,
                HostEvent::Quit,
            ]
        );
        assert_eq!(source.wait_event().unwrap(), None);
    }

    #[test]
    fn invalid_utf8_lines_are_skipped() {
        let mut source = LineSource::new(Cursor::new(&b"\xffspeed\n\xfe\nspeed 120\n"[..]));
        assert_eq!(
            source.wait_event().unwrap(),
            Some(HostEvent::Command("speed 120".to_string()))
        );
        assert_eq!(source.wait_event().unwrap(), Some(HostEvent::Quit));
        assert_eq!(source.wait_event().unwrap(), None);
    }

    #[test]
    fn read_errors_are_propagated() {
        struct Broken;
        impl io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("tty went away"))
            }
        }
        let mut source = LineSource::new(io::BufReader::new(Broken));
        assert_eq!(source.wait_event().unwrap_err().to_string(), "tty went away");
    }
}
