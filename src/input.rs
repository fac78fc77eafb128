use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::Duration;

/// map of characters read from the keyboard to what the chip8 might expect,
/// using the left-hand side of a qwerty keyboard to mimic the COSMAC layout:
///   1 2 3 C      1 2 3 4
///   4 5 6 D  <=  q w e r
///   7 8 9 E      a s d f
///   A 0 B F      z x c v
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00), // x
    ('1', 0x01), // 1
    ('2', 0x02), // 2
    ('3', 0x03), // 3
    ('q', 0x04), // q
    ('w', 0x05), // w
    ('e', 0x06), // e
    ('a', 0x07), // a
    ('s', 0x08), // s
    ('d', 0x09), // d
    ('z', 0x0a), // z
    ('c', 0x0b), // c
    ('4', 0x0c), // 4
    ('r', 0x0d), // r
    ('f', 0x0e), // f
    ('v', 0x0f), // v
];

/// terminals only tell us about presses (and auto-repeats), so a key counts
/// as held until this many frames pass without hearing about it again
const KEY_HOLD_FRAMES: u8 = 6;

/// something the host wants the interpreter (or itself) to do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// hex key, pressed or released
    Key(u8, bool),
    Quit,
    TogglePause,
    SpeedUp,
    SlowDown,
    Restart,
    ToggleWrap,
    ToggleKeepIndex,
}

/// reads keypresses and operator commands
pub trait Input {
    /// everything that happened since the last poll; never blocks
    fn poll(&mut self) -> Result<Vec<HostEvent>, io::Error>;
}

/// turns a stream of "key seen" notifications into press/release edges
struct KeyHold {
    frames_left: [u8; 16],
}

impl KeyHold {
    fn new() -> Self {
        KeyHold {
            frames_left: [0; 16],
        }
    }

    /// `seen` holds the keys reported this frame
    fn update(&mut self, seen: &[u8], events: &mut Vec<HostEvent>) {
        let mut refreshed = [false; 16];
        for &key in seen {
            let k = (key & 0xf) as usize;
            if self.frames_left[k] == 0 {
                events.push(HostEvent::Key(k as u8, true));
            }
            self.frames_left[k] = KEY_HOLD_FRAMES;
            refreshed[k] = true;
        }
        for (k, left) in self.frames_left.iter_mut().enumerate() {
            if *left > 0 && !refreshed[k] {
                *left -= 1;
                if *left == 0 {
                    events.push(HostEvent::Key(k as u8, false));
                }
            }
        }
    }
}

/// simple implementation of Input, using the terminal via crossterm
pub struct StdinInput {
    keymap: HashMap<char, u8>,
    held: KeyHold,
}

impl StdinInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            held: KeyHold::new(),
        })
    }
}

fn map_key(keymap: &HashMap<char, u8>, code: KeyCode, modifiers: KeyModifiers) -> Option<Mapped> {
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Mapped::Command(HostEvent::Quit))
        }
        KeyCode::Char(c) => match keymap.get(&c.to_ascii_lowercase()) {
            Some(&key) => Some(Mapped::Key(key)),
            None => match c {
                ' ' => Some(Mapped::Command(HostEvent::TogglePause)),
                '+' | '=' => Some(Mapped::Command(HostEvent::SpeedUp)),
                '-' | '_' => Some(Mapped::Command(HostEvent::SlowDown)),
                _ => None,
            },
        },
        KeyCode::Esc => Some(Mapped::Command(HostEvent::Quit)),
        KeyCode::Backspace => Some(Mapped::Command(HostEvent::Restart)),
        KeyCode::F(1) => Some(Mapped::Command(HostEvent::ToggleWrap)),
        KeyCode::F(2) => Some(Mapped::Command(HostEvent::ToggleKeepIndex)),
        _ => None,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Mapped {
    Key(u8),
    Command(HostEvent),
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for StdinInput {
    fn poll(&mut self) -> Result<Vec<HostEvent>, io::Error> {
        let mut events = Vec::new();
        let mut seen = Vec::new();
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                match map_key(&self.keymap, evt.code, evt.modifiers) {
                    Some(Mapped::Key(key)) => seen.push(key),
                    Some(Mapped::Command(cmd)) => events.push(cmd),
                    None => debug!("can't map {:?} to a COSMAC key", evt.code),
                }
            }
        }
        self.held.update(&seen, &mut events);
        Ok(events)
    }
}

/// scripted Input for testing; each poll hands out the next frame's events
pub struct DummyInput {
    frames: VecDeque<Vec<HostEvent>>,
}

impl DummyInput {
    pub fn new(frames: Vec<Vec<HostEvent>>) -> Self {
        DummyInput {
            frames: frames.into(),
        }
    }
}

impl Input for DummyInput {
    fn poll(&mut self) -> Result<Vec<HostEvent>, io::Error> {
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keymap_covers_every_key() {
        let mut keys: Vec<u8> = CHIP8_CONVENTIONAL_KEYMAP.iter().map(|&(_, k)| k).collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_map_keys_and_commands() {
        let keymap = HashMap::from(CHIP8_CONVENTIONAL_KEYMAP);
        let none = KeyModifiers::NONE;
        assert_eq!(map_key(&keymap, KeyCode::Char('v'), none), Some(Mapped::Key(0xf)));
        assert_eq!(map_key(&keymap, KeyCode::Char('Q'), KeyModifiers::SHIFT), Some(Mapped::Key(0x4)));
        assert_eq!(
            map_key(&keymap, KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(Mapped::Command(HostEvent::Quit))
        );
        assert_eq!(
            map_key(&keymap, KeyCode::Char(' '), none),
            Some(Mapped::Command(HostEvent::TogglePause))
        );
        assert_eq!(
            map_key(&keymap, KeyCode::F(2), none),
            Some(Mapped::Command(HostEvent::ToggleKeepIndex))
        );
        assert_eq!(map_key(&keymap, KeyCode::Char('p'), none), None);
    }

    #[test]
    fn test_hold_press_then_release() {
        let mut hold = KeyHold::new();
        let mut events = Vec::new();
        hold.update(&[0x5], &mut events);
        assert_eq!(events, vec![HostEvent::Key(5, true)]);

        // auto-repeat keeps it held without a second press
        events.clear();
        hold.update(&[0x5], &mut events);
        assert!(events.is_empty());

        for _ in 0..KEY_HOLD_FRAMES - 1 {
            hold.update(&[], &mut events);
        }
        assert!(events.is_empty());
        hold.update(&[], &mut events);
        assert_eq!(events, vec![HostEvent::Key(5, false)]);
    }

    #[test]
    fn test_dummy_input_replays_frames() -> Result<(), io::Error> {
        let mut input = DummyInput::new(vec![vec![HostEvent::Key(1, true)], vec![HostEvent::Quit]]);
        assert_eq!(input.poll()?, vec![HostEvent::Key(1, true)]);
        assert_eq!(input.poll()?, vec![HostEvent::Quit]);
        assert!(input.poll()?.is_empty());
        Ok(())
    }
}
