use beep::beep;
use log::warn;
use std::error::Error;

pub trait Sound {
    fn beep(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// the interpreter only says "beep now", so hold the tone for a few frames
const BEEP_FRAMES: u8 = 4;

pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        if !self.is_beeping {
            beep(SIMPLEBEEP_PITCH)?;
            self.is_beeping = true;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_beeping {
            beep(0)?;
            self.is_beeping = false;
        }
        Ok(())
    }
}

pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Default for Mute {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

/// Turns the per-frame beep signal into a tone of fixed length. If the sound
/// device fails (no console access is common) it logs once and goes quiet
/// rather than stopping the emulator.
pub struct Beeper<'a> {
    sound: &'a mut dyn Sound,
    frames_left: u8,
    broken: bool,
}

impl<'a> Beeper<'a> {
    pub fn new(sound: &'a mut dyn Sound) -> Self {
        Beeper {
            sound,
            frames_left: 0,
            broken: false,
        }
    }

    /// call once per frame with whether the interpreter asked for a beep
    pub fn frame(&mut self, beep_due: bool) {
        if beep_due {
            if self.frames_left == 0 {
                self.guard(|s| s.beep());
            }
            self.frames_left = BEEP_FRAMES;
        } else if self.frames_left > 0 {
            self.frames_left -= 1;
            if self.frames_left == 0 {
                self.guard(|s| s.stop());
            }
        }
    }

    /// silence immediately, e.g. on pause or quit
    pub fn silence(&mut self) {
        if self.frames_left > 0 {
            self.frames_left = 0;
            self.guard(|s| s.stop());
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.frames_left > 0
    }

    fn guard(&mut self, f: impl FnOnce(&mut dyn Sound) -> Result<(), Box<dyn Error>>) {
        if self.broken {
            return;
        }
        if let Err(e) = f(&mut *self.sound) {
            warn!("sound device failed, muting: {}", e);
            self.broken = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail: bool,
    }

    impl Sound for Recorder {
        fn beep(&mut self) -> Result<(), Box<dyn Error>> {
            self.calls.push("beep");
            if self.fail {
                return Err("no console".into());
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<(), Box<dyn Error>> {
            self.calls.push("stop");
            Ok(())
        }
    }

    #[test]
    fn test_beep_holds_then_stops() {
        let mut rec = Recorder::default();
        {
            let mut b = Beeper::new(&mut rec);
            b.frame(true);
            assert!(b.is_sounding());
            for _ in 0..BEEP_FRAMES {
                b.frame(false);
            }
            assert!(!b.is_sounding());
        }
        assert_eq!(rec.calls, vec!["beep", "stop"]);
    }

    #[test]
    fn test_repeated_beeps_extend_tone() {
        let mut rec = Recorder::default();
        {
            let mut b = Beeper::new(&mut rec);
            b.frame(true);
            b.frame(false);
            b.frame(true);
            b.silence();
        }
        assert_eq!(rec.calls, vec!["beep", "stop"]);
    }

    #[test]
    fn test_broken_device_goes_quiet() {
        let mut rec = Recorder {
            fail: true,
            ..Recorder::default()
        };
        {
            let mut b = Beeper::new(&mut rec);
            b.frame(true);
            b.silence();
            b.frame(true);
        }
        assert_eq!(rec.calls, vec!["beep"]);
    }

    #[test]
    fn test_mute_is_silent() {
        let mut m = Mute::new();
        assert!(m.beep().is_ok());
        assert!(m.stop().is_ok());
    }
}
