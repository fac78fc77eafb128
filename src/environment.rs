/// # environment
///
/// Owns the host side of the loop: once a frame it polls input, feeds keys
/// and operator commands to the interpreter, runs one tick, plays the beep
/// and redraws when something changed, then sleeps out the rest of the frame.
use crate::compat::Quirks;
use crate::display::Display;
use crate::input::{HostEvent, Input};
use crate::interpreter::Chip8Interpreter;
use crate::sound::{Beeper, Sound};
use log::info;
use std::error::Error;
use std::time::{Duration, Instant};

/// chip-8 timers count at 60Hz, so that's our frame rate
pub const FRAMES_PER_SECOND: u32 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Environment<'a> {
    interpreter: &'a mut Chip8Interpreter,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    beeper: Beeper<'a>,
    frame_time: Duration,
    last_status: Option<String>,
}

impl<'a> Environment<'a> {
    pub fn new(
        interpreter: &'a mut Chip8Interpreter,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
    ) -> Self {
        Environment {
            interpreter,
            display,
            input,
            beeper: Beeper::new(sound),
            frame_time: Duration::from_secs(1) / FRAMES_PER_SECOND,
            last_status: None,
        }
    }

    /// run at 60 frames a second until the operator quits or `max_frames`
    /// have gone by; returns the number of frames run
    pub fn main_loop(&mut self, max_frames: Option<u64>) -> Result<u64, Box<dyn Error>> {
        let mut frames = 0;
        while max_frames.map_or(true, |max| frames < max) {
            let start = Instant::now();
            frames += 1;
            if self.frame()? == Flow::Quit {
                break;
            }
            if let Some(rest) = self.frame_time.checked_sub(start.elapsed()) {
                spin_sleep::sleep(rest);
            }
        }
        self.beeper.silence();
        Ok(frames)
    }

    /// one frame, without any sleeping
    pub fn frame(&mut self) -> Result<Flow, Box<dyn Error>> {
        for event in self.input.poll()? {
            if self.handle(event)? == Flow::Quit {
                info!("quit requested");
                return Ok(Flow::Quit);
            }
        }

        let tick = self.interpreter.tick();
        if self.interpreter.is_paused() {
            self.beeper.silence();
        } else {
            self.beeper.frame(tick.beep);
        }

        let status = self.status();
        let status_changed = self.last_status.as_deref() != Some(status.as_str());
        if self.interpreter.should_redraw() || status_changed {
            self.display.draw(self.interpreter.framebuffer(), &status)?;
            self.last_status = Some(status);
        }
        Ok(Flow::Continue)
    }

    fn handle(&mut self, event: HostEvent) -> Result<Flow, Box<dyn Error>> {
        let i = &mut *self.interpreter;
        match event {
            HostEvent::Key(key, pressed) => i.set_key(key, pressed),
            HostEvent::Quit => return Ok(Flow::Quit),
            HostEvent::TogglePause => i.toggle_pause(),
            HostEvent::SpeedUp => i.speed_up(),
            HostEvent::SlowDown => i.slow_down(),
            HostEvent::Restart => {
                info!("restarting");
                i.restart()?;
            }
            HostEvent::ToggleWrap => {
                let q = i.quirks();
                i.set_quirks(Quirks {
                    wrap_sprites: !q.wrap_sprites,
                    ..q
                });
            }
            HostEvent::ToggleKeepIndex => {
                let q = i.quirks();
                i.set_quirks(Quirks {
                    keep_index_on_transfer: !q.keep_index_on_transfer,
                    ..q
                });
            }
        }
        Ok(Flow::Continue)
    }

    fn status(&self) -> String {
        let i = &*self.interpreter;
        let q = i.quirks();
        format!(
            "{} | {}/frame | wrap {} | keep-I {}{}",
            i.title().unwrap_or("?"),
            i.configured_instructions_per_tick(),
            if q.wrap_sprites { "on" } else { "off" },
            if q.keep_index_on_transfer { "on" } else { "off" },
            if i.is_paused() { " | PAUSED" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::input::DummyInput;
    use crate::sound::Mute;

    fn program(ws: &[u16]) -> Chip8Interpreter {
        let bytes: Vec<u8> = ws.iter().flat_map(|w| w.to_be_bytes()).collect();
        let mut i = Chip8Interpreter::new();
        i.load_program(&bytes).unwrap();
        i
    }

    #[test]
    fn test_quit_stops_loop() -> Result<(), Box<dyn Error>> {
        let mut interpreter = program(&[0x1200]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(vec![vec![], vec![], vec![HostEvent::Quit]]);
        let mut sound = Mute::new();
        let mut env = Environment::new(&mut interpreter, &mut display, &mut input, &mut sound);
        assert_eq!(env.main_loop(Some(100))?, 3);
        Ok(())
    }

    #[test]
    fn test_redraws_only_on_change() -> Result<(), Box<dyn Error>> {
        // draw "0" once then spin
        let mut interpreter = program(&[0xa000, 0xd005, 0x1204]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(vec![]);
        let mut sound = Mute::new();
        {
            let mut env = Environment::new(&mut interpreter, &mut display, &mut input, &mut sound);
            for _ in 0..5 {
                env.frame()?;
            }
        }
        assert_eq!(display.frames, 1);
        assert_eq!(display.last_lit, 14);
        Ok(())
    }

    #[test]
    fn test_key_reaches_wait_instruction() -> Result<(), Box<dyn Error>> {
        let mut interpreter = program(&[0xf50a, 0x1202]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(vec![vec![], vec![HostEvent::Key(0xe, true)]]);
        let mut sound = Mute::new();
        {
            let mut env = Environment::new(&mut interpreter, &mut display, &mut input, &mut sound);
            env.frame()?;
            env.frame()?;
        }
        assert_eq!(interpreter.registers()[5], 0xe);
        Ok(())
    }

    #[test]
    fn test_operator_commands() -> Result<(), Box<dyn Error>> {
        let mut interpreter = program(&[0x1200]);
        interpreter.set_instructions_per_tick(10);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(vec![vec![
            HostEvent::SpeedUp,
            HostEvent::SpeedUp,
            HostEvent::SlowDown,
            HostEvent::ToggleWrap,
            HostEvent::TogglePause,
        ]]);
        let mut sound = Mute::new();
        {
            let mut env = Environment::new(&mut interpreter, &mut display, &mut input, &mut sound);
            env.frame()?;
        }
        assert!(interpreter.is_paused());
        assert_eq!(interpreter.configured_instructions_per_tick(), 11);
        assert!(interpreter.quirks().wrap_sprites);
        assert!(display.last_status.contains("PAUSED"));
        assert!(display.last_status.contains("11/frame"));
        Ok(())
    }

    #[test]
    fn test_restart_command() -> Result<(), Box<dyn Error>> {
        let mut interpreter = program(&[0x6a07, 0x1202]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(vec![vec![], vec![HostEvent::Restart]]);
        let mut sound = Mute::new();
        {
            let mut env = Environment::new(&mut interpreter, &mut display, &mut input, &mut sound);
            env.frame()?;
        }
        assert_eq!(interpreter.registers()[0xa], 7);
        {
            interpreter.set_instructions_per_tick(1);
            let mut env = Environment::new(&mut interpreter, &mut display, &mut input, &mut sound);
            env.frame()?;
        }
        // restarted, then one instruction ran
        assert_eq!(interpreter.pc(), 0x202);
        Ok(())
    }
}
