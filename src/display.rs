use crate::framebuffer::Framebuffer;
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders, Paragraph};
use tui::Terminal;

/// Display is used by the host to put the interpreter's framebuffer on a
/// screen. It should abstract the implementation details, so a variety of
/// kinds of screen would work.
pub trait Display {
    /// draw the framebuffer plus a one-line operator status
    fn draw(&mut self, framebuffer: &Framebuffer, status: &str) -> Result<(), io::Error>;
}

// store useful metadata about the emulated screen
struct Resolution(usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coords of every pixel with the given value; y grows downward
    /// on the chip-8 but upward on the canvas
    fn bitplane<'a>(
        &self,
        framebuffer: &'a Framebuffer,
        bitplane: u8,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let w = self.0;
        framebuffer
            .as_slice()
            .iter()
            .enumerate()
            .filter(move |&(_, &px)| px == bitplane)
            .map(move |(i, _)| ((i % w) as f64, -1.0 * (i / w) as f64))
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new(x: usize, y: usize) -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(x, y),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, framebuffer: &Framebuffer, status: &str) -> Result<(), io::Error> {
        // make sure we're given a screen of the size we were built for
        assert_eq!(
            (framebuffer.width(), framebuffer.height()),
            (self.resolution.0, self.resolution.1),
            "MonoTermDisplay must have correct-sized data to draw"
        );

        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        let resolution = &self.resolution;
        self.terminal.draw(|f| {
            let area = f.size();
            let screen = Rect::new(0, 0, 2 + resolution.0 as u16, 2 + resolution.1 as u16)
                .intersection(area);
            let status_line = Rect::new(0, screen.height, screen.width, 1).intersection(area);

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &resolution.bitplane(framebuffer, 0).collect::<Vec<_>>(),
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &resolution.bitplane(framebuffer, 1).collect::<Vec<_>>(),
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, screen);
            f.render_widget(Paragraph::new(status), status_line);
        })?;
        Ok(())
    }
}

/// useful for testing the host loop without a terminal
pub struct DummyDisplay {
    pub frames: usize,
    pub last_lit: usize,
    pub last_status: String,
}

impl DummyDisplay {
    pub fn new() -> Self {
        DummyDisplay {
            frames: 0,
            last_lit: 0,
            last_status: String::new(),
        }
    }
}

impl Default for DummyDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, framebuffer: &Framebuffer, status: &str) -> Result<(), io::Error> {
        self.frames += 1;
        self.last_lit = framebuffer.lit().count();
        self.last_status = status.to_string();
        Ok(())
    }
}
