/// display dimensions in CHIP-8 pixels
pub const CHIP8_SCREEN_WIDTH: usize = 64;
pub const CHIP8_SCREEN_HEIGHT: usize = 32;

/// 64x32 monochrome screen, one byte (0 or 1) per pixel, row-major
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: Box<[u8]>,
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: vec![0u8; CHIP8_SCREEN_WIDTH * CHIP8_SCREEN_HEIGHT].into_boxed_slice(),
        }
    }

    pub fn width(&self) -> usize {
        CHIP8_SCREEN_WIDTH
    }

    pub fn height(&self) -> usize {
        CHIP8_SCREEN_HEIGHT
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// pixel value at (x, y); panics off-screen like slice indexing
    pub fn get(&self, x: usize, y: usize) -> u8 {
        assert!(x < CHIP8_SCREEN_WIDTH && y < CHIP8_SCREEN_HEIGHT);
        self.pixels[x + CHIP8_SCREEN_WIDTH * y]
    }

    /// XOR a lit sprite pixel onto the screen; true if it turned a pixel off
    pub(crate) fn flip(&mut self, x: usize, y: usize) -> bool {
        let px = &mut self.pixels[x + CHIP8_SCREEN_WIDTH * y];
        let collided = *px == 1;
        *px ^= 1;
        collided
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }

    /// iterate over the coordinates of every lit pixel
    pub fn lit(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pixels
            .iter()
            .enumerate()
            .filter(|&(_, &px)| px == 1)
            .map(|(i, _)| (i % CHIP8_SCREEN_WIDTH, i / CHIP8_SCREEN_WIDTH))
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Framebuffer {
    /// ascii-art dump; useful when a test fails
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.pixels.chunks(CHIP8_SCREEN_WIDTH) {
            let line: String = row.iter().map(|&px| if px == 1 { '#' } else { '.' }).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_blank() {
        let fb = Framebuffer::new();
        assert_eq!(fb.as_slice().len(), 2048);
        assert_eq!(fb.lit().count(), 0);
    }

    #[test]
    fn test_flip_reports_collision() {
        let mut fb = Framebuffer::new();
        assert!(!fb.flip(3, 2));
        assert_eq!(fb.get(3, 2), 1);
        assert_eq!(fb.as_slice()[3 + 64 * 2], 1);
        assert!(fb.flip(3, 2));
        assert_eq!(fb.get(3, 2), 0);
    }

    #[test]
    fn test_lit_coords() {
        let mut fb = Framebuffer::new();
        fb.flip(0, 0);
        fb.flip(63, 31);
        assert_eq!(fb.lit().collect::<Vec<_>>(), vec![(0, 0), (63, 31)]);
        fb.clear();
        assert_eq!(fb.lit().count(), 0);
    }
}
