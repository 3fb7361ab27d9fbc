//! Digital rain: falling glyph columns with fading trails.

use rand::seq::SliceRandom;
use rand::Rng;

pub const DEFAULT_GLYPHS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ123456789@#$%^&*()*&^%+-/~{[|`]}";

/// Opacity of the dark overlay composited before each frame.
pub const DEFAULT_FADE: f32 = 0.04;

/// Chance per tick that a column past the bottom restarts at the top.
pub const DEFAULT_RESET_CHANCE: f64 = 0.025;

/// Cells dimmer than this are cleared.
const VISIBILITY_FLOOR: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Anything the rain can be drawn on. Coordinates are in surface units;
/// `y` is the glyph baseline.
pub trait RainSurface {
    fn size(&self) -> SurfaceSize;

    /// Composite a dark overlay of the given opacity over everything.
    fn fade(&mut self, alpha: f32);

    fn paint(&mut self, x: u32, y: u32, glyph: char);
}

pub struct RainAnimator {
    glyph_size: u32,
    glyphs: Vec<char>,
    fade: f32,
    reset_chance: f64,
    drops: Vec<u32>,
}

impl RainAnimator {
    pub fn new(glyph_size: u32) -> Self {
        Self {
            glyph_size: glyph_size.max(1),
            glyphs: DEFAULT_GLYPHS.chars().collect(),
            fade: DEFAULT_FADE,
            reset_chance: DEFAULT_RESET_CHANCE,
            drops: Vec::new(),
        }
    }

    pub fn with_glyphs(mut self, glyphs: &str) -> Self {
        if !glyphs.is_empty() {
            self.glyphs = glyphs.chars().collect();
        }
        self
    }

    pub fn with_fade(mut self, fade: f32) -> Self {
        self.fade = fade.clamp(0.0, 1.0);
        self
    }

    pub fn with_reset_chance(mut self, chance: f64) -> Self {
        self.reset_chance = chance.clamp(0.0, 1.0);
        self
    }

    /// Recompute the columns for a surface and restart every drop.
    pub fn initialize(&mut self, size: SurfaceSize) {
        let columns = (size.width / self.glyph_size) as usize;
        self.drops = vec![1; columns];
    }

    pub fn columns(&self) -> usize {
        self.drops.len()
    }

    pub fn drops(&self) -> &[u32] {
        &self.drops
    }

    pub fn glyph_size(&self) -> u32 {
        self.glyph_size
    }

    /// Draw one frame and advance every column.
    pub fn tick<S: RainSurface, R: Rng + ?Sized>(&mut self, surface: &mut S, rng: &mut R) {
        surface.fade(self.fade);

        let height = surface.size().height;
        for (i, drop) in self.drops.iter_mut().enumerate() {
            let glyph = self.glyphs.choose(rng).copied().unwrap_or(' ');
            // A drop that never resets pins at the far edge instead of wrapping.
            let y = drop.saturating_mul(self.glyph_size);
            surface.paint((i as u32).saturating_mul(self.glyph_size), y, glyph);

            if y > height && rng.gen_bool(self.reset_chance) {
                *drop = 0;
            }
            *drop = drop.saturating_add(1);
        }
    }
}

/// One character cell of a [`RainCanvas`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RainCell {
    pub glyph: char,
    /// 1.0 when freshly painted, fading toward 0.
    pub intensity: f32,
}

/// Character-cell drawing surface. One surface unit per cell.
#[derive(Debug, Clone, Default)]
pub struct RainCanvas {
    size: SurfaceSize,
    cells: Vec<Option<RainCell>>,
}

impl RainCanvas {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            cells: vec![None; (size.width * size.height) as usize],
        }
    }

    /// Reallocate for a new size. Like resizing a canvas, this clears it.
    pub fn resize(&mut self, size: SurfaceSize) {
        *self = Self::new(size);
    }

    pub fn cell(&self, col: u32, row: u32) -> Option<RainCell> {
        if col >= self.size.width || row >= self.size.height {
            return None;
        }
        self.cells[(row * self.size.width + col) as usize]
    }

    pub fn lit_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

impl RainSurface for RainCanvas {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn fade(&mut self, alpha: f32) {
        let keep = 1.0 - alpha;
        for slot in self.cells.iter_mut() {
            if let Some(cell) = slot {
                cell.intensity *= keep;
                if cell.intensity < VISIBILITY_FLOOR {
                    *slot = None;
                }
            }
        }
    }

    fn paint(&mut self, x: u32, y: u32, glyph: char) {
        // y is a baseline, so the glyph occupies the row above it.
        let Some(row) = y.checked_sub(1) else {
            return;
        };
        if x >= self.size.width || row >= self.size.height {
            return;
        }
        self.cells[(row * self.size.width + x) as usize] = Some(RainCell {
            glyph,
            intensity: 1.0,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Default)]
    struct Recording {
        size: SurfaceSize,
        fades: Vec<f32>,
        painted: Vec<(u32, u32, char)>,
    }

    impl RainSurface for Recording {
        fn size(&self) -> SurfaceSize {
            self.size
        }
        fn fade(&mut self, alpha: f32) {
            self.fades.push(alpha);
        }
        fn paint(&mut self, x: u32, y: u32, glyph: char) {
            self.painted.push((x, y, glyph));
        }
    }

    #[test]
    fn initialize_computes_columns_from_glyph_size() {
        let mut rain = RainAnimator::new(12);
        rain.initialize(SurfaceSize::new(120, 300));
        assert_eq!(rain.columns(), 10);
        assert!(rain.drops().iter().all(|&d| d == 1));

        rain.initialize(SurfaceSize::new(131, 300));
        assert_eq!(rain.columns(), 10);

        rain.initialize(SurfaceSize::new(11, 300));
        assert_eq!(rain.columns(), 0);
    }

    #[test]
    fn tick_fades_then_paints_every_column() {
        let mut rain = RainAnimator::new(12).with_glyphs("X");
        rain.initialize(SurfaceSize::new(36, 120));
        let mut surface = Recording {
            size: SurfaceSize::new(36, 120),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);

        rain.tick(&mut surface, &mut rng);

        assert_eq!(surface.fades, vec![DEFAULT_FADE]);
        assert_eq!(surface.painted, vec![(0, 12, 'X'), (12, 12, 'X'), (24, 12, 'X')]);
        assert_eq!(rain.drops(), &[2, 2, 2]);
    }

    #[test]
    fn unreset_drop_saturates_instead_of_overflowing() {
        let mut rain = RainAnimator::new(12).with_glyphs("X").with_reset_chance(0.0);
        rain.initialize(SurfaceSize::new(24, 10));
        rain.drops = vec![u32::MAX / 2, u32::MAX - 1];
        let mut surface = Recording {
            size: SurfaceSize::new(24, 10),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..3 {
            rain.tick(&mut surface, &mut rng);
        }

        assert!(surface.painted.iter().all(|&(_, y, _)| y == u32::MAX));
        assert_eq!(rain.drops(), &[u32::MAX / 2 + 3, u32::MAX]);
    }

    #[test]
    fn glyphs_come_from_the_configured_set() {
        let mut rain = RainAnimator::new(1).with_glyphs("01");
        rain.initialize(SurfaceSize::new(50, 10));
        let mut surface = Recording {
            size: SurfaceSize::new(50, 10),
            ..Default::default()
        };
        rain.tick(&mut surface, &mut StdRng::seed_from_u64(1));
        assert!(surface.painted.iter().all(|&(_, _, g)| g == '0' || g == '1'));
    }

    #[test]
    fn drops_past_bottom_restart_only_by_chance() {
        let size = SurfaceSize::new(2, 3);
        let mut rng = StdRng::seed_from_u64(3);

        let mut always = RainAnimator::new(1).with_reset_chance(1.0);
        always.initialize(size);
        let mut canvas = RainCanvas::new(size);
        for _ in 0..3 {
            always.tick(&mut canvas, &mut rng);
        }
        assert_eq!(always.drops(), &[4, 4]);
        always.tick(&mut canvas, &mut rng);
        assert_eq!(always.drops(), &[1, 1]);

        let mut never = RainAnimator::new(1).with_reset_chance(0.0);
        never.initialize(size);
        for _ in 0..10 {
            never.tick(&mut canvas, &mut rng);
        }
        assert_eq!(never.drops(), &[11, 11]);
    }

    #[test]
    fn default_reset_is_staggered() {
        let size = SurfaceSize::new(200, 5);
        let mut rain = RainAnimator::new(1);
        rain.initialize(size);
        let mut canvas = RainCanvas::new(size);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..40 {
            rain.tick(&mut canvas, &mut rng);
        }
        let first = rain.drops()[0];
        assert!(rain.drops().iter().any(|&d| d != first));
    }

    #[test]
    fn canvas_paints_above_baseline_and_fades_out() {
        let mut canvas = RainCanvas::new(SurfaceSize::new(4, 4));
        canvas.paint(2, 1, 'Z');
        assert_eq!(canvas.cell(2, 0).map(|c| c.glyph), Some('Z'));

        canvas.paint(0, 0, 'A');
        canvas.paint(9, 2, 'B');
        canvas.paint(1, 9, 'C');
        assert_eq!(canvas.lit_cells(), 1);

        canvas.fade(0.5);
        assert_eq!(canvas.cell(2, 0).map(|c| c.intensity), Some(0.5));
        for _ in 0..4 {
            canvas.fade(0.5);
        }
        assert_eq!(canvas.lit_cells(), 0);
    }

    #[test]
    fn resize_clears_canvas() {
        let mut canvas = RainCanvas::new(SurfaceSize::new(4, 4));
        canvas.paint(1, 1, 'Q');
        canvas.resize(SurfaceSize::new(8, 2));
        assert_eq!(canvas.size(), SurfaceSize::new(8, 2));
        assert_eq!(canvas.lit_cells(), 0);
    }
}
