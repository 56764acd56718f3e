use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// Highest pocket on a single-zero wheel.
pub const MAX_POCKET: u8 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Green,
    Red,
    Black,
}

impl Color {
    /// Zero is green, odd pockets are red, even pockets are black.
    pub fn of(pocket: u8) -> Self {
        if pocket == 0 {
            Color::Green
        } else if pocket % 2 == 1 {
            Color::Red
        } else {
            Color::Black
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Green => "green",
            Color::Red => "red",
            Color::Black => "black",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spin {
    pub pocket: u8,
    pub color: Color,
}

impl Spin {
    pub fn new(pocket: u8) -> Self {
        Spin {
            pocket,
            color: Color::of(pocket),
        }
    }
}

impl fmt::Display for Spin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pocket, self.color)
    }
}

/// Anything that can land the ball in a pocket in `0..=36`.
pub trait SpinSource {
    fn spin(&mut self) -> Spin;
}

pub struct Wheel<R: Rng> {
    rng: R,
}

impl<R: Rng> Wheel<R> {
    pub fn new(rng: R) -> Self {
        Wheel { rng }
    }
}

impl Wheel<StdRng> {
    /// Seeded wheels replay the same pockets; `None` seeds from the OS.
    pub fn seeded(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Wheel::new(rng)
    }
}

impl<R: Rng> SpinSource for Wheel<R> {
    fn spin(&mut self) -> Spin {
        Spin::new(self.rng.gen_range(0..=MAX_POCKET))
    }
}
