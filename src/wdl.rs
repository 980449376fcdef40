use std::ops::{Add, AddAssign, Sub};

use num_traits::{AsPrimitive, One, Zero};

use crate::board::{Color, Outcome};

/// A finished game seen from one side, see [Outcome::pov].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OutcomeWDL {
    Win,
    Draw,
    Loss,
}

/// Win, draw and loss tallies of a series.
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct WDL<V> {
    pub win: V,
    pub draw: V,
    pub loss: V,
}

impl Outcome {
    pub fn pov(self, side: Color) -> OutcomeWDL {
        match self {
            Outcome::WonBy(winner) if winner == side => OutcomeWDL::Win,
            Outcome::WonBy(_) => OutcomeWDL::Loss,
            Outcome::Draw => OutcomeWDL::Draw,
        }
    }
}

impl OutcomeWDL {
    /// A tally containing only this game.
    pub fn to_wdl<V: One + Zero>(self) -> WDL<V> {
        let (win, draw, loss) = match self {
            OutcomeWDL::Win => (V::one(), V::zero(), V::zero()),
            OutcomeWDL::Draw => (V::zero(), V::one(), V::zero()),
            OutcomeWDL::Loss => (V::zero(), V::zero(), V::one()),
        };
        WDL::new(win, draw, loss)
    }
}

impl<V> WDL<V> {
    pub fn new(win: V, draw: V, loss: V) -> Self {
        WDL { win, draw, loss }
    }
}

impl<V: Copy + Add<Output = V>> WDL<V> {
    /// The number of games.
    pub fn sum(self) -> V {
        self.win + self.draw + self.loss
    }
}

impl<V: Copy + Sub<Output = V>> WDL<V> {
    pub fn value(self) -> V {
        self.win - self.loss
    }
}

impl<V: Copy + AsPrimitive<f32>> WDL<V> {
    /// Each tally as a fraction of the games played, all zero before the first game.
    pub fn fractions(self) -> WDL<f32> {
        let total = self.win.as_() + self.draw.as_() + self.loss.as_();
        if total == 0.0 {
            return WDL::default();
        }
        WDL::new(self.win.as_() / total, self.draw.as_() / total, self.loss.as_() / total)
    }
}

impl<V: Copy + Add<Output = V>> Add for WDL<V> {
    type Output = WDL<V>;

    fn add(self, rhs: WDL<V>) -> WDL<V> {
        WDL::new(self.win + rhs.win, self.draw + rhs.draw, self.loss + rhs.loss)
    }
}

impl<V: Copy + Add<Output = V>> AddAssign for WDL<V> {
    fn add_assign(&mut self, rhs: WDL<V>) {
        *self = *self + rhs;
    }
}
