//! Ambient feedback: small spark bursts at the cursor while typing and a
//! confetti shower with a banner when the goal is reached.
//!
//! Positions are in terminal cells. The caller advances the simulation with
//! an explicit timestep, so nothing here reads the clock.

use rand::seq::SliceRandom;
use rand::Rng;

pub const PALETTE_LEN: usize = 7;
const GRAVITY: f64 = 15.0;
const BANNER_WORDS: [&str; 5] = ["GOAL!", "DONE!", "NICE!", "BRAVO!", "YES!"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    /// Short-lived burst at the cursor
    Spark,
    /// Falls from the top edge after a goal
    Confetti,
    /// Flies to a fixed cell to spell the banner, then holds
    Banner { target_x: i32, target_y: i32 },
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub symbol: char,
    pub color_index: usize,
    pub age: f64,
    pub max_age: f64,
    pub kind: ParticleKind,
}

impl Particle {
    fn spark<R: Rng>(x: f64, y: f64, rng: &mut R) -> Self {
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let speed = rng.gen_range(3.0..7.0);
        Self {
            x,
            y,
            vel_x: angle.cos() * speed * 2.0, // cells are taller than wide
            vel_y: angle.sin() * speed,
            symbol: *['·', '*', '+', '˙'].choose(rng).unwrap_or(&'·'),
            color_index: rng.gen_range(0..PALETTE_LEN),
            age: 0.0,
            max_age: rng.gen_range(0.3..0.6),
            kind: ParticleKind::Spark,
        }
    }

    fn confetti<R: Rng>(width: f64, rng: &mut R) -> Self {
        Self {
            x: rng.gen_range(0.0..width.max(1.0)),
            y: rng.gen_range(-4.0..0.0),
            vel_x: rng.gen_range(-2.0..2.0),
            vel_y: rng.gen_range(0.0..3.0),
            symbol: *['✦', '✧', '•', '◆', '▪', '★'].choose(rng).unwrap_or(&'•'),
            color_index: rng.gen_range(0..PALETTE_LEN),
            age: 0.0,
            max_age: rng.gen_range(2.0..3.5),
            kind: ParticleKind::Confetti,
        }
    }

    fn banner<R: Rng>(symbol: char, target_x: i32, target_y: i32, from: (f64, f64), rng: &mut R) -> Self {
        Self {
            x: from.0,
            y: from.1,
            vel_x: (f64::from(target_x) - from.0) * 2.0,
            vel_y: (f64::from(target_y) - from.1) * 2.0,
            symbol,
            color_index: rng.gen_range(0..PALETTE_LEN),
            age: 0.0,
            max_age: rng.gen_range(2.5..3.5),
            kind: ParticleKind::Banner { target_x, target_y },
        }
    }

    /// Advance by `dt` seconds; false once the particle has expired
    fn update(&mut self, dt: f64) -> bool {
        match self.kind {
            ParticleKind::Banner { target_x, target_y } => {
                let (tx, ty) = (f64::from(target_x), f64::from(target_y));
                let dist = ((tx - self.x).powi(2) + (ty - self.y).powi(2)).sqrt();
                if dist > 0.5 {
                    self.x += self.vel_x * dt;
                    self.y += self.vel_y * dt;
                    self.vel_x = (tx - self.x) * 2.0;
                    self.vel_y = (ty - self.y) * 2.0;
                } else {
                    self.x = tx;
                    self.y = ty;
                }
            }
            ParticleKind::Spark | ParticleKind::Confetti => {
                self.x += self.vel_x * dt;
                self.y += self.vel_y * dt;
                let g = if self.kind == ParticleKind::Spark {
                    GRAVITY / 2.0
                } else {
                    GRAVITY / 5.0
                };
                self.vel_y += g * dt;
            }
        }
        self.age += dt;
        self.age < self.max_age
    }
}

/// All live particles over a drawing area
#[derive(Debug, Default)]
pub struct Effects {
    pub particles: Vec<Particle>,
    width: f64,
    height: f64,
}

impl Effects {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            particles: Vec::new(),
            width: f64::from(width),
            height: f64::from(height),
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = f64::from(width);
        self.height = f64::from(height);
    }

    pub fn is_active(&self) -> bool {
        !self.particles.is_empty()
    }

    pub fn is_celebrating(&self) -> bool {
        self.particles
            .iter()
            .any(|p| !matches!(p.kind, ParticleKind::Spark))
    }

    /// A handful of sparks at a cursor cell
    pub fn burst(&mut self, x: u16, y: u16) {
        let mut rng = rand::thread_rng();
        let count = rng.gen_range(3..6);
        for _ in 0..count {
            self.particles
                .push(Particle::spark(f64::from(x), f64::from(y), &mut rng));
        }
    }

    /// Confetti plus a banner spelled out in the middle of the area
    pub fn celebrate(&mut self) {
        let mut rng = rand::thread_rng();
        let word = BANNER_WORDS.choose(&mut rng).unwrap_or(&"GOAL!");
        let center_x = self.width / 2.0;
        let center_y = self.height / 2.0;
        let spacing = 2.0;
        let left = center_x - (word.chars().count() as f64 - 1.0) * spacing / 2.0;

        for (i, ch) in word.chars().enumerate() {
            let target_x = (left + i as f64 * spacing).round() as i32;
            let target_y = (center_y - 2.0).round() as i32;
            let from = (
                center_x + rng.gen_range(-10.0..10.0),
                center_y + rng.gen_range(-5.0..5.0),
            );
            self.particles
                .push(Particle::banner(ch, target_x, target_y, from, &mut rng));
        }
        for _ in 0..40 {
            self.particles.push(Particle::confetti(self.width, &mut rng));
        }
    }

    /// Advance every particle and drop the expired or off-screen ones
    pub fn update(&mut self, dt: f64) {
        let (w, h) = (self.width, self.height);
        let margin = 3.0;
        self.particles.retain_mut(|p| {
            let alive = p.update(dt);
            let off_screen = !matches!(p.kind, ParticleKind::Banner { .. })
                && (p.y > h + margin || p.x < -margin || p.x > w + margin);
            alive && !off_screen
        });
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_spawns_short_lived_sparks() {
        let mut fx = Effects::new(80, 24);
        assert!(!fx.is_active());
        fx.burst(10, 5);
        assert!((3..6).contains(&fx.particles.len()));
        assert!(fx.particles.iter().all(|p| p.kind == ParticleKind::Spark));
        assert!(!fx.is_celebrating());
        for _ in 0..10 {
            fx.update(0.1);
        }
        assert!(!fx.is_active(), "sparks should expire within a second");
    }

    #[test]
    fn celebrate_spells_a_banner_with_confetti() {
        let mut fx = Effects::new(80, 24);
        fx.celebrate();
        assert!(fx.is_celebrating());
        let banner: String = fx
            .particles
            .iter()
            .filter(|p| matches!(p.kind, ParticleKind::Banner { .. }))
            .map(|p| p.symbol)
            .collect();
        assert!(BANNER_WORDS.contains(&banner.as_str()), "{banner}");
        assert!(fx
            .particles
            .iter()
            .any(|p| p.kind == ParticleKind::Confetti));
    }

    #[test]
    fn banner_particles_settle_on_their_targets() {
        let mut rng = rand::thread_rng();
        let mut p = Particle::banner('G', 40, 10, (30.0, 15.0), &mut rng);
        for _ in 0..20 {
            p.update(0.1);
        }
        assert_eq!((p.x, p.y), (40.0, 10.0));
    }

    #[test]
    fn off_screen_particles_are_dropped() {
        let mut fx = Effects::new(20, 10);
        let mut rng = rand::thread_rng();
        let mut far = Particle::spark(0.0, 0.0, &mut rng);
        far.x = 100.0;
        far.y = 100.0;
        far.max_age = 10.0;
        fx.particles.push(far);
        fx.update(0.01);
        assert!(fx.particles.is_empty());
    }

    #[test]
    fn celebration_ends() {
        let mut fx = Effects::new(80, 24);
        fx.celebrate();
        for _ in 0..40 {
            fx.update(0.1);
        }
        assert!(!fx.is_active());
    }
}
