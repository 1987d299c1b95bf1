use super::frame::StereoFrame;

// The master chain is fixed: low-pass -> compressor -> limiter. Each stage
// works in place on a block, so the engine just runs them in order.
pub trait Effect: Send {
    fn process(&mut self, buf: &mut [StereoFrame]);
}

#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

#[inline]
fn gain_to_db(gain: f32) -> f32 {
    if gain <= 1e-6 { -120.0 } else { 20.0 * gain.log10() }
}

/// A value sliding linearly to a target over a number of frames.
#[derive(Clone, Copy, Debug)]
pub struct Ramp {
    current: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl Ramp {
    pub fn new(value: f32) -> Self {
        Self { current: value, target: value, step: 0.0, remaining: 0 }
    }

    pub fn ramp_to(&mut self, target: f32, frames: u32) {
        self.target = target;
        if frames == 0 {
            self.current = target;
            self.remaining = 0;
            return;
        }
        self.step = (target - self.current) / frames as f32;
        self.remaining = frames;
    }

    /// Advance by `frames` and return the new value.
    pub fn advance(&mut self, frames: u32) -> f32 {
        if self.remaining == 0 {
            return self.current;
        }
        let n = frames.min(self.remaining);
        self.remaining -= n;
        self.current = if self.remaining == 0 {
            self.target
        } else {
            self.current + self.step * n as f32
        };
        self.current
    }

    pub fn value(&self) -> f32 {
        self.current
    }
}

// low-pass, RBJ cookbook biquad; the cutoff glides block by block
pub struct LowPass {
    sample_rate: f32,
    q: f32,
    cutoff: Ramp,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z: [[f32; 2]; 2], // [channel][state]
}

impl LowPass {
    pub fn new(sample_rate: u32, cutoff_hz: f32) -> Self {
        let mut f = Self {
            sample_rate: sample_rate as f32,
            q: std::f32::consts::FRAC_1_SQRT_2,
            cutoff: Ramp::new(cutoff_hz),
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z: [[0.0; 2]; 2],
        };
        f.update_coefficients(cutoff_hz);
        f
    }

    pub fn ramp_cutoff(&mut self, hz: f32, secs: f32) {
        let frames = (secs.max(0.0) * self.sample_rate) as u32;
        self.cutoff.ramp_to(hz, frames);
    }

    #[cfg(test)]
    pub fn cutoff(&self) -> f32 {
        self.cutoff.value()
    }

    fn update_coefficients(&mut self, hz: f32) {
        // keep clear of nyquist or the filter blows up
        let hz = hz.clamp(10.0, self.sample_rate * 0.49);
        let w0 = std::f32::consts::TAU * hz / self.sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * self.q);
        let a0 = 1.0 + alpha;
        let b1 = (1.0 - cos_w0) / a0;
        self.b0 = b1 / 2.0;
        self.b1 = b1;
        self.b2 = b1 / 2.0;
        self.a1 = (-2.0 * cos_w0) / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    #[inline]
    fn tick(&mut self, ch: usize, x: f32) -> f32 {
        let z = &mut self.z[ch];
        let y = self.b0 * x + z[0];
        z[0] = self.b1 * x - self.a1 * y + z[1];
        z[1] = self.b2 * x - self.a2 * y;
        y
    }
}

impl Effect for LowPass {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let hz = self.cutoff.advance(buf.len() as u32);
        self.update_coefficients(hz);
        for f in buf.iter_mut() {
            f.left = self.tick(0, f.left);
            f.right = self.tick(1, f.right);
        }
    }
}

// feed-forward compressor, hard knee, peak envelope
pub struct Compressor {
    threshold_db: f32,
    ratio: f32,
    attack_coef: f32,
    release_coef: f32,
    envelope: f32,
}

impl Compressor {
    pub fn new(sample_rate: u32, threshold_db: f32, ratio: f32) -> Self {
        let sr = sample_rate as f32;
        Self {
            threshold_db,
            ratio: ratio.max(1.0),
            attack_coef: (-1.0 / (0.003 * sr)).exp(),
            release_coef: (-1.0 / (0.25 * sr)).exp(),
            envelope: 0.0,
        }
    }
}

impl Effect for Compressor {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let level = f.peak();
            let coef = if level > self.envelope { self.attack_coef } else { self.release_coef };
            self.envelope = coef * self.envelope + (1.0 - coef) * level;

            let over = gain_to_db(self.envelope) - self.threshold_db;
            if over > 0.0 {
                let reduction_db = -over * (1.0 - 1.0 / self.ratio);
                *f = f.scaled(db_to_gain(reduction_db));
            }
        }
    }
}

// peak limiter: instant attack, short release, output never above the ceiling
pub struct Limiter {
    ceiling: f32,
    release_coef: f32,
    gain: f32,
}

impl Limiter {
    pub fn new(sample_rate: u32, ceiling_db: f32) -> Self {
        Self {
            ceiling: db_to_gain(ceiling_db),
            release_coef: (-1.0 / (0.05 * sample_rate as f32)).exp(),
            gain: 1.0,
        }
    }
}

impl Effect for Limiter {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let peak = f.peak();
            let needed = if peak > self.ceiling { self.ceiling / peak } else { 1.0 };
            self.gain = if needed < self.gain {
                needed
            } else {
                self.release_coef * self.gain + (1.0 - self.release_coef) * needed
            };
            *f = f.scaled(self.gain.min(needed));
        }
    }
}
