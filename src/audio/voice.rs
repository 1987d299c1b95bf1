use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;

/// One playhead over a registered sample.
#[derive(Clone, Debug)]
pub struct Voice {
    pub sample_index: usize,
    pub pos: usize,
    pub active: bool,
    pub muted: bool,
    looping: bool,
}

impl Voice {
    /// Solo voice: plays once from `start_frame` and stops at the end.
    pub fn one_shot(sample_index: usize, start_frame: usize) -> Self {
        Self {
            sample_index,
            pos: start_frame,
            active: true,
            muted: false,
            looping: false,
        }
    }

    /// Mixer channel: idle and muted until started, then loops forever.
    pub fn looping(sample_index: usize) -> Self {
        Self {
            sample_index,
            pos: 0,
            active: false,
            muted: true,
            looping: true,
        }
    }

    pub fn start(&mut self) {
        if !self.active {
            self.active = true;
            self.pos = 0;
        }
    }

    pub fn render_into(&mut self, buffer: &SampleBuffer, out: &mut [StereoFrame], gain: f32) {
        if !self.active {
            return;
        }
        let data = &buffer.data;
        let len = data.len();
        if len == 0 {
            self.active = false;
            return;
        }

        for frame in out.iter_mut() {
            if self.pos >= len {
                if self.looping {
                    self.pos %= len;
                } else {
                    self.active = false;
                    break;
                }
            }
            // muted channels keep their place so un-muting is instant
            if !self.muted {
                *frame += data[self.pos].scaled(gain);
            }
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_buffer(n: usize) -> SampleBuffer {
        SampleBuffer {
            data: (0..n).map(|i| StereoFrame::mono(i as f32)).collect(),
            sample_rate: 48_000,
        }
    }

    #[test]
    fn looping_voice_wraps_around() {
        let buf = ramp_buffer(4);
        let mut v = Voice::looping(0);
        v.start();
        v.muted = false;
        let mut out = vec![StereoFrame::zero(); 10];
        v.render_into(&buf, &mut out, 1.0);
        let lefts: Vec<f32> = out.iter().map(|f| f.left).collect();
        assert_eq!(lefts, vec![0.0, 1.0, 2.0, 3.0, 0.0, 1.0, 2.0, 3.0, 0.0, 1.0]);
        assert!(v.active);
    }

    #[test]
    fn muted_voice_is_silent_but_keeps_moving() {
        let buf = ramp_buffer(100);
        let mut v = Voice::looping(0);
        v.start();
        let mut out = vec![StereoFrame::zero(); 30];
        v.render_into(&buf, &mut out, 1.0);
        assert!(out.iter().all(|f| *f == StereoFrame::zero()));
        assert_eq!(v.pos, 30);

        v.muted = false;
        let mut out = vec![StereoFrame::zero(); 1];
        v.render_into(&buf, &mut out, 0.5);
        assert_eq!(out[0].left, 15.0);
    }

    #[test]
    fn one_shot_stops_at_the_end() {
        let buf = ramp_buffer(5);
        let mut v = Voice::one_shot(0, 3);
        let mut out = vec![StereoFrame::zero(); 8];
        v.render_into(&buf, &mut out, 1.0);
        assert_eq!(out[0].left, 3.0);
        assert_eq!(out[1].left, 4.0);
        assert_eq!(out[2].left, 0.0);
        assert!(!v.active);
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let buf = ramp_buffer(10);
        let mut v = Voice::looping(0);
        v.start();
        let mut out = vec![StereoFrame::zero(); 4];
        v.render_into(&buf, &mut out, 1.0);
        v.start();
        assert_eq!(v.pos, 4);
    }
}
