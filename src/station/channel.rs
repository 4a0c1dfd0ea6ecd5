use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;

/// Fault model of the physical medium.
///
/// Probabilities lie in `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Probability that a frame never arrives.
    pub loss_rate: f64,
    /// Probability that any single bit of an arriving frame is flipped.
    pub bit_error_rate: f64,
    pub seed: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            loss_rate: 0.0,
            bit_error_rate: 0.0,
            seed: 0,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ChannelError {
    #[error("{field} {value} is not a probability")]
    InvalidRate { field: &'static str, value: f64 },
}

pub struct NoisyChannel {
    config: ChannelConfig,
    rng: StdRng,

    // stat
    stat: Stat,
}

impl NoisyChannel {
    pub fn new(config: ChannelConfig) -> Result<Self, ChannelError> {
        check_rate("loss_rate", config.loss_rate)?;
        check_rate("bit_error_rate", config.bit_error_rate)?;
        Ok(NoisyChannel {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            stat: Stat::default(),
        })
    }

    #[must_use]
    pub fn stat(&self) -> Stat {
        self.stat.clone()
    }

    /// Returns `None` if the frame is lost, otherwise the frame as it arrives.
    #[must_use]
    pub fn perturb(&mut self, mut frame: Vec<u8>) -> Option<Vec<u8>> {
        self.stat.frames += 1;
        if self.config.loss_rate > 0.0 && self.rng.random_bool(self.config.loss_rate) {
            self.stat.lost += 1;
            return None;
        }
        if self.config.bit_error_rate > 0.0 {
            let mut flipped = false;
            for byte in frame.iter_mut() {
                for bit in 0..8 {
                    if self.rng.random_bool(self.config.bit_error_rate) {
                        *byte ^= 1 << bit;
                        flipped = true;
                    }
                }
            }
            if flipped {
                self.stat.corrupted += 1;
            }
        }
        Some(frame)
    }
}

fn check_rate(field: &'static str, value: f64) -> Result<(), ChannelError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ChannelError::InvalidRate { field, value });
    }
    Ok(())
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Stat {
    pub frames: u64,
    pub lost: u64,
    pub corrupted: u64,
}
