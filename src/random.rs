//! Детерминированный источник случайных чисел
//!
//! Каждый стохастический компонент получает поток через `&mut dyn RandomStream`
//! и явно пересеивает его перед участком, который должен быть воспроизводимым
//! (шум, каркас континентов, выветривание, раунды подразбиения рек).

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Диапазон, из которого берётся сид, если он не задан
pub const SEED_DRAW_RANGE: std::ops::Range<u32> = 0..10_000;

/// Поток равномерно распределённых чисел в `[0, 1)` с явным пересеиванием
pub trait RandomStream {
    /// Сбрасывает поток в состояние, определяемое только `seed`
    fn reseed(&mut self, seed: u64);

    fn next_uniform(&mut self) -> f64;

    fn next_uniform_vec(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.next_uniform()).collect()
    }
}

/// Рабочий поток на основе ChaCha8
#[derive(Debug, Clone)]
pub struct ChaChaStream {
    rng: ChaCha8Rng,
}

impl ChaChaStream {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Default for ChaChaStream {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RandomStream for ChaChaStream {
    fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    fn next_uniform(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}

/// Поток, выдающий заранее заданную последовательность по кругу.
///
/// `reseed` возвращает курсор в начало, поэтому последовательность не зависит от сида.
#[derive(Debug, Clone)]
pub struct ScriptedStream {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedStream {
    /// # Panics
    /// Если `values` пуст.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "scripted stream needs at least one value");
        Self { values, cursor: 0 }
    }

    /// Поток, всегда возвращающий одно и то же значение
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomStream for ScriptedStream {
    fn reseed(&mut self, _seed: u64) {
        self.cursor = 0;
    }

    fn next_uniform(&mut self) -> f64 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

/// Возвращает заданный сид или вытягивает новый из [`SEED_DRAW_RANGE`].
///
/// Вытянутый сид пишется в лог, чтобы прогон можно было воспроизвести.
#[must_use]
pub fn resolve_seed(seed: Option<u32>) -> u32 {
    match seed {
        Some(seed) => seed,
        None => {
            let seed = rand::thread_rng().gen_range(SEED_DRAW_RANGE);
            tracing::info!(target: "mapmaker", seed, "seed.drawn");
            seed
        }
    }
}
