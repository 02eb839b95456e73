//! Фрактальные реки
//!
//! Путь реки строится из опорных точек смещением середин: каждый раунд вставляет
//! между соседними вершинами середину, сдвинутую на `intensity · длина · (u − 0.5)`
//! по каждой оси. Случайные числа берутся из подпотока, заданного счётчиком
//! `var_seed`: перед раундом по `m` вершинам поток пересеивается `var_seed`,
//! выдаёт `2m` чисел, и счётчик сдвигается на `2m`. Поэтому повторная генерация из
//! тех же опорных точек и сида даёт тот же путь, а разные раунды не делят числа.
//!
//! `add_point` подразбивает только новый сегмент. Река, построенная по точкам
//! поштучно, не обязана совпадать с рекой, построенной из того же списка сразу:
//! порядок потребления подпотоков другой.

use serde::{Deserialize, Serialize};

use crate::config::RiverSpec;
use crate::error::{MapError, Result};
use crate::random::{RandomStream, resolve_seed};

pub type Point = [f64; 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct River {
    pub name: String,
    /// Начало первого подпотока
    pub seed: u64,
    /// Начало следующего подпотока
    pub var_seed: u64,
    /// Целевая минимальная длина сегмента
    pub delta_length: f64,
    pub intensity: f64,
    pub keypoints: Vec<Point>,
    /// Плотная последовательность точек пути
    pub points: Vec<Point>,
    /// Результат подразбиения каждого сегмента между опорными точками
    pub segments: Vec<Vec<Point>>,
}

fn check_delta_length(delta_length: f64) -> Result<()> {
    if delta_length > 0.0 && delta_length.is_finite() {
        Ok(())
    } else {
        Err(MapError::config(format!(
            "river delta_length must be positive, got {delta_length}"
        )))
    }
}

/// Число раундов подразбиения для сегмента длины `r`: `max(0, ⌊log2(r/δ)⌋ + 1)`
#[must_use]
pub fn insert_times_for(r: f64, delta_length: f64) -> u32 {
    if r <= 0.0 {
        return 0;
    }
    let n = (r / delta_length).log2().floor() + 1.0;
    if n > 0.0 { n as u32 } else { 0 }
}

impl River {
    pub fn new(
        name: impl Into<String>,
        keypoints: Vec<Point>,
        delta_length: f64,
        intensity: f64,
        seed: Option<u32>,
    ) -> Result<Self> {
        Self::with_stream(
            name,
            keypoints,
            delta_length,
            intensity,
            u64::from(resolve_seed(seed)),
        )
    }

    /// Река, подпотоки которой начинаются с `seed`
    pub fn with_stream(
        name: impl Into<String>,
        keypoints: Vec<Point>,
        delta_length: f64,
        intensity: f64,
        seed: u64,
    ) -> Result<Self> {
        check_delta_length(delta_length)?;
        if !(0.0..=1.0).contains(&intensity) {
            return Err(MapError::config(format!(
                "river intensity must be in [0, 1], got {intensity}"
            )));
        }
        Ok(Self {
            name: name.into(),
            seed,
            var_seed: seed,
            delta_length,
            intensity,
            keypoints,
            points: Vec::new(),
            segments: Vec::new(),
        })
    }

    /// Река из описания конфигурации; путь сразу генерируется.
    ///
    /// Без собственного сида подпотоки начинаются с `default_stream`.
    pub fn from_spec(
        spec: &RiverSpec,
        default_stream: u64,
        delta_length: f64,
        rng: &mut dyn RandomStream,
    ) -> Result<Self> {
        let mut river = Self::with_stream(
            spec.name.clone(),
            spec.keypoints.clone(),
            delta_length,
            spec.intensity,
            spec.seed.map_or(default_stream, u64::from),
        )?;
        river.generate(rng, spec.insert_times);
        Ok(river)
    }

    /// Река, для которой известен только готовый путь (например, загруженный из файла)
    pub fn from_points(name: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            name: name.into(),
            seed: 0,
            var_seed: 0,
            delta_length: 1.0,
            intensity: 0.5,
            keypoints: Vec::new(),
            points,
            segments: Vec::new(),
        }
    }

    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p[0]).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p[1]).collect()
    }

    /// Генерирует путь заново с начального сида
    pub fn generate(&mut self, rng: &mut dyn RandomStream, insert_times: Option<u32>) {
        self.var_seed = self.seed;
        self.rerandomize_with(rng, insert_times);
    }

    /// Новая форма при тех же опорных точках: счётчик подпотоков не сбрасывается.
    ///
    /// Река без опорных точек (загруженная из файла) не меняется.
    pub fn rerandomize(&mut self, rng: &mut dyn RandomStream) {
        if self.keypoints.len() < 2 {
            return;
        }
        self.rerandomize_with(rng, None);
    }

    fn rerandomize_with(&mut self, rng: &mut dyn RandomStream, insert_times: Option<u32>) {
        self.points.clear();
        self.segments.clear();
        if self.keypoints.len() > 1 {
            let pairs: Vec<(Point, Point)> = self
                .keypoints
                .windows(2)
                .map(|w| (w[0], w[1]))
                .collect();
            for (p0, p1) in pairs {
                self.generate_segment(rng, p0, p1, insert_times);
            }
        }
        tracing::debug!(
            target: "mapmaker",
            river = %self.name,
            keypoints = self.keypoints.len(),
            points = self.points.len(),
            var_seed = self.var_seed,
            "river.generated"
        );
    }

    /// Уменьшает шаг (по умолчанию вдвое) и генерирует путь заново
    pub fn refine(&mut self, rng: &mut dyn RandomStream, delta_length: Option<f64>) -> Result<()> {
        let delta_length = delta_length.unwrap_or(0.5 * self.delta_length);
        check_delta_length(delta_length)?;
        self.delta_length = delta_length;
        self.generate(rng, None);
        Ok(())
    }

    /// Добавляет опорную точку и, если `subdivide`, подразбивает только новый сегмент
    pub fn add_point(
        &mut self,
        rng: &mut dyn RandomStream,
        point: Point,
        subdivide: bool,
        insert_times: Option<u32>,
    ) {
        self.keypoints.push(point);
        if subdivide && self.keypoints.len() > 1 {
            let previous = self.keypoints[self.keypoints.len() - 2];
            self.generate_segment(rng, previous, point, insert_times);
        }
    }

    fn generate_segment(
        &mut self,
        rng: &mut dyn RandomStream,
        p0: Point,
        p1: Point,
        insert_times: Option<u32>,
    ) {
        let r = (p0[0] - p1[0]).hypot(p0[1] - p1[1]);
        let times = insert_times.unwrap_or_else(|| insert_times_for(r, self.delta_length));

        let mut line = vec![p0, p1];
        for _ in 0..times {
            line = self.change_line(rng, &line);
        }

        // Общая опорная точка соседних сегментов не дублируется
        let skip = usize::from(self.points.last() == Some(&p0));
        self.points.extend_from_slice(&line[skip..]);
        self.segments.push(line);
    }

    /// Один раунд смещения середин над ломаной `line`
    fn change_line(&mut self, rng: &mut dyn RandomStream, line: &[Point]) -> Vec<Point> {
        let n = line.len();
        rng.reseed(self.var_seed);
        self.var_seed += 2 * n as u64;
        let randmat = rng.next_uniform_vec(2 * n);

        let mut new_line = Vec::with_capacity(2 * n - 1);
        for (i, pair) in line.windows(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            let length = (a[0] - b[0]).hypot(a[1] - b[1]);
            new_line.push(a);
            new_line.push([
                0.5 * a[0] + 0.5 * b[0] + self.intensity * length * (randmat[i] - 0.5),
                0.5 * a[1] + 0.5 * b[1] + self.intensity * length * (randmat[n + i] - 0.5),
            ]);
        }
        new_line.push(line[n - 1]);
        new_line
    }
}
