//! Ошибки генератора карт
//!
//! Все ошибки конфигурации обнаруживаются при построении объектов (`validate()`),
//! а не внутри численных процедур.

use thiserror::Error;

/// Ошибки генерации, загрузки и сохранения карты
#[derive(Error, Debug)]
pub enum MapError {
    /// Недопустимый параметр конфигурации
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Поле высот постоянно (max == min), нормализация невозможна
    #[error("elevation field is flat (min == max == {0}), cannot normalize")]
    FlatField(f64),

    /// Размеры сеток не совпадают
    #[error("grid shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Неизвестный код или имя типа местности
    #[error("unknown terrain class: {0}")]
    UnknownClass(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка разбора текстового файла сетки или реки
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl MapError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        MapError::InvalidConfig(message.into())
    }
}

pub type Result<T> = std::result::Result<T, MapError>;
