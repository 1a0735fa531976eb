//! Crate-level error type.

use thiserror::Error;

use crate::{cartridge::CartridgeError, config::ConfigError, cpu::CpuError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Cpu(#[from] CpuError),

    #[error("invalid cartridge image: {0}")]
    Cartridge(#[from] CartridgeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no cartridge loaded")]
    NotLoaded,
}
