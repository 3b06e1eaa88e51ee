use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Module path conflict at '{0}': name is used as both a module and a package")]
    PathConflict(String),
}

pub type Result<T> = std::result::Result<T, CovError>;
