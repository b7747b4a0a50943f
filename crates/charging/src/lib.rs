use std::{error::Error, fmt};

pub mod client;
pub mod collector;
pub mod config;
pub mod database;
pub mod enrichment;
pub mod geocoding;
pub mod health;
pub mod memory;
pub mod normalizer;
pub mod operator;
pub mod pipeline;
pub mod server;
pub mod source;

#[derive(Debug)]
pub enum RequestError {
    NotFound,
    Other(Box<dyn Error + Send + Sync>),
}

impl RequestError {
    pub fn other<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::Other(Box::new(why))
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Other(why) => write!(f, "{why}"),
        }
    }
}

impl Error for RequestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound => None,
            Self::Other(why) => Some(why.as_ref()),
        }
    }
}

impl From<database::DatabaseError> for RequestError {
    fn from(value: database::DatabaseError) -> Self {
        match value {
            database::DatabaseError::NotFound => Self::NotFound,
            database::DatabaseError::Other(why) => Self::Other(why),
        }
    }
}

pub type RequestResult<O> = Result<O, RequestError>;
