use serde::Serialize;
use utility::id::HasId;

pub mod station;
pub mod stats;

pub trait DatabaseRow {
    type Model: Serialize + HasId;

    fn to_model(self) -> Self::Model;
    fn from_model(model: &Self::Model) -> Self;
}
