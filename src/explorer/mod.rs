pub mod aggregate;
pub mod distance;
pub mod filter;
pub mod format;
pub mod map_export;
pub mod session;
pub mod views;

use failure::Fail;

pub use self::filter::Selection;
pub use self::session::Session;

#[derive(Debug, Fail, PartialEq)]
pub enum ExplorerError {
    #[fail(display = "Please select a city to continue")]
    CityNotChosen,
    #[fail(display = "Unknown city: {}", _0)]
    UnknownCity(String),
    #[fail(display = "Unknown reference locality: {}", _0)]
    UnknownReference(String),
    #[fail(display = "A reference locality needs a specific city and property type")]
    ReferenceUnavailable,
    #[fail(display = "Reference locality {} has no valid coordinates", _0)]
    ReferenceWithoutCoordinates(String),
}
