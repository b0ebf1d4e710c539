pub mod balance;
pub mod position;
pub mod settings;
pub mod trade;

pub use balance::*;
pub use position::*;
pub use settings::*;
pub use trade::*;
